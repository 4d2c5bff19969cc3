//! Scripted network transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use feed_core::effects::{HttpRequest, NetworkEffects, NetworkError};
use parking_lot::Mutex;
use tokio::sync::watch;

struct NetworkState {
    responses: Mutex<VecDeque<Result<Vec<u8>, NetworkError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
    gate: watch::Sender<bool>,
}

/// Network fake that answers from a queue of scripted results.
///
/// With the gate closed, `send` parks after recording the request until
/// [`ScriptedNetwork::release`] is called, which keeps a request outstanding
/// for as long as a test needs. An empty queue answers
/// [`NetworkError::Unavailable`].
#[derive(Clone)]
pub struct ScriptedNetwork {
    state: Arc<NetworkState>,
}

impl Default for ScriptedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedNetwork {
    /// Open gate, no scripted responses.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Arc::new(NetworkState {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate,
            }),
        }
    }

    /// Queue a successful response body.
    pub fn push_response(&self, body: Vec<u8>) {
        self.state.responses.lock().push_back(Ok(body));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: NetworkError) {
        self.state.responses.lock().push_back(Err(error));
    }

    /// Park subsequent sends until [`release`](Self::release).
    pub fn hold(&self) {
        self.state.gate.send_replace(false);
    }

    /// Let parked and future sends complete.
    pub fn release(&self) {
        self.state.gate.send_replace(true);
    }

    /// Number of `send` calls so far.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.requests.lock().clone()
    }
}

#[async_trait]
impl NetworkEffects for ScriptedNetwork {
    async fn send(&self, request: HttpRequest) -> Result<Vec<u8>, NetworkError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().push(request);

        let mut gate = self.state.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(NetworkError::Unavailable);
        }

        self.state
            .responses
            .lock()
            .pop_front()
            .unwrap_or(Err(NetworkError::Unavailable))
    }
}
