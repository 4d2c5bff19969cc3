//! Request manager
//!
//! Issues refresh and next-page requests through [`NetworkEffects`], decodes
//! the response through the [`ProtocolAdapter`] and hands the result to an
//! [`UpdateConsumer`]. Every request runs on the task spawner; nothing here
//! blocks the mutation lane.

use std::sync::Arc;

use feed_core::effects::{HttpRequest, NetworkEffects, TaskSpawner};
use feed_core::wire::{FeedQuery, RequestReason};
use feed_core::{ContinuationToken, DataOperation, FeedError, MutationContext, Result};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::protocol::ProtocolAdapter;
use crate::session::UpdateConsumer;

/// Content type of request bodies.
pub const QUERY_CONTENT_TYPE: &str = "application/json";

/// Fetches feed pages and forwards them into HEAD.
#[derive(Clone)]
pub struct RequestManager {
    network: Arc<dyn NetworkEffects>,
    spawner: Arc<dyn TaskSpawner>,
    adapter: ProtocolAdapter,
    endpoint_url: String,
}

impl std::fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestManager")
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}

impl RequestManager {
    /// Create a request manager posting to `endpoint_url`.
    pub fn new(
        network: Arc<dyn NetworkEffects>,
        spawner: Arc<dyn TaskSpawner>,
        adapter: ProtocolAdapter,
        endpoint_url: impl Into<String>,
    ) -> Self {
        Self {
            network,
            spawner,
            adapter,
            endpoint_url: endpoint_url.into(),
        }
    }

    /// Request fresh content for the scope of `context`.
    pub fn trigger_refresh(&self, context: &MutationContext, consumer: UpdateConsumer) {
        let reason = if context.session.is_some() {
            RequestReason::SessionRefresh
        } else {
            RequestReason::HeadRefresh
        };
        self.issue(
            FeedQuery {
                reason,
                token: None,
            },
            consumer,
        );
    }

    /// Request the page following `token`.
    pub fn load_more(&self, token: &ContinuationToken, consumer: UpdateConsumer) {
        self.issue(
            FeedQuery {
                reason: RequestReason::NextPage,
                token: Some(token.as_str().to_string()),
            },
            consumer,
        );
    }

    fn issue(&self, query: FeedQuery, consumer: UpdateConsumer) {
        let network = self.network.clone();
        let adapter = self.adapter.clone();
        let url = self.endpoint_url.clone();
        let task_name = match query.reason {
            RequestReason::NextPage => "feed_next_page",
            _ => "feed_refresh",
        };

        self.spawner.spawn(
            task_name,
            async move {
                let result = fetch(network.as_ref(), &adapter, url, &query).await;
                if let Err(err) = &result {
                    warn!(reason = ?query.reason, error = %err, "Feed request failed");
                }
                if let Err(err) = consumer.accept(result).await {
                    debug!(error = %err, "Response was not applied");
                }
            }
            .boxed(),
        );
    }
}

async fn fetch(
    network: &dyn NetworkEffects,
    adapter: &ProtocolAdapter,
    url: String,
    query: &FeedQuery,
) -> Result<Vec<DataOperation>> {
    let body = serde_json::to_vec(query)
        .map_err(|e| FeedError::internal(format!("encode feed query: {e}")))?;
    let request = HttpRequest::post(url, body).with_header("content-type", QUERY_CONTENT_TYPE);

    debug!(reason = ?query.reason, "Sending feed request");
    let bytes = network.send(request).await?;
    adapter.decode_model(&bytes)
}
