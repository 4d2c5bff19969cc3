//! Session manager
//!
//! Owns HEAD, the attached sessions, and the in-flight request markers.
//! Writes to HEAD happen only on the [`MutationLane`]; reads of HEAD
//! structure and shared state are served from memory under a read lock.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use feed_core::effects::{ClockEffects, TaskSpawner};
use feed_core::{
    ContentEventReporter, ContentId, ContinuationToken, DataOperation, MutationContext,
    MutationOrigin, Payload, Result, SessionChange, SessionId, SessionObserver,
};
use feed_store::ContentStore;
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::diff::session_changes;
use super::head::{validate, Head, StagedBatch};
use super::lane::MutationLane;
use super::state::{SessionSnapshot, StreamSession};
use crate::context::FeedContext;
use crate::protocol::ProtocolAdapter;
use crate::request::RequestManager;
use crate::scheduler::{SchedulerPolicy, SchedulerState, WaitMode};

/// Scope of an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestScope {
    /// Refresh of HEAD for future sessions
    Head,
    /// Refresh or next page requested by one session
    Session(SessionId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HeadSignal {
    valid: bool,
    refreshes: u64,
    failures: u64,
}

type Notifications = Vec<(Arc<dyn SessionObserver>, Vec<SessionChange>)>;

struct SessionInner {
    lane: MutationLane,
    head: RwLock<Head>,
    sessions: Mutex<IndexMap<SessionId, StreamSession>>,
    outstanding: Mutex<HashSet<RequestScope>>,
    signal: watch::Sender<HeadSignal>,
    store: ContentStore,
    scheduler: Arc<dyn SchedulerPolicy>,
    requests: RequestManager,
    clock: Arc<dyn ClockEffects>,
    spawner: Arc<dyn TaskSpawner>,
    reporter: Option<Arc<dyn ContentEventReporter>>,
    request_timeout: Duration,
    session_ttl_ms: u64,
}

/// Canonical content state and the sessions derived from it.
///
/// Cheap to clone; clones share the same HEAD.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("head_version", &self.head_version())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager with an empty HEAD; call [`initialize`](Self::initialize)
    /// to restore persisted content.
    pub fn new(context: &FeedContext) -> Self {
        let requests = RequestManager::new(
            context.network.clone(),
            context.spawner.clone(),
            ProtocolAdapter::new(context.codec.clone()),
            context.config.network.endpoint_url.clone(),
        );
        let (signal, _) = watch::channel(HeadSignal {
            valid: true,
            ..HeadSignal::default()
        });
        Self {
            inner: Arc::new(SessionInner {
                lane: MutationLane::new(),
                head: RwLock::new(Head::default()),
                sessions: Mutex::new(IndexMap::new()),
                outstanding: Mutex::new(HashSet::new()),
                signal,
                store: ContentStore::new(context.storage.clone()),
                scheduler: context.scheduler.clone(),
                requests,
                clock: context.clock.clone(),
                spawner: context.spawner.clone(),
                reporter: context.reporter.clone(),
                request_timeout: context.config.scheduler.request_timeout(),
                session_ttl_ms: context.config.session.session_ttl_ms,
            }),
        }
    }

    /// Restore HEAD from the content store.
    pub async fn initialize(&self) -> Result<()> {
        let inner = &self.inner;
        inner.lane.run("initialize", inner.restore()).await
    }

    /// Create a session over the current HEAD.
    ///
    /// Consults the scheduler first. Depending on its decision this issues
    /// a refresh and waits for it, without bound or up to the configured
    /// request timeout. After [`invalidate_head`](Self::invalidate_head) the
    /// call always waits for the next refresh or request error.
    pub async fn get_new_session(
        &self,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> SessionSnapshot {
        let inner = &self.inner;
        let mut signal = inner.signal.subscribe();
        let before = *signal.borrow_and_update();

        let state = inner.scheduler_state(RequestScope::Head, before.valid);
        let behavior = inner.scheduler.should_session_request_data(&state);
        if behavior.issues_request() {
            self.trigger_refresh(None);
        }

        let limit = match behavior.wait_mode() {
            WaitMode::Immediate => None,
            WaitMode::UntilComplete => Some(None),
            WaitMode::Bounded => Some(Some(inner.request_timeout)),
        };
        if let Some(limit) = limit {
            if inner.lane.is_current() {
                warn!(?behavior, "get_new_session called on the mutation lane; not waiting");
            } else if !wait_for_update(&mut signal, before, limit).await {
                info!(?behavior, "No fresh content in time, using existing HEAD");
            }
        }

        let snapshot = inner.create_session(observer);
        info!(
            session = %snapshot.id,
            items = snapshot.items.len(),
            ?behavior,
            "Created session"
        );
        snapshot
    }

    /// Re-attach `observer` to an existing session.
    ///
    /// Returns `false`, changing nothing, for unknown tokens.
    pub fn get_existing_session(
        &self,
        id: &SessionId,
        observer: Arc<dyn SessionObserver>,
    ) -> bool {
        let now = self.inner.clock.now_ms();
        match self.inner.sessions.lock().get_mut(id) {
            Some(session) => {
                session.observer = Some(observer);
                session.last_access_ms = now;
                debug!(session = %id, "Re-attached session");
                true
            }
            None => {
                debug!(session = %id, "Unknown session token");
                false
            }
        }
    }

    /// Current view of a session.
    pub fn session_snapshot(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.inner.sessions.lock().get(id).map(StreamSession::snapshot)
    }

    /// Drop the observer of a session, keeping it for later re-attachment.
    pub fn detach_session(&self, id: &SessionId) -> bool {
        let now = self.inner.clock.now_ms();
        match self.inner.sessions.lock().get_mut(id) {
            Some(session) => {
                session.observer = None;
                session.last_access_ms = now;
                true
            }
            None => false,
        }
    }

    /// Forget detached sessions idle longer than the configured TTL.
    ///
    /// Returns the number of sessions dropped.
    pub fn expire_sessions(&self) -> usize {
        let now = self.inner.clock.now_ms();
        let ttl = self.inner.session_ttl_ms;
        let mut sessions = self.inner.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, ttl));
        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(dropped, remaining = sessions.len(), "Expired idle sessions");
        }
        dropped
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Mark HEAD stale. Existing sessions keep their views.
    pub fn invalidate_head(&self) {
        self.inner.signal.send_modify(|s| s.valid = false);
        info!("HEAD invalidated");
    }

    /// Whether HEAD has been refreshed since the last invalidation.
    pub fn is_head_valid(&self) -> bool {
        self.inner.signal.borrow().valid
    }

    /// Number of batches applied to HEAD since startup.
    pub fn head_version(&self) -> u64 {
        self.inner.head.read().version()
    }

    /// Whether a request for `scope` is in flight.
    pub fn has_outstanding_request(&self, scope: RequestScope) -> bool {
        self.inner.outstanding.lock().contains(&scope)
    }

    /// Request the page after `token` for `session`.
    ///
    /// The response is merged with a context carrying `token`, so only this
    /// session's cursor moves. Returns `false` if the session is unknown or
    /// already has a request in flight.
    pub fn handle_token(&self, session: SessionId, token: ContinuationToken) -> bool {
        if !self.inner.sessions.lock().contains_key(&session) {
            warn!(session = %session, "Page requested for unknown session");
            return false;
        }
        let scope = RequestScope::Session(session);
        if !self.inner.mark_outstanding(scope) {
            return false;
        }
        let consumer = UpdateConsumer {
            inner: self.inner.clone(),
            context: MutationContext::pagination(session, token.clone()),
            release: Some(scope),
        };
        self.inner.requests.load_more(&token, consumer);
        true
    }

    /// Request a full refresh of HEAD, or of one session's view.
    ///
    /// Returns `false` when a request for the same scope is already in
    /// flight; at most one runs at a time.
    pub fn trigger_refresh(&self, session: Option<SessionId>) -> bool {
        let scope = session.map_or(RequestScope::Head, RequestScope::Session);
        if !self.inner.mark_outstanding(scope) {
            return false;
        }
        let context = match session {
            Some(id) => MutationContext::for_session(id),
            None => MutationContext::refresh(),
        };
        let consumer = UpdateConsumer {
            inner: self.inner.clone(),
            context: context.clone(),
            release: Some(scope),
        };
        self.inner.requests.trigger_refresh(&context, consumer);
        true
    }

    /// Read payloads for `ids` on the task spawner and hand them to `consumer`.
    ///
    /// Results follow the requested order; unknown ids are omitted.
    pub fn get_stream_features<F>(&self, ids: Vec<ContentId>, consumer: F)
    where
        F: FnOnce(Result<Vec<(ContentId, Payload)>>) + Send + 'static,
    {
        let store = self.inner.store.clone();
        self.inner.spawner.spawn(
            "stream_features",
            async move {
                consumer(store.get_payloads(&ids).await);
            }
            .boxed(),
        );
    }

    /// Awaitable form of [`get_stream_features`](Self::get_stream_features),
    /// reading on the caller's task.
    pub async fn stream_features(&self, ids: &[ContentId]) -> Result<Vec<(ContentId, Payload)>> {
        self.inner.store.get_payloads(ids).await
    }

    /// Shared-state blob for `id`, from memory only.
    pub fn get_shared_state(&self, id: &ContentId) -> Option<Vec<u8>> {
        self.inner.head.read().shared_state(id)
    }

    /// Consumer applying a result to HEAD under `context`.
    pub fn get_update_consumer(&self, context: MutationContext) -> UpdateConsumer {
        UpdateConsumer {
            inner: self.inner.clone(),
            context,
            release: None,
        }
    }

    /// Run `task` serialized with every other HEAD mutation.
    pub async fn run_task<F, T>(&self, name: &str, task: F) -> T
    where
        F: Future<Output = T>,
    {
        self.inner.lane.run(name, task).await
    }

    /// Panic unless called from the mutation lane.
    #[track_caller]
    pub fn assert_on_lane(&self, operation: &str) {
        self.inner.lane.assert_on_lane(operation);
    }
}

/// One-shot callback applying a request result to HEAD.
///
/// Applying always runs on the mutation lane. Whatever the result, the
/// in-flight marker the consumer was created for is released, also when
/// the consumer is dropped without being applied.
pub struct UpdateConsumer {
    inner: Arc<SessionInner>,
    context: MutationContext,
    release: Option<RequestScope>,
}

impl std::fmt::Debug for UpdateConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateConsumer")
            .field("context", &self.context)
            .field("release", &self.release)
            .finish_non_exhaustive()
    }
}

impl UpdateConsumer {
    /// Mutation context the result is applied under.
    pub fn context(&self) -> &MutationContext {
        &self.context
    }

    /// Apply `result`. An `Err` applies nothing.
    ///
    /// Returns the apply outcome; a failed batch leaves HEAD untouched.
    pub async fn accept(mut self, result: Result<Vec<DataOperation>>) -> Result<()> {
        let release = self.release.take();
        let inner = self.inner.clone();
        let context = std::mem::take(&mut self.context);
        drop(self);
        inner
            .lane
            .run("apply_update", inner.accept(context, release, result))
            .await
    }
}

impl Drop for UpdateConsumer {
    // Dropped unconsumed: the request task was cancelled or panicked.
    fn drop(&mut self) {
        if let Some(scope) = self.release.take() {
            warn!(?scope, "Request abandoned before its result was applied");
            self.inner.outstanding.lock().remove(&scope);
            self.inner.signal_failure(scope);
        }
    }
}

impl SessionInner {
    fn mark_outstanding(&self, scope: RequestScope) -> bool {
        let inserted = self.outstanding.lock().insert(scope);
        if !inserted {
            debug!(?scope, "Request already in flight, suppressing duplicate");
        }
        inserted
    }

    /// Wake sessions waiting on HEAD when its own refresh failed.
    fn signal_failure(&self, scope: RequestScope) {
        if scope == RequestScope::Head {
            self.signal.send_modify(|s| s.failures += 1);
        }
    }

    fn scheduler_state(&self, scope: RequestScope, valid: bool) -> SchedulerState {
        let now = self.clock.now_ms();
        let (has_features, refreshed_at) = {
            let head = self.head.read();
            (head.has_features(), head.refreshed_at_ms())
        };
        SchedulerState {
            has_content: valid && has_features,
            content_age_ms: refreshed_at.map_or(u64::MAX, |at| now.saturating_sub(at)),
            has_outstanding_request: self.outstanding.lock().contains(&scope),
        }
    }

    async fn restore(&self) -> Result<()> {
        let meta = self.store.load_head().await?;
        let records = self.store.load_all().await?;
        let restored = meta.is_some() || !records.is_empty();
        let head = Head::restore(meta, records);
        let features = head.feature_ids().len();
        *self.head.write() = head;
        if restored {
            self.signal.send_modify(|s| s.valid = true);
        }
        info!(features, restored, "Restored HEAD");
        Ok(())
    }

    fn create_session(&self, observer: Option<Arc<dyn SessionObserver>>) -> SessionSnapshot {
        let now = self.clock.now_ms();
        let mut sessions = self.sessions.lock();
        let head = self.head.read();
        let session = StreamSession {
            id: SessionId::new_random(),
            items: head.feature_ids(),
            cursor: head.latest_token(),
            head_version: head.version(),
            observer,
            last_access_ms: now,
        };
        let snapshot = session.snapshot();
        sessions.insert(session.id, session);
        snapshot
    }

    async fn accept(
        &self,
        context: MutationContext,
        release: Option<RequestScope>,
        result: Result<Vec<DataOperation>>,
    ) -> Result<()> {
        let outcome = match result {
            Ok(operations) => self.apply_batch(operations, &context).await,
            Err(err) => Err(err),
        };

        if let Some(scope) = release {
            self.outstanding.lock().remove(&scope);
        }

        match &outcome {
            Ok(()) => {
                if context.origin == MutationOrigin::Refresh {
                    self.scheduler.on_receive_new_content(self.clock.now_ms());
                }
            }
            Err(err) => {
                warn!(origin = ?context.origin, error = %err, "Update not applied");
                if let Some(scope) = release {
                    self.scheduler.on_request_error(err.code());
                    self.signal_failure(scope);
                }
            }
        }
        outcome
    }

    /// Merge one batch: validate, stage, persist, swap, notify.
    async fn apply_batch(
        &self,
        operations: Vec<DataOperation>,
        context: &MutationContext,
    ) -> Result<()> {
        self.lane.assert_on_lane("apply_batch");
        validate(&operations)?;

        let now = self.clock.now_ms();
        let staged = self.head.read().stage(&operations, context, now);
        let batch = staged.write_batch(self.store.begin())?;
        self.store.commit(batch).await?;

        let updated = staged.updated_count();
        let removed = staged.removed.len();
        let version = staged.head.version();
        let notifications = self.swap_in(staged, context, now);

        for (observer, changes) in notifications {
            for change in changes {
                observer.on_change(change);
            }
        }

        if context.session.is_none() || context.origin == MutationOrigin::Refresh {
            self.signal.send_modify(|s| {
                s.valid = true;
                s.refreshes += 1;
            });
        }
        if let Some(reporter) = &self.reporter {
            reporter.on_batch_applied(context.origin, updated, removed);
        }
        debug!(
            version,
            operations = operations.len(),
            updated,
            removed,
            origin = ?context.origin,
            "Applied batch to HEAD"
        );
        Ok(())
    }

    /// Replace HEAD and update every session view under one critical
    /// section, returning the changes to report.
    fn swap_in(&self, staged: StagedBatch, context: &MutationContext, now: u64) -> Notifications {
        let changed: HashSet<ContentId> = staged.changed.iter().cloned().collect();
        let advance_cursor = context.continuation_token.is_some()
            || context.origin == MutationOrigin::Refresh
            || staged.batch_token.is_some();

        let mut notifications = Vec::new();
        let mut sessions = self.sessions.lock();
        let mut head = self.head.write();

        for session in sessions.values_mut() {
            let kept: Vec<ContentId> = session
                .items
                .iter()
                .filter(|id| staged.head.contains(id))
                .cloned()
                .collect();

            let originating = context.session == Some(session.id);
            let appended: Vec<ContentId> = if originating {
                let present: HashSet<&ContentId> = kept.iter().collect();
                staged
                    .created
                    .iter()
                    .filter(|id| !present.contains(id))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            let changes =
                session_changes(session.id, &session.items, &kept, appended.len(), &changed);

            if originating {
                if advance_cursor {
                    session.cursor = staged.batch_token.clone();
                }
                session.last_access_ms = now;
            }
            session.items = kept;
            session.items.extend(appended);
            session.head_version = staged.head.version();

            if let Some(observer) = &session.observer {
                if !changes.is_empty() {
                    notifications.push((observer.clone(), changes));
                }
            }
        }

        *head = staged.head;
        notifications
    }
}

/// Wait until HEAD is refreshed or a HEAD refresh fails after `before`.
///
/// Returns `false` on timeout.
async fn wait_for_update(
    signal: &mut watch::Receiver<HeadSignal>,
    before: HeadSignal,
    limit: Option<Duration>,
) -> bool {
    let changed =
        |s: &HeadSignal| s.refreshes != before.refreshes || s.failures != before.failures;
    match limit {
        Some(limit) => {
            let waited = tokio::time::timeout(limit, signal.wait_for(changed)).await;
            matches!(waited, Ok(Ok(_)))
        }
        None => signal.wait_for(changed).await.is_ok(),
    }
}
