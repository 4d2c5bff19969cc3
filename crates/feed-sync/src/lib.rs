//! # Feed Sync - Session Layer
//!
//! **Purpose**: Merge server responses into a canonical content state (HEAD)
//! and serve client sessions derived from it.
//!
//! # Architecture Constraints
//!
//! **This crate depends on feed-core and feed-store.**
//! - YES HEAD merge, session lifecycle and change notification
//! - YES Request scheduling policy and single in-flight requests
//! - YES Wire response translation
//! - YES Dismiss actions with durable recording
//! - NO storage handlers (that's feed-store)
//! - NO transport implementations (hosts inject `NetworkEffects`)
//!
//! ## Data Flow
//!
//! ```text
//! RequestManager ──bytes──▶ ProtocolAdapter ──ops──▶ UpdateConsumer
//!                                                       │ mutation lane
//!                                                       ▼
//!                          ContentStore ◀── commit ── SessionManager ──▶ observers
//! ActionManager ──ops──▶ SessionManager
//!               └─records (background)──▶ ActionStore
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feed_core::FeedConfig;
//! use feed_store::MemoryStorageHandler;
//! use feed_sync::{ActionManager, FeedContext, SessionManager};
//! # use feed_core::effects::{HttpRequest, NetworkEffects, NetworkError};
//! # struct Http;
//! # #[async_trait::async_trait]
//! # impl NetworkEffects for Http {
//! #     async fn send(&self, _: HttpRequest) -> Result<Vec<u8>, NetworkError> {
//! #         Err(NetworkError::Unavailable)
//! #     }
//! # }
//!
//! # async fn run() -> feed_core::Result<()> {
//! let context = FeedContext::new(
//!     FeedConfig::default(),
//!     Arc::new(MemoryStorageHandler::new()),
//!     Arc::new(Http),
//! );
//! let sessions = SessionManager::new(&context);
//! sessions.initialize().await?;
//! let actions = ActionManager::new(&context, sessions.clone());
//!
//! let session = sessions.get_new_session(None).await;
//! let features = sessions.stream_features(&session.items).await?;
//! # let _ = (actions, features);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Dismiss actions
pub mod actions;

/// Collaborators injected into the managers
pub mod context;

/// Wire response translation
pub mod protocol;

/// Refresh and pagination requests
pub mod request;

/// Request scheduling policy
pub mod scheduler;

/// HEAD, sessions and the mutation lane
pub mod session;

pub use actions::ActionManager;
pub use context::FeedContext;
pub use protocol::ProtocolAdapter;
pub use request::RequestManager;
pub use scheduler::{RequestBehavior, SchedulerPolicy, SchedulerState, StalenessScheduler, WaitMode};
pub use session::{MutationLane, RequestScope, SessionManager, SessionSnapshot, UpdateConsumer};
