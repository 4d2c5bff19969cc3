//! # Feed Core - Foundation Layer
//!
//! **Purpose**: Define the vocabulary shared by every feed synchronization crate.
//!
//! # Architecture Constraints
//!
//! **This crate depends on no other workspace crate.**
//! - YES Identifier types and their wire/string conversions
//! - YES Data operations, mutation contexts and action records
//! - YES Wire schema and codec trait
//! - YES Effect traits for storage, network, clock and task spawning
//! - YES Unified error type and configuration
//! - NO storage handler implementations (that's feed-store)
//! - NO session or merge logic (that's feed-sync)
//!
//! ## Core Concepts
//!
//! - **Content ids**: opaque strings, bijective with `(namespace, id)` wire ids
//! - **Data operations**: the normalized mutations merged into HEAD
//! - **Effects**: capability traits injected at construction, never globals

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Dismiss action records
pub mod actions;

/// Feed configuration loaded from TOML
pub mod config;

/// Effect traits for external collaborators
pub mod effects;

/// Unified error type
pub mod errors;

/// Content, session and continuation identifiers
pub mod identifiers;

/// Host-facing observer interfaces
pub mod observer;

/// Data operations and mutation contexts
pub mod operations;

/// Wire schema and codec
pub mod wire;

pub use actions::{ActionRecord, ActionType};
pub use config::{FeedConfig, NetworkConfig, SchedulerConfig, SessionConfig, StorageConfig};
pub use errors::{FeedError, Result};
pub use identifiers::{ContentId, ContinuationToken, SessionId, WireContentId};
pub use observer::{ChangeKind, ContentEventReporter, SessionChange, SessionObserver};
pub use operations::{DataOperation, MutationContext, MutationOrigin, Payload};
