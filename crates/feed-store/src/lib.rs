//! # Feed Store - Storage Handlers and Typed Stores
//!
//! **Purpose**: Persist HEAD content and the action log.
//!
//! This crate implements `StorageEffects` from feed-core and layers two typed
//! stores on top of any handler:
//!
//! - [`ContentStore`]: payloads keyed by content id plus HEAD metadata,
//!   written one atomic batch at a time
//! - [`ActionStore`]: append-only log of user actions
//!
//! Handlers retry nothing themselves; wrap one in [`RetryingStorage`] to get
//! bounded retries before an error reaches the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Durable action log
pub mod actions;

/// Content payloads and HEAD metadata
pub mod content;

/// Storage effect handlers
pub mod storage;

pub use actions::ActionStore;
pub use content::{ContentStore, ContentWriteBatch, StoredContent, StoredHead};
pub use storage::{FileStorageHandler, MemoryStorageHandler, RetryingStorage};
