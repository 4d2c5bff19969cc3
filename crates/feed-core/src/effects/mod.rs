//! Effect traits for the collaborators the engine consumes but does not own.
//!
//! Every handler is injected at construction; nothing here is a process-wide
//! singleton.
//!
//! - `StorageEffects`: durable key-value store with transactions
//! - `NetworkEffects`: HTTP-like request transport
//! - `ClockEffects`: wall-clock milliseconds
//! - `TaskSpawner`: background execution
//! - `RetryPolicy`: bounded retry with backoff, shared by handlers

pub mod network;
pub mod reliability;
pub mod storage;
pub mod task;
pub mod time;

pub use network::{HttpMethod, HttpRequest, NetworkEffects, NetworkError};
pub use reliability::{BackoffStrategy, RetryPolicy};
pub use storage::{StorageEffects, StorageError, Transaction, WriteOp};
pub use task::{TaskSpawner, TokioSpawner};
pub use time::{ClockEffects, SystemClock};
