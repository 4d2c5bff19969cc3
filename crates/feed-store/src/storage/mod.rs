//! Storage effect handlers
//!
//! - `MemoryStorageHandler`: volatile, for tests and ephemeral hosts
//! - `FileStorageHandler`: single-file snapshot with atomic replace
//! - `RetryingStorage`: bounded retries around either

mod file;
mod memory;
mod retry;

pub use file::FileStorageHandler;
pub use memory::MemoryStorageHandler;
pub use retry::RetryingStorage;
