//! # Feed Testkit
//!
//! Deterministic fakes for every effect trait in feed-core, plus response
//! fixtures. Used by unit tests (as a dev-dependency) and by the integration
//! suites under each crate's `tests/`.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod fixtures;
pub mod network;
pub mod observer;
pub mod spawner;
pub mod storage;
pub mod time;

pub use fixtures::{
    clear_op, feature_op, remove_op, response_bytes, shared_state_op, token_op, wire_feature,
    wire_remove, wire_token,
};
pub use network::ScriptedNetwork;
pub use observer::RecordingObserver;
pub use spawner::ManualSpawner;
pub use storage::FlakyStorage;
pub use time::ControllableClock;

/// Install a `tracing` subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
