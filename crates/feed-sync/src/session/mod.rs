//! Sessions over HEAD
//!
//! - [`SessionManager`]: HEAD ownership, session lifecycle, batch merge
//! - [`UpdateConsumer`]: applies a request result on the mutation lane
//! - [`MutationLane`]: the single-writer execution context

mod diff;
mod head;
mod lane;
mod manager;
mod state;

pub use lane::MutationLane;
pub use manager::{RequestScope, SessionManager, UpdateConsumer};
pub use state::SessionSnapshot;
