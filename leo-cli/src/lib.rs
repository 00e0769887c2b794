//! Deployment checks for the Leo backend: a remote smoke test and a local
//! Docker round trip.

pub mod backend;
pub mod local;
pub mod smoke;

pub use backend::{Backend, ChatOutcome, ChatProbe};
pub use local::LocalTest;
pub use smoke::Grade;
