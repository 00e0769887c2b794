//! HTTP backend for Leo: streaming chat with tool calls, topic ingestion and
//! operational endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod learning;
pub mod leo;
pub mod monitor;
pub mod research;
pub mod routes;
pub mod state;
pub mod system;

pub use config::Settings;
pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, DocumentIndex};
