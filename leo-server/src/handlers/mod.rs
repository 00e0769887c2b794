pub mod cache;
pub mod chat;
pub mod health;
pub mod ingest;
pub mod performance;

pub use cache::clear_cache;
pub use chat::{chat, chat_cache_key, should_cache_response, ChatRequest};
pub use health::health;
pub use ingest::{ingest, IngestResponse};
pub use performance::performance;
