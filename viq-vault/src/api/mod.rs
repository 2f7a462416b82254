//! HTTP API handlers for viq-vault
//!
//! REST endpoints drive the workflow engine; SSE streams its progress.

pub mod assets;
pub mod health;
pub mod sessions;
pub mod sse;

pub use assets::asset_routes;
pub use health::health_routes;
pub use sessions::session_routes;
pub use sse::vault_event_stream;
