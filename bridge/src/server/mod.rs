//! HTTP server for the bridge.

mod error;
pub mod handlers;
mod http;

pub use error::ApiError;
pub use handlers::AppState;
pub use http::{BridgeServer, router};
