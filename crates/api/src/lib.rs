//! HTTP API layer for the shortlink service.

pub mod cache;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;

pub use cache::{CacheConfig, UrlCache};
pub use routes::router;
pub use service::UrlService;
pub use state::AppState;
