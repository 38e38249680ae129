//! HTTP API layer for the Beacon collector.

pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{ApiConfig, AppState};
