//! API Module
//!
//! HTTP handlers and routing for the inspection REST API over a cache and
//! an operation queue. See `routes::create_router` for the endpoint list.

pub mod handlers;
pub mod routes;
mod state;

pub use handlers::*;
pub use routes::create_router;
pub use state::AppState;
