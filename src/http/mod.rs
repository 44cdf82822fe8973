//! HTTP layer: router, handlers, middleware

pub mod middleware;
pub mod routes;

pub use routes::build_router;
