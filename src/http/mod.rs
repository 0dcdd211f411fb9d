//! HTTP surface: routes and auth

pub mod middleware;
pub mod routes;

pub use routes::build_router;
