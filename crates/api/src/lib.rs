//! HTTP API: router, authentication, route guards and handlers.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
