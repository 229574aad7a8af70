//! Templated route-rewriting reverse proxy library.

// Core subsystems
pub mod config;
pub mod http;
pub mod proxy;
pub mod routing;

// Request composition
pub mod compose;
pub mod identity;
pub mod template;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
