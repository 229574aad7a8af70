//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at load):
//!     RouteConfig[]
//!     → route.rs (compile templates, resolve target)
//!     → Sort by priority
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load time, immutable at runtime
//! - A broken template rejects the whole config
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod route;
pub mod router;

pub use route::{CompiledDeclaration, Route, RouteError};
pub use router::Router;
