//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (resolve caller, reject unknown credentials)
//!     → Pass to routing
//!
//! Outbound request:
//!     → headers.rs (strip credentials and hop-by-hop, add X-Forwarded-For)
//! ```
//!
//! # Design Decisions
//! - Fail closed: unknown credentials are rejected, never downgraded to anonymous
//! - No trust in client input: caller-supplied identity headers never pass through

pub mod access_control;
pub mod headers;

pub use access_control::access_control_middleware;
