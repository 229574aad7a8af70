//! Proxy pipeline.
//!
//! # Data Flow
//! ```text
//! matched Route + CallerIdentity
//!     → director.rs (rewrite target, compose, sanitize)
//!     → forward.rs (send upstream, stream response back)
//!     → error.rs (map failures to 404/502/504)
//! ```

pub mod director;
pub mod error;
pub mod forward;
pub mod path;

pub use director::Director;
pub use error::ProxyError;
pub use forward::{build_client, forward, HttpClient};
pub use path::join_url_fragments;
