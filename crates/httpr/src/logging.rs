//! Tracing targets used by this crate.
//!
//! httpr emits structured events through the `tracing` crate and never
//! installs a subscriber itself; the application decides where logs go:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("httpr::executor=debug")
//!     .init();
//! ```

/// Target names for log filtering.
pub mod targets {
    /// Request building and materialization.
    pub const REQUEST: &str = "httpr::request";
    /// Single-request execution: attempts, retries, hook evaluation.
    pub const EXECUTOR: &str = "httpr::executor";
    /// Sequential and parallel group streams.
    pub const GROUP: &str = "httpr::group";
    /// Service construction and request minting.
    pub const SERVICE: &str = "httpr::service";
    /// Response body reads and decoding.
    pub const RESPONSE: &str = "httpr::response";
    /// Named service registry.
    pub const REGISTRY: &str = "httpr::registry";
}
