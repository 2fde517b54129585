//! Single-request layer: services, requests, execution and responses.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use httpr::http::Service;
//!
//! let service = Service::builder()
//!     .host("https://api.example.com")
//!     .path("user", "/users/{id}")
//!     .header("Accept", "application/json")
//!     .build()?;
//!
//! let mut request = service
//!     .get("/users")
//!     .retry_delays([Duration::from_millis(200)]);
//!
//! let envelope = request.execute().await;
//! match envelope.result {
//!     Ok(response) => println!("{}", response.text().await?),
//!     Err(err) => eprintln!("failed: {err}"),
//! }
//! ```

mod config;
mod executor;
mod hooks;
mod request;
mod response;
mod service;
mod transport;

pub use config::{DEFAULT_TIMEOUT, ServiceConfig};
pub use executor::ResultEnvelope;
pub use hooks::{AfterResponse, BeforeSend, HookSet};
pub use request::{Request, Timing};
pub use response::{RequestSnapshot, Response};
pub use service::{Service, ServiceBuilder};
pub use transport::{HttpTransport, Transport};
