//! Declarative HTTP requests with retrying execution and group orchestration.
//!
//! This crate provides:
//!
//! - **Services**: shared host, named paths, default headers and hooks from
//!   which requests are minted
//! - **Requests**: built once, materialized once, executed with a fixed
//!   sequence of retry delays and a pre-send / post-response hook pipeline
//! - **Groups**: run many requests as a gated sequential stream or as a
//!   parallel fan-in batch
//! - **Registry**: named services, single-threaded or shared
//!
//! # Executing a Request
//!
//! ```ignore
//! use std::time::Duration;
//! use httpr::{Request, Service};
//!
//! let service = Service::builder()
//!     .host("https://api.example.com")
//!     .header("Accept", "application/json")
//!     .build()?;
//!
//! let mut request = service
//!     .get("/users")
//!     .param("page", "1")
//!     .retry_delays([Duration::from_millis(100), Duration::from_secs(1)]);
//!
//! let response = request.response().await?;
//! let users: Vec<User> = response.json().await?;
//! ```
//!
//! ## Hooks
//!
//! Pre-send hooks can mutate the wire request; post-response hooks observe
//! the outcome and may signal stop. Service hooks always run before request
//! hooks:
//!
//! ```ignore
//! use std::ops::ControlFlow;
//!
//! let service = Service::builder()
//!     .host("https://api.example.com")
//!     .before_send(|req| {
//!         req.headers_mut().insert("x-request-id", new_id().parse().unwrap());
//!     })
//!     .after_response(|_req, outcome| match outcome {
//!         Ok(rsp) if rsp.status() == 401 => ControlFlow::Break(()),
//!         _ => ControlFlow::Continue(()),
//!     })
//!     .build()?;
//! ```
//!
//! # Groups
//!
//! ```ignore
//! use httpr::Group;
//!
//! let group = Group::new((1..=10).map(|id| service.get(format!("/users/{id}"))));
//!
//! // All at once, in completion order.
//! let envelopes = group.parallel().collect().await;
//!
//! // One at a time, with explicit advancement.
//! let stream = group.sequential();
//! while let Some(envelope) = stream.recv().await {
//!     if envelope.hook_stop {
//!         group.stop();
//!     } else {
//!         group.advance();
//!     }
//! }
//! ```

mod error;
pub mod group;
pub mod http;
pub mod logging;
pub mod registry;

pub use error::{Error, Result};

// Re-export commonly used types at the crate root
pub use group::{Group, ResultStream};
pub use self::http::{
    AfterResponse, BeforeSend, HookSet, HttpTransport, Request, RequestSnapshot, Response,
    ResultEnvelope, Service, ServiceBuilder, ServiceConfig, Timing, Transport,
};
pub use registry::{LocalMap, Registry, ServiceMap, SharedMap};
