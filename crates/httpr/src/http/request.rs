//! Logical requests and their one-time materialization.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::hooks::{AfterResponse, BeforeSend, HookSet};
use super::response::Response;
use super::transport::{HttpTransport, Transport};
use crate::error::{Error, Result};
use crate::logging::targets;

/// Wall-clock bounds of one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// When the first attempt started.
    pub start: DateTime<Utc>,
    /// When the last attempt finished, successful or not.
    pub end: DateTime<Utc>,
}

impl Timing {
    /// Time between start and end.
    pub fn elapsed(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}

/// A declarative description of one HTTP call.
///
/// A request is configured through chained builder calls and then executed,
/// either directly with [`execute`](Request::execute) or as part of a
/// [`Group`](crate::Group). The wire request is built on first execution and
/// reused afterwards; later builder calls do not affect it.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use httpr::Request;
///
/// let mut request = Request::new("GET", "https://api.example.com/users")
///     .header("Accept", "application/json")
///     .param("page", "2")
///     .retry_delays([Duration::from_millis(100), Duration::from_millis(500)]);
///
/// let users: Vec<User> = request.response().await?.json().await?;
/// ```
pub struct Request {
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: Option<Bytes>,
    body_error: Option<Error>,
    retry_delays: Vec<Duration>,
    pub(crate) shared_hooks: HookSet,
    pub(crate) hooks: HookSet,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) debug: bool,
    wire: Option<reqwest::Request>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
}

impl Request {
    /// Create a standalone request using the process-wide default transport.
    ///
    /// An empty method is treated as `GET`.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::with_transport(method, uri, HttpTransport::shared_default())
    }

    /// Create a standalone request sending through `transport`.
    pub fn with_transport(
        method: impl Into<String>,
        uri: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            body_error: None,
            retry_delays: Vec::new(),
            shared_hooks: HookSet::default(),
            hooks: HookSet::default(),
            transport,
            debug: false,
            wire: None,
            started_at: None,
            ended_at: None,
        }
    }

    /// Replace the transport this request sends through.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Append a header, keeping any existing values for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a header, replacing any existing values for the same name.
    pub fn raw_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add several query parameters.
    pub fn params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self.body_error = None;
        self
    }

    /// Set a JSON body and a JSON content type unless one is already set.
    ///
    /// A value that fails to serialize makes materialization fail, so the
    /// request is never sent without its body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                self.body_error = None;
                let has_content_type = self
                    .headers
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
                if !has_content_type {
                    self.headers
                        .push(("Content-Type".to_string(), "application/json".to_string()));
                }
            }
            Err(e) => {
                tracing::debug!(target: targets::REQUEST, uri = %self.uri, "Failed to serialize JSON body: {}", e);
                self.body = None;
                self.body_error = Some(Error::Materialize(format!("cannot serialize JSON body: {e}")));
            }
        }
        self
    }

    /// Set the delays slept before each retry of a failed call.
    ///
    /// An empty sequence disables retries.
    pub fn retry_delays(mut self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.retry_delays = delays.into_iter().collect();
        self
    }

    /// Add a request-scope pre-send hook.
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut reqwest::Request) + Send + Sync + 'static,
    {
        self.hooks.push_before(hook);
        self
    }

    /// Add a request-scope post-response hook.
    pub fn after_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, std::result::Result<&Response, &Error>) -> ControlFlow<()>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.push_after(hook);
        self
    }

    /// Add a request-scope pre-send hook object.
    pub fn before_send_hook(mut self, hook: impl BeforeSend + 'static) -> Self {
        self.hooks.push_before(hook);
        self
    }

    /// Add a request-scope post-response hook object.
    pub fn after_response_hook(mut self, hook: impl AfterResponse + 'static) -> Self {
        self.hooks.push_after(hook);
        self
    }

    /// The configured method, `GET` if none was given.
    pub fn method(&self) -> &str {
        if self.method.is_empty() {
            "GET"
        } else {
            &self.method
        }
    }

    /// The target URI, without query parameters added by [`param`](Self::param).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The configured retry delays.
    pub fn retry_delay_list(&self) -> &[Duration] {
        &self.retry_delays
    }

    /// Start of the most recent execution.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// End of the most recent execution.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Timing of the most recent completed execution.
    pub fn timing(&self) -> Option<Timing> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(Timing { start, end }),
            _ => None,
        }
    }

    /// Whether the wire request has been built.
    pub fn is_materialized(&self) -> bool {
        self.wire.is_some()
    }

    /// The wire request, building it on first call.
    ///
    /// Once built it is cached and returned as-is on every later call,
    /// including any changes pre-send hooks made to it.
    pub fn wire_request(&mut self) -> Result<&mut reqwest::Request> {
        let wire = match self.wire.take() {
            Some(wire) => wire,
            None => self.materialize()?,
        };
        Ok(self.wire.insert(wire))
    }

    fn materialize(&self) -> Result<reqwest::Request> {
        if let Some(err) = &self.body_error {
            return Err(err.clone());
        }

        let method = reqwest::Method::from_bytes(self.method().as_bytes())?;

        let mut url = url::Url::parse(&self.uri)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Materialize(format!(
                "unsupported URL scheme `{}`",
                url.scheme()
            )));
        }
        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }

        let mut wire = reqwest::Request::new(method, url);
        for (name, value) in &self.headers {
            let name = http::HeaderName::from_bytes(name.as_bytes())?;
            let value = http::HeaderValue::from_str(value)?;
            wire.headers_mut().append(name, value);
        }
        if let Some(body) = &self.body {
            *wire.body_mut() = Some(body.clone().into());
        }

        Ok(wire)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method())
            .field("uri", &self.uri)
            .field("retry_delays", &self.retry_delays)
            .field("materialized", &self.wire.is_some())
            .field("shared_hooks", &self.shared_hooks)
            .field("hooks", &self.hooks)
            .finish()
    }
}
