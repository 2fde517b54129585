//! Services: shared configuration from which requests are minted.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use super::config::ServiceConfig;
use super::hooks::{AfterResponse, BeforeSend, HookSet};
use super::request::Request;
use super::response::Response;
use super::transport::{HttpTransport, Transport};
use crate::error::{Error, Result};
use crate::logging::targets;

/// Builder for creating a [`Service`].
pub struct ServiceBuilder {
    host: String,
    paths: HashMap<String, String>,
    headers: Vec<(String, String)>,
    config: ServiceConfig,
    transport: Option<Arc<dyn Transport>>,
    hooks: HookSet,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            host: String::new(),
            paths: HashMap::new(),
            headers: Vec::new(),
            config: ServiceConfig::default(),
            transport: None,
            hooks: HookSet::default(),
        }
    }

    /// Set the prefix prepended to every request URI.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Register a named path for [`Service::method`].
    pub fn path(mut self, name: impl Into<String>, uri: impl Into<String>) -> Self {
        self.paths.insert(name.into(), uri.into());
        self
    }

    /// Register several named paths.
    pub fn paths<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.paths
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Append a default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a default header, replacing earlier values for the same name.
    pub fn raw_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Add a shared pre-send hook; it runs before any request-scope hook.
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut reqwest::Request) + Send + Sync + 'static,
    {
        self.hooks.push_before(hook);
        self
    }

    /// Add a shared post-response hook; it runs before any request-scope hook.
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

    /// Add a shared pre-send hook object.
    pub fn before_send_hook(mut self, hook: impl BeforeSend + 'static) -> Self {
        self.hooks.push_before(hook);
        self
    }

    /// Add a shared post-response hook object.
    pub fn after_response_hook(mut self, hook: impl AfterResponse + 'static) -> Self {
        self.hooks.push_after(hook);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Log a summary of every completed execution.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Send through a custom transport instead of building one from the
    /// configuration. Timeouts and user agent are then up to the transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<Service> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };

        tracing::debug!(
            target: targets::SERVICE,
            host = %self.host,
            paths = self.paths.len(),
            hooks = ?self.hooks,
            "service built"
        );

        Ok(Service {
            inner: Arc::new(ServiceInner {
                host: self.host,
                paths: self.paths,
                headers: self.headers,
                config: self.config,
                transport,
                hooks: self.hooks,
            }),
        })
    }
}

struct ServiceInner {
    host: String,
    paths: HashMap<String, String>,
    headers: Vec<(String, String)>,
    config: ServiceConfig,
    transport: Arc<dyn Transport>,
    hooks: HookSet,
}

/// A request factory holding configuration shared by its requests.
///
/// The service is cheaply cloneable and thread-safe. Every request it mints
/// sends through the same transport (and so the same connection pool),
/// starts with the service's default headers, and runs the service's hooks
/// ahead of its own.
///
/// # Example
///
/// ```ignore
/// let service = Service::builder()
///     .host("https://api.example.com")
///     .paths([("list", "/users"), ("create", "/users")])
///     .before_send(|req| {
///         req.headers_mut().insert("x-trace", "1".parse().unwrap());
///     })
///     .build()?;
///
/// let users = service.method("GET", "list").response().await?;
/// ```
#[derive(Clone)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl Service {
    /// Create a builder for configuring a new service.
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    /// Get the host prefix.
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Get the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Get the shared hooks.
    pub fn hooks(&self) -> &HookSet {
        &self.inner.hooks
    }

    /// Look up a named path.
    pub fn named_path(&self, name: &str) -> Option<&str> {
        self.inner.paths.get(name).map(String::as_str)
    }

    /// Create a request for `host + uri`.
    pub fn request(&self, method: impl Into<String>, uri: impl AsRef<str>) -> Request {
        let inner = &self.inner;
        let mut request = Request::with_transport(
            method,
            format!("{}{}", inner.host, uri.as_ref()),
            Arc::clone(&inner.transport),
        );
        for (name, value) in &inner.headers {
            request = request.header(name.clone(), value.clone());
        }
        request.shared_hooks = inner.hooks.clone();
        request.debug = inner.config.debug;
        request
    }

    /// Create a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> Request {
        self.request("GET", uri)
    }

    /// Create a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> Request {
        self.request("POST", uri)
    }

    /// Create a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> Request {
        self.request("PUT", uri)
    }

    /// Create a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> Request {
        self.request("DELETE", uri)
    }

    /// Create a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> Request {
        self.request("PATCH", uri)
    }

    /// Create a request whose URI is `segments` joined with `/`.
    pub fn rest<S: AsRef<str>>(
        &self,
        method: impl Into<String>,
        segments: impl IntoIterator<Item = S>,
    ) -> Request {
        let uri = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        self.request(method, uri)
    }

    /// Create a request for a path registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics if no path was registered under `name`; referring to an
    /// unregistered path is a programming error.
    pub fn method(&self, method: impl Into<String>, name: &str) -> Request {
        match self.try_method(method, name) {
            Some(request) => request,
            None => panic!("no path registered under `{name}`"),
        }
    }

    /// Like [`method`](Self::method), returning `None` for unknown names.
    pub fn try_method(&self, method: impl Into<String>, name: &str) -> Option<Request> {
        let uri = self.inner.paths.get(name)?;
        Some(self.request(method, uri))
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("host", &self.inner.host)
            .field("paths", &self.inner.paths.len())
            .field("config", &self.inner.config)
            .field("hooks", &self.inner.hooks)
            .finish()
    }
}
