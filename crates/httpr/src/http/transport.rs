//! The network seam between the executor and the wire.

use std::sync::{Arc, OnceLock};

use futures_util::future::BoxFuture;

use super::config::ServiceConfig;
use crate::error::{Error, Result};

/// Sends one materialized request and returns the raw response.
///
/// Implementations must be safe to share across concurrently executing
/// requests. A transport resolves once response headers arrive; the body is
/// left unread for [`Response`](super::Response) to consume lazily.
pub trait Transport: Send + Sync {
    /// Perform a single network call.
    ///
    /// Any error returned here counts as a failed call and is retried per
    /// the request's delays, except [`Error::Materialize`], which ends the
    /// execution at once.
    fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>>;
}

/// The default transport, backed by a pooled `reqwest::Client`.
///
/// Clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from a service configuration.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The transport used by requests created without a service.
    ///
    /// Built once per process from [`ServiceConfig::default`] and never
    /// replaced afterwards.
    pub fn shared_default() -> Arc<dyn Transport> {
        static DEFAULT: OnceLock<Arc<HttpTransport>> = OnceLock::new();
        DEFAULT
            .get_or_init(|| {
                let transport = HttpTransport::new(&ServiceConfig::default())
                    .expect("Failed to create HTTP transport with default configuration");
                Arc::new(transport)
            })
            .clone()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>> {
        Box::pin(async move {
            self.client.execute(request).await.map_err(|err| {
                // The request was already materialized; report late builder errors as send failures.
                if err.is_builder() {
                    Error::Transport(err.to_string())
                } else {
                    Error::from(err)
                }
            })
        })
    }
}
