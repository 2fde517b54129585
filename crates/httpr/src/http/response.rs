//! HTTP response with a lazily read, cached body.

use std::fmt::Write as _;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use super::request::Timing;
use crate::error::{Error, Result};
use crate::logging::targets;

/// What was actually sent on the wire, after pre-send hooks ran.
#[derive(Clone, Debug)]
pub struct RequestSnapshot {
    /// The HTTP method.
    pub method: http::Method,
    /// The full URL including query parameters.
    pub url: url::Url,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Request body, when it was a buffered body.
    pub body: Option<Bytes>,
}

impl RequestSnapshot {
    pub(crate) fn capture(request: &reqwest::Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(Bytes::copy_from_slice),
        }
    }
}

/// An HTTP response produced by executing a [`Request`](super::Request).
///
/// Status, headers and URL are available immediately. The body is read from
/// the network on the first call to [`bytes`](Self::bytes) (or any helper
/// built on it) and cached; later calls return the cached bytes, or the
/// cached error, without touching the connection again.
pub struct Response {
    status: http::StatusCode,
    version: http::Version,
    headers: http::HeaderMap,
    url: url::Url,
    raw: Mutex<Option<reqwest::Response>>,
    body: OnceCell<Result<Bytes>>,
    request: RequestSnapshot,
    timing: Timing,
}

impl Response {
    pub(crate) fn new(raw: reqwest::Response, request: RequestSnapshot, timing: Timing) -> Self {
        Self {
            status: raw.status(),
            version: raw.version(),
            headers: raw.headers().clone(),
            url: raw.url().clone(),
            raw: Mutex::new(Some(raw)),
            body: OnceCell::new(),
            request,
            timing,
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the final URL after redirects.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Get the HTTP version of the response.
    pub fn version(&self) -> http::Version {
        self.version
    }

    /// The wire request that produced this response.
    pub fn request(&self) -> &RequestSnapshot {
        &self.request
    }

    /// Start and end of the execution that produced this response.
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Whether the body has been read (successfully or not).
    pub fn is_body_read(&self) -> bool {
        self.body.initialized()
    }

    /// Get the response body as raw bytes.
    pub async fn bytes(&self) -> Result<Bytes> {
        self.body
            .get_or_init(|| async {
                let raw = self.raw.lock().take();
                match raw {
                    Some(raw) => {
                        let result = raw.bytes().await.map_err(|e| Error::Body(e.to_string()));
                        if let Err(ref err) = result {
                            tracing::debug!(target: targets::RESPONSE, url = %self.url, "body read failed: {}", err);
                        }
                        result
                    }
                    None => Err(Error::Body("response body already taken".to_string())),
                }
            })
            .await
            .clone()
    }

    /// Get the response body as text.
    pub async fn text(&self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Body(e.to_string()))
    }

    /// Parse the response body as JSON.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Parse the response body as XML.
    pub async fn xml<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = self.bytes().await?;
        let text = std::str::from_utf8(&bytes).map_err(|e| Error::Xml(e.to_string()))?;
        Ok(quick_xml::de::from_str(text)?)
    }

    /// Render the request, the response and a timing summary as text.
    ///
    /// Reads (and caches) the body if it has not been read yet.
    pub async fn dump(&self) -> Result<String> {
        let body = self.bytes().await?;
        let mut out = String::new();

        let target = match self.request.url.query() {
            Some(query) => format!("{}?{}", self.request.url.path(), query),
            None => self.request.url.path().to_string(),
        };
        let _ = write!(out, "{} {} HTTP/1.1\r\n", self.request.method, target);
        if let Some(host) = self.request.url.host_str() {
            let _ = write!(out, "Host: {host}\r\n");
        }
        write_headers(&mut out, &self.request.headers);
        out.push_str("\r\n");
        if let Some(body) = &self.request.body {
            out.push_str(&String::from_utf8_lossy(body));
        }

        let _ = write!(out, "{:?} {}\r\n", self.version, self.status);
        write_headers(&mut out, &self.headers);
        out.push_str("\r\n");
        out.push_str(&String::from_utf8_lossy(&body));

        let _ = write!(
            out,
            "\nSummary: start at {}, end at {}, cost {:?}\n",
            self.timing.start,
            self.timing.end,
            self.timing.elapsed()
        );
        Ok(out)
    }
}

fn write_headers(out: &mut String, headers: &http::HeaderMap) {
    for (name, value) in headers {
        let _ = write!(out, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status())
            .field("url", &self.url())
            .field("elapsed", &self.timing.elapsed())
            .finish()
    }
}
