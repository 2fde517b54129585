//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use reqwest::ResponseBuilderExt;
use tokio::time::Instant;

use httpr::{Error, Result, Transport};

/// Marker for "never stop failing".
const ALWAYS: usize = usize::MAX;

/// A transport that fails a scripted number of times, then answers with a
/// JSON body naming the requested path.
pub struct ScriptedTransport {
    failures: AtomicUsize,
    failure: Error,
    attempts: AtomicUsize,
    attempt_times: Mutex<Vec<Instant>>,
    headers: Mutex<Vec<http::HeaderMap>>,
    latencies: HashMap<String, Duration>,
    bodies: HashMap<String, (&'static str, &'static str)>,
    body_reads: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Always succeeds.
    pub fn ok() -> Self {
        Self::failing_times(0)
    }

    /// Fails `n` times, then succeeds.
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures: AtomicUsize::new(n),
            failure: Error::Connection("scripted failure".to_string()),
            attempts: AtomicUsize::new(0),
            attempt_times: Mutex::new(Vec::new()),
            headers: Mutex::new(Vec::new()),
            latencies: HashMap::new(),
            bodies: HashMap::new(),
            body_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Never succeeds.
    pub fn always_failing() -> Self {
        Self::failing_times(ALWAYS)
    }

    /// Fail with `error` instead of a connection error.
    pub fn with_failure(mut self, error: Error) -> Self {
        self.failure = error;
        self
    }

    /// Delay answers for `path` by `latency`.
    pub fn with_latency(mut self, path: &str, latency: Duration) -> Self {
        self.latencies.insert(path.to_string(), latency);
        self
    }

    /// Answer `path` with a fixed body and content type.
    pub fn with_body(mut self, path: &str, content_type: &'static str, body: &'static str) -> Self {
        self.bodies.insert(path.to_string(), (content_type, body));
        self
    }

    /// Total calls made through this transport.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Clock readings taken at the start of each call.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().clone()
    }

    /// Headers of each received request, in arrival order.
    pub fn received_headers(&self) -> Vec<http::HeaderMap> {
        self.headers.lock().clone()
    }

    /// How many times any response body was pulled from the "network".
    pub fn body_reads(&self) -> usize {
        self.body_reads.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                ALWAYS => Some(ALWAYS),
                n => Some(n - 1),
            })
            .is_ok()
    }

    fn respond(&self, request: &reqwest::Request) -> reqwest::Response {
        let path = request.url().path().to_string();
        let (content_type, payload) = match self.bodies.get(&path) {
            Some((content_type, body)) => (*content_type, body.to_string()),
            None => ("application/json", format!("{{\"path\":\"{path}\"}}")),
        };

        let reads = Arc::clone(&self.body_reads);
        let mut chunk = Some(Bytes::from(payload));
        let stream = futures_util::stream::iter(std::iter::from_fn(move || {
            let next = chunk.take()?;
            reads.fetch_add(1, Ordering::SeqCst);
            Some(Ok::<_, std::io::Error>(next))
        }));

        let response = http::Response::builder()
            .status(200)
            .url(request.url().clone())
            .header("content-type", content_type)
            .header("x-path", path)
            .body(reqwest::Body::wrap_stream(stream))
            .expect("valid scripted response");
        reqwest::Response::from(response)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: reqwest::Request) -> BoxFuture<'_, Result<reqwest::Response>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.attempt_times.lock().push(Instant::now());
            self.headers.lock().push(request.headers().clone());

            if let Some(latency) = self.latencies.get(request.url().path()) {
                tokio::time::sleep(*latency).await;
            }

            if self.should_fail() {
                return Err(self.failure.clone());
            }
            Ok(self.respond(&request))
        })
    }
}

/// Install a test subscriber so `RUST_LOG` works when debugging a test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
