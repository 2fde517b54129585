//! Retrying single-request execution with the hook pipeline.

use chrono::Utc;

use super::hooks::{self, HookSet};
use super::request::{Request, Timing};
use super::response::{RequestSnapshot, Response};
use crate::error::{Error, Result};
use crate::logging::targets;

/// The outcome of one execution.
#[derive(Debug)]
pub struct ResultEnvelope {
    /// The response, or the error that prevented one.
    pub result: Result<Response>,
    /// Set when a post-response hook asked to stop.
    ///
    /// Advisory: groups never act on it, consumers of a sequential stream
    /// may use it to decide whether to call [`Group::stop`](crate::Group::stop).
    pub hook_stop: bool,
    /// Index of the request within its group, for group deliveries.
    pub position: Option<usize>,
}

impl ResultEnvelope {
    pub(crate) fn new(result: Result<Response>, hook_stop: bool) -> Self {
        Self {
            result,
            hook_stop,
            position: None,
        }
    }

    pub(crate) fn failed(error: Error, position: usize) -> Self {
        Self {
            result: Err(error),
            hook_stop: false,
            position: Some(position),
        }
    }

    /// Whether the execution produced a response.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// The response, if any.
    pub fn response(&self) -> Option<&Response> {
        self.result.as_ref().ok()
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Discard the envelope metadata.
    pub fn into_result(self) -> Result<Response> {
        self.result
    }
}

impl Request {
    /// Execute the request.
    ///
    /// The wire request is materialized on first use; a materialization
    /// failure is returned at once and no hook runs. Otherwise pre-send
    /// hooks run (shared scope first), the call is made, and a failed call
    /// is retried once per configured delay, sleeping that delay first,
    /// until an attempt succeeds. Every send error is retried except a
    /// materialization error, which cannot change between attempts. Post-response hooks then run in the same
    /// scope order until one breaks.
    ///
    /// Errors are returned inside the envelope; this never panics on a
    /// request failure.
    pub async fn execute(&mut self) -> ResultEnvelope {
        let before = HookSet::chain_before(&self.shared_hooks, &self.hooks);
        let (snapshot, template) = match self.wire_request() {
            Ok(wire) => {
                hooks::run_before(&before, wire);
                (RequestSnapshot::capture(wire), wire.try_clone())
            }
            Err(err) => {
                tracing::warn!(target: targets::EXECUTOR, method = self.method(), uri = self.uri(), "{}", err);
                return ResultEnvelope::new(Err(err), false);
            }
        };

        let start = Utc::now();
        self.started_at = Some(start);
        self.ended_at = None;

        let outcome = match template {
            Some(template) => self.send_with_retry(&template).await,
            None => Err(Error::Materialize(
                "request body cannot be replayed".to_string(),
            )),
        };

        let end = Utc::now();
        self.ended_at = Some(end);
        let timing = Timing { start, end };

        let result = outcome.map(|raw| Response::new(raw, snapshot, timing));

        if self.debug {
            match &result {
                Ok(response) => tracing::debug!(
                    target: targets::EXECUTOR,
                    method = self.method(),
                    url = response.url(),
                    status = response.status(),
                    elapsed_ms = timing.elapsed().as_millis() as u64,
                    "request completed"
                ),
                Err(err) => tracing::debug!(
                    target: targets::EXECUTOR,
                    method = self.method(),
                    uri = self.uri(),
                    elapsed_ms = timing.elapsed().as_millis() as u64,
                    "request failed: {}",
                    err
                ),
            }
        }

        let after = HookSet::chain_after(&self.shared_hooks, &self.hooks);
        let hook_stop = hooks::run_after(&after, self, result.as_ref());
        if hook_stop {
            tracing::trace!(target: targets::EXECUTOR, uri = self.uri(), "post-response hook requested stop");
        }

        ResultEnvelope::new(result, hook_stop)
    }

    /// Execute the request and return only the response or error.
    pub async fn response(&mut self) -> Result<Response> {
        self.execute().await.into_result()
    }

    async fn send_with_retry(&self, template: &reqwest::Request) -> Result<reqwest::Response> {
        let mut result = self.attempt(template).await;

        for (retry, delay) in self.retry_delay_list().iter().copied().enumerate() {
            let err = match &result {
                Ok(_) => break,
                Err(err) if err.is_materialization() => break,
                Err(err) => err,
            };
            tracing::debug!(
                target: targets::EXECUTOR,
                uri = self.uri(),
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "attempt failed, retrying: {}",
                err
            );
            tokio::time::sleep(delay).await;
            result = self.attempt(template).await;
        }

        if let Err(ref err) = result {
            tracing::warn!(target: targets::EXECUTOR, uri = self.uri(), "request failed: {}", err);
        }
        result
    }

    async fn attempt(&self, template: &reqwest::Request) -> Result<reqwest::Response> {
        match template.try_clone() {
            Some(request) => self.transport.send(request).await,
            None => Err(Error::Materialize(
                "request body cannot be replayed".to_string(),
            )),
        }
    }
}
