//! Pre-send and post-response hooks.
//!
//! Hooks live at two scopes: a service-wide scope shared by every request
//! the service mints, and a per-request scope. At dispatch the two lists are
//! concatenated, shared scope first, so a header set by a service hook is
//! already present when a request hook runs.

use std::ops::ControlFlow;
use std::sync::Arc;

use super::request::Request;
use super::response::Response;
use crate::error::Error;

/// Observes or mutates the wire request right before it is sent.
///
/// Pre-send hooks cannot cancel the call and must not block.
pub trait BeforeSend: Send + Sync {
    /// Called once per execution, before the first attempt.
    fn on_before_send(&self, request: &mut reqwest::Request);
}

impl<F> BeforeSend for F
where
    F: Fn(&mut reqwest::Request) + Send + Sync,
{
    fn on_before_send(&self, request: &mut reqwest::Request) {
        self(request)
    }
}

/// Observes the outcome of an execution.
///
/// Returning `ControlFlow::Break(())` stops evaluation of the remaining
/// post-response hooks and marks the envelope with
/// [`hook_stop`](super::ResultEnvelope::hook_stop).
pub trait AfterResponse: Send + Sync {
    /// Called once per execution, after the last attempt.
    fn on_after_response(
        &self,
        request: &Request,
        outcome: Result<&Response, &Error>,
    ) -> ControlFlow<()>;
}

impl<F> AfterResponse for F
where
    F: Fn(&Request, Result<&Response, &Error>) -> ControlFlow<()> + Send + Sync,
{
    fn on_after_response(
        &self,
        request: &Request,
        outcome: Result<&Response, &Error>,
    ) -> ControlFlow<()> {
        self(request, outcome)
    }
}

/// Ordered pre-send and post-response hooks for one scope.
#[derive(Clone, Default)]
pub struct HookSet {
    before: Vec<Arc<dyn BeforeSend>>,
    after: Vec<Arc<dyn AfterResponse>>,
}

impl HookSet {
    /// Create an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-send hook.
    pub fn push_before(&mut self, hook: impl BeforeSend + 'static) {
        self.before.push(Arc::new(hook));
    }

    /// Append a post-response hook.
    pub fn push_after(&mut self, hook: impl AfterResponse + 'static) {
        self.after.push(Arc::new(hook));
    }

    /// Number of pre-send hooks.
    pub fn before_len(&self) -> usize {
        self.before.len()
    }

    /// Number of post-response hooks.
    pub fn after_len(&self) -> usize {
        self.after.len()
    }

    /// Whether both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Pre-send hooks of `shared` followed by those of `local`.
    pub(crate) fn chain_before(shared: &HookSet, local: &HookSet) -> Vec<Arc<dyn BeforeSend>> {
        shared.before.iter().chain(&local.before).cloned().collect()
    }

    /// Post-response hooks of `shared` followed by those of `local`.
    pub(crate) fn chain_after(shared: &HookSet, local: &HookSet) -> Vec<Arc<dyn AfterResponse>> {
        shared.after.iter().chain(&local.after).cloned().collect()
    }
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Run pre-send hooks in order.
pub(crate) fn run_before(hooks: &[Arc<dyn BeforeSend>], request: &mut reqwest::Request) {
    for hook in hooks {
        hook.on_before_send(request);
    }
}

/// Run post-response hooks in order until one breaks.
///
/// Returns `true` if a hook asked to stop.
pub(crate) fn run_after(
    hooks: &[Arc<dyn AfterResponse>],
    request: &Request,
    outcome: Result<&Response, &Error>,
) -> bool {
    hooks
        .iter()
        .any(|hook| hook.on_after_response(request, outcome).is_break())
}
