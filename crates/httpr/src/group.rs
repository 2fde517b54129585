//! Multi-request orchestration.
//!
//! A [`Group`] owns an ordered list of requests and offers two ways to run
//! them, each delivering [`ResultEnvelope`]s through a [`ResultStream`]:
//!
//! - [`sequential`](Group::sequential): one request at a time, in order. After
//!   each envelope the producer waits until the consumer calls
//!   [`advance`](Group::advance) or [`stop`](Group::stop).
//! - [`parallel`](Group::parallel): every request at once; envelopes arrive in
//!   completion order and the stream closes when all have finished.
//!
//! ```ignore
//! let group = Group::new(vec![service.get("/a"), service.get("/b")]);
//!
//! let stream = group.sequential();
//! while let Some(envelope) = stream.recv().await {
//!     if envelope.is_ok() {
//!         group.advance();
//!     } else {
//!         group.stop();
//!     }
//! }
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinSet;

use crate::error::Error;
use crate::http::{Request, ResultEnvelope};
use crate::logging::targets;

/// The receiving end of a group stream.
///
/// Handles are cheap to clone; every clone reads from the same channel, so
/// each envelope is received by exactly one of them.
#[derive(Clone)]
pub struct ResultStream {
    rx: Arc<AsyncMutex<mpsc::Receiver<ResultEnvelope>>>,
}

impl ResultStream {
    fn new(rx: mpsc::Receiver<ResultEnvelope>) -> Self {
        Self {
            rx: Arc::new(AsyncMutex::new(rx)),
        }
    }

    /// Receive the next envelope, or `None` once the stream has closed.
    pub async fn recv(&self) -> Option<ResultEnvelope> {
        self.rx.lock().await.recv().await
    }

    /// Receive every remaining envelope until the stream closes.
    pub async fn collect(&self) -> Vec<ResultEnvelope> {
        let mut rx = self.rx.lock().await;
        let mut envelopes = Vec::new();
        while let Some(envelope) = rx.recv().await {
            envelopes.push(envelope);
        }
        envelopes
    }

    /// Whether both handles read from the same channel.
    pub fn same_stream(&self, other: &ResultStream) -> bool {
        Arc::ptr_eq(&self.rx, &other.rx)
    }
}

impl std::fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("handles", &Arc::strong_count(&self.rx))
            .finish()
    }
}

/// What the sequential producer does after a delivered envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

struct GroupInner {
    requests: Vec<Arc<AsyncMutex<Request>>>,
    sequential: Mutex<Option<ResultStream>>,
    parallel: Mutex<Option<ResultStream>>,
    gate: Mutex<Option<oneshot::Sender<Step>>>,
}

/// An ordered set of requests run as a gated sequence or a parallel batch.
///
/// Cloning a group yields another handle to the same requests and streams,
/// so control calls can be made from a different task than the one
/// consuming envelopes.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

impl Group {
    /// Create a group from requests in the order they should run.
    pub fn new(requests: impl IntoIterator<Item = Request>) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                requests: requests
                    .into_iter()
                    .map(|request| Arc::new(AsyncMutex::new(request)))
                    .collect(),
                sequential: Mutex::new(None),
                parallel: Mutex::new(None),
                gate: Mutex::new(None),
            }),
        }
    }

    /// Number of requests in the group.
    pub fn len(&self) -> usize {
        self.inner.requests.len()
    }

    /// Whether the group has no requests.
    pub fn is_empty(&self) -> bool {
        self.inner.requests.is_empty()
    }

    /// Run the requests one after another.
    ///
    /// Each envelope is followed by a pause: the next request only starts
    /// after [`advance`](Self::advance), and [`stop`](Self::stop) ends the
    /// sequence without running the rest. Failed requests do not end the
    /// sequence. While a sequence is active, further calls return the same
    /// stream; once it has closed, a call starts a new one. The producer
    /// only holds a weak reference to the group, so dropping every group
    /// handle ends the sequence and closes the stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn sequential(&self) -> ResultStream {
        let mut slot = self.inner.sequential.lock();
        if let Some(stream) = slot.as_ref() {
            return stream.clone();
        }

        let (tx, rx) = mpsc::channel(1);
        let stream = ResultStream::new(rx);
        *slot = Some(stream.clone());
        drop(slot);

        let requests = self.inner.requests.clone();
        let group = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tracing::debug!(target: targets::GROUP, requests = requests.len(), "sequential stream started");

            for (position, request) in requests.iter().enumerate() {
                let mut envelope = request.lock().await.execute().await;
                envelope.position = Some(position);

                let (gate_tx, gate_rx) = oneshot::channel();
                let Some(inner) = group.upgrade() else {
                    // Every group handle is gone; nobody can advance past this one.
                    let _ = tx.send(envelope).await;
                    break;
                };
                *inner.gate.lock() = Some(gate_tx);
                drop(inner);

                if tx.send(envelope).await.is_err() {
                    break;
                }

                match gate_rx.await {
                    Ok(Step::Continue) => {}
                    Ok(Step::Stop) | Err(_) => {
                        tracing::debug!(target: targets::GROUP, position, "sequential stream stopped");
                        break;
                    }
                }
            }

            if let Some(inner) = group.upgrade() {
                inner.gate.lock().take();
                inner.sequential.lock().take();
            }
            drop(tx);
            tracing::debug!(target: targets::GROUP, "sequential stream closed");
        });

        stream
    }

    /// Let the sequential producer move on to the next request.
    ///
    /// Returns `false` if no delivered envelope was waiting for a decision.
    pub fn advance(&self) -> bool {
        self.release(Step::Continue)
    }

    /// End the sequential stream after the envelope just delivered.
    ///
    /// A request already executing is never interrupted. Returns `false` if
    /// no delivered envelope was waiting for a decision.
    pub fn stop(&self) -> bool {
        self.release(Step::Stop)
    }

    fn release(&self, step: Step) -> bool {
        let gate = self.inner.gate.lock().take();
        match gate {
            Some(gate) => gate.send(step).is_ok(),
            None => false,
        }
    }

    /// Run every request concurrently.
    ///
    /// Envelopes arrive in completion order, exactly one per request, and
    /// the stream closes after the last one. All requests run to completion
    /// regardless of failures. While a batch is active, further calls return
    /// the same stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn parallel(&self) -> ResultStream {
        let mut slot = self.inner.parallel.lock();
        if let Some(stream) = slot.as_ref() {
            return stream.clone();
        }

        let (tx, rx) = mpsc::channel(self.inner.requests.len().max(1));
        let stream = ResultStream::new(rx);
        *slot = Some(stream.clone());
        drop(slot);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut workers = JoinSet::new();
            for (position, request) in inner.requests.iter().enumerate() {
                let request = Arc::clone(request);
                let tx = tx.clone();
                workers.spawn(async move {
                    let run = async { request.lock().await.execute().await };
                    let envelope = match AssertUnwindSafe(run).catch_unwind().await {
                        Ok(mut envelope) => {
                            envelope.position = Some(position);
                            envelope
                        }
                        Err(panic) => {
                            let message = panic_message(panic.as_ref());
                            tracing::error!(target: targets::GROUP, position, "request task panicked: {}", message);
                            ResultEnvelope::failed(Error::Task(message), position)
                        }
                    };
                    let _ = tx.send(envelope).await;
                });
            }

            while let Some(joined) = workers.join_next().await {
                if let Err(err) = joined {
                    tracing::error!(target: targets::GROUP, "request task aborted: {}", err);
                }
            }

            inner.parallel.lock().take();
            drop(tx);
            tracing::debug!(target: targets::GROUP, requests = inner.requests.len(), "parallel stream closed");
        });

        stream
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("requests", &self.inner.requests.len())
            .field("sequential_active", &self.inner.sequential.lock().is_some())
            .field("parallel_active", &self.inner.parallel.lock().is_some())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
