//! Per-request cancellation and deadlines.

use std::future::{Future, pending};
use std::sync::Arc;
use std::time::Duration;

use courier_core::TransportError;
use tokio::sync::watch;
use tokio::time::{Instant, timeout_at};

/// Cancellation and deadline signal attached to one dispatch.
///
/// When the deadline passes or the paired [`CancelHandle`] fires, the
/// in-flight transport call is dropped and the dispatch fails with a
/// transport error.
///
/// ```
/// use std::time::Duration;
/// use courier::RequestContext;
///
/// let (context, handle) = RequestContext::new()
///     .with_timeout(Duration::from_secs(5))
///     .cancellable();
/// handle.cancel();
/// assert!(context.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    /// A context that never expires and cannot be cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Expire at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Make the context cancellable, returning the handle that cancels it.
    ///
    /// Replaces any earlier handle.
    #[must_use]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancel = Some(receiver);
        (
            self,
            CancelHandle {
                sender: Arc::new(sender),
            },
        )
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the paired handle has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Drive `call` until it completes, the deadline passes, or the context
    /// is cancelled, whichever comes first.
    pub(crate) async fn run<T, F>(&self, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    // a dropped handle can never cancel
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let bounded = async {
            match self.deadline {
                Some(deadline) => timeout_at(deadline, call)
                    .await
                    .map_err(|_| TransportError::Timeout)?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Err(TransportError::Cancelled),
            result = bounded => result,
        }
    }
}

/// Cancels the [`RequestContext`] it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Cancel the context. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}
