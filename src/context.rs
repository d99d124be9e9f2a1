//! Cancellation and deadlines for store calls.
//!
//! A [`Context`] is passed explicitly into every blocking store call. Bindings own one for their
//! lifetime and cancel it when closed; hosts pass their own per-request context to `invoke`.

use crate::client::StoreError;
use futures::future::{self, Either};
use std::future::Future;
use std::pin::pin;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A cancellation signal with an optional deadline.
///
/// Cloning a context yields a handle to the same signal. Use [`Context::child`] to derive a
/// context that is cancelled along with its parent but can also be cancelled on its own.
#[derive(Debug, Clone)]
pub struct Context {
    /// Fires when this context or any ancestor is cancelled.
    token: CancellationToken,
    /// The instant after which work under this context is abandoned, if any.
    deadline: Option<Instant>,
}

impl Default for Context {
    #[inline]
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A root context that is never cancelled unless [`Context::cancel`] is called and has no
    /// deadline.
    #[inline]
    #[must_use]
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a context that is cancelled when `self` is.
    #[inline]
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context that additionally expires after `timeout`.
    ///
    /// The parent's deadline still applies if it is earlier.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(match self.deadline {
                Some(parent) => parent.min(deadline),
                None => deadline,
            }),
        }
    }

    /// Signal cancellation to this context and all contexts derived from it.
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether this context has been cancelled, directly or through an ancestor.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The deadline of this context, if any.
    #[inline]
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `future` to completion unless the context is cancelled or its deadline passes first.
    ///
    /// When interrupted, the future is dropped and [`StoreError::Cancelled`] or
    /// [`StoreError::TimedOut`] is returned.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, StoreError>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let deadline = self.deadline;
        if deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(StoreError::TimedOut);
        }

        let expired = pin!(async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        });
        let cancelled = pin!(self.token.cancelled());
        let work = pin!(future);

        match future::select(work, future::select(cancelled, expired)).await {
            Either::Left((output, _)) => Ok(output),
            Either::Right((Either::Left(_), _)) => Err(StoreError::Cancelled),
            Either::Right((Either::Right(_), _)) => Err(StoreError::TimedOut),
        }
    }
}
