//! One end-to-end time bound shared by both resolution stages.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ForecastError, Stage};

/// An absolute expiry instant paired with the caller's cancellation token.
///
/// Both upstream calls race against the same instant, so time spent in the
/// points stage is no longer available to the forecast stage.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
    cancel: CancellationToken,
}

impl Deadline {
    /// Expire `budget` from now, with a token nobody else holds.
    pub fn after(budget: Duration) -> Self {
        Self::with_cancellation(budget, CancellationToken::new())
    }

    /// Expire `budget` from now, or earlier if `cancel` fires.
    pub fn with_cancellation(budget: Duration, cancel: CancellationToken) -> Self {
        Self::at(Instant::now() + budget, cancel)
    }

    pub fn at(expires_at: Instant, cancel: CancellationToken) -> Self {
        Self { expires_at, cancel }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `work` until it finishes, the deadline passes, or the token is
    /// cancelled. Dropping `work` on either of the latter aborts the request.
    pub(crate) async fn run<T, F>(&self, stage: Stage, work: F) -> Result<T, ForecastError>
    where
        F: Future<Output = Result<T, ForecastError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ForecastError::Cancelled),
            outcome = tokio::time::timeout_at(self.expires_at, work) => {
                outcome.unwrap_or_else(|_| Err(ForecastError::deadline_exceeded(stage)))
            }
        }
    }
}
