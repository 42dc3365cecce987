//! Failure taxonomy for forecast resolution.

use thiserror::Error;

/// Which upstream call a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `GET /points/{lat},{lon}`
    Points,
    /// `GET` of the forecast URL returned by the points stage
    Forecast,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Points => "points",
            Stage::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way a resolution can fail. None of these are fatal; callers render
/// without forecast data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    /// Transport failure, including the shared deadline running out.
    #[error("{stage} request failed: {reason}")]
    UpstreamUnreachable { stage: Stage, reason: String },

    /// Upstream answered with a non-success status.
    #[error("{stage} request rejected with status {status}")]
    UpstreamRejected { stage: Stage, status: u16 },

    /// Body did not parse, or a required field was missing or empty.
    #[error("{stage} response malformed: {reason}")]
    MalformedResponse { stage: Stage, reason: String },

    /// The caller cancelled the request.
    #[error("forecast request cancelled")]
    Cancelled,
}

impl ForecastError {
    pub(crate) fn from_transport(stage: Stage, error: reqwest::Error) -> Self {
        let reason = if error.is_timeout() {
            format!("timed out: {}", error)
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else {
            error.to_string()
        };
        ForecastError::UpstreamUnreachable { stage, reason }
    }

    pub(crate) fn deadline_exceeded(stage: Stage) -> Self {
        ForecastError::UpstreamUnreachable {
            stage,
            reason: "deadline exceeded".to_string(),
        }
    }

    /// Short, stable name for log fields and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnreachable { .. } => "upstream_unreachable",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Cancelled => "cancelled",
        }
    }

    /// The stage that failed; `None` for cancellation.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UpstreamUnreachable { stage, .. }
            | Self::UpstreamRejected { stage, .. }
            | Self::MalformedResponse { stage, .. } => Some(*stage),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// User-friendly message for the degraded forecast notice.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UpstreamUnreachable { .. } => {
                "The weather service could not be reached. Showing the page without a forecast."
            }
            Self::UpstreamRejected { status, .. } if *status >= 500 => {
                "The weather service is having trouble right now. Please try again later."
            }
            Self::UpstreamRejected { .. } => {
                "No forecast is available for this location."
            }
            Self::MalformedResponse { .. } => {
                "The weather service sent an unexpected response. Please try again later."
            }
            Self::Cancelled => "The forecast request was cancelled.",
        }
    }
}
