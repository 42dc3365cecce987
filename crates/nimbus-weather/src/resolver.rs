//! National Weather Service forecast resolver.

use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::deadline::Deadline;
use crate::error::{ForecastError, Stage};
use crate::types::{
    ApiForecastResponse, ApiPointsResponse, Coordinates, ForecastPeriod, ForecastResult,
    PointResolution,
};

pub const NWS_API_BASE: &str = "https://api.weather.gov";
pub const GEO_JSON: &str = "application/geo+json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!(
    "nimbus/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/nimbus-weather/nimbus)"
);

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Scheme and host of the points endpoint, without trailing path.
    pub base_url: String,
    /// Sent as `User-Agent`; api.weather.gov rejects requests without one.
    pub user_agent: String,
    /// Budget for both stages together.
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: NWS_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Resolves coordinates to forecast periods.
///
/// Holds no per-request state; one instance can serve concurrent requests and
/// shares only the connection pool between them.
#[derive(Debug, Clone)]
pub struct ForecastResolver {
    client: Client,
    config: ResolverConfig,
}

impl ForecastResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// A deadline using the configured budget, tied to `cancel`.
    pub fn deadline(&self, cancel: CancellationToken) -> Deadline {
        Deadline::with_cancellation(self.config.timeout, cancel)
    }

    /// Resolve `coordinates` to its forecast periods, in upstream order.
    ///
    /// Both calls draw from `deadline`; the forecast stage is never attempted
    /// unless the points stage produced an endpoint. Failures are returned,
    /// never logged here.
    #[instrument(skip_all, fields(coordinates = %coordinates), level = "debug")]
    pub async fn resolve(
        &self,
        coordinates: Coordinates,
        deadline: &Deadline,
    ) -> Result<ForecastResult, ForecastError> {
        let resolution = self.resolve_point(coordinates, deadline).await?;
        self.fetch_periods(&resolution, deadline).await
    }

    /// Stage 1: `GET /points/{lat},{lon}` and pull out the forecast URL.
    pub async fn resolve_point(
        &self,
        coordinates: Coordinates,
        deadline: &Deadline,
    ) -> Result<PointResolution, ForecastError> {
        let url = format!(
            "{}/points/{}",
            self.config.base_url.trim_end_matches('/'),
            coordinates.points_key()
        );

        let api: ApiPointsResponse = self.fetch_json(Stage::Points, &url, deadline).await?;

        PointResolution::try_from(api).map_err(|reason| ForecastError::MalformedResponse {
            stage: Stage::Points,
            reason,
        })
    }

    /// Stage 2: fetch the forecast document a points lookup referred to.
    pub async fn fetch_periods(
        &self,
        resolution: &PointResolution,
        deadline: &Deadline,
    ) -> Result<ForecastResult, ForecastError> {
        let api: ApiForecastResponse = self
            .fetch_json(
                Stage::Forecast,
                resolution.forecast_endpoint.as_str(),
                deadline,
            )
            .await?;

        Ok(api
            .properties
            .periods
            .into_iter()
            .map(ForecastPeriod::from)
            .collect())
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: &str,
        deadline: &Deadline,
    ) -> Result<T, ForecastError> {
        let work = async {
            let response = self
                .client
                .get(url)
                .header(USER_AGENT, self.config.user_agent.as_str())
                .header(ACCEPT, GEO_JSON)
                .send()
                .await
                .map_err(|e| ForecastError::from_transport(stage, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ForecastError::UpstreamRejected {
                    stage,
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| ForecastError::from_transport(stage, e))?;

            serde_json::from_slice(&body).map_err(|e| ForecastError::MalformedResponse {
                stage,
                reason: e.to_string(),
            })
        };

        deadline.run(stage, work).await
    }
}

impl Default for ForecastResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
