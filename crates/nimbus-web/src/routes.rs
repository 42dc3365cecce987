//! HTTP routes and handlers.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::handler::HandlerWithoutStateExt;
use axum::http::header::{HOST, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use nimbus_core::Config;
use nimbus_weather::{Coordinates, ForecastResolver, ResolverConfig};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::pages;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ForecastResolver>,
    pub default_location: Coordinates,
    /// Home page renders served by this process. Resets on restart.
    requests: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(resolver: ForecastResolver, default_location: Coordinates) -> Self {
        Self {
            resolver: Arc::new(resolver),
            default_location,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let resolver = ForecastResolver::new(ResolverConfig {
            base_url: config.weather.api_base_url.clone(),
            user_agent: config.weather.user_agent.clone(),
            timeout: config.weather.timeout(),
        });

        Self::new(
            resolver,
            Coordinates::new(
                config.weather.default_latitude,
                config.weather.default_longitude,
            ),
        )
    }

    /// Hand out the next request id, starting at 1.
    pub fn next_request_id(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Query string of `/weather`. Values stay raw so a bad number falls back to
/// the default location instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    #[serde(alias = "latitude")]
    pub lat: Option<String>,
    #[serde(alias = "longitude")]
    pub lon: Option<String>,
}

impl WeatherQuery {
    pub fn coordinates_or(&self, fallback: Coordinates) -> Coordinates {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(|s| s.trim().parse::<f64>().ok());

        match (parse(&self.lat), parse(&self.lon)) {
            (Some(lat), Some(lon)) => Coordinates::checked(lat, lon).unwrap_or(fallback),
            _ => fallback,
        }
    }
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    let static_files = ServeDir::new(static_dir).fallback(not_found.into_service());

    Router::new()
        .route("/", get(home))
        .route("/weather", get(weather))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(pages::UNKNOWN)
            .to_string()
    };

    let request = pages::RequestInfo {
        id: state.next_request_id(),
        method: method.to_string(),
        user_agent: header(USER_AGENT),
        host: header(HOST),
    };

    match pages::home(&chrono::Local::now(), &request) {
        Ok(html) => html.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let location = query.coordinates_or(state.default_location);

    // Cancel the resolver if this handler is dropped (client went away).
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let deadline = state.resolver.deadline(cancel);

    let outcome = state.resolver.resolve(location, &deadline).await;

    match &outcome {
        Ok(periods) => {
            tracing::debug!(
                %location,
                periods = periods.len(),
                remaining_ms = deadline.remaining().as_millis() as u64,
                "Forecast resolved"
            );
        }
        Err(e) if e.is_cancelled() => {
            tracing::debug!(%location, "Forecast request cancelled");
        }
        Err(e) => {
            tracing::warn!(
                %location,
                kind = e.kind(),
                stage = e.stage().map(|s| s.as_str()).unwrap_or("none"),
                error = %e,
                "Forecast unavailable, rendering without it"
            );
        }
    }

    match pages::weather(location, &outcome) {
        Ok(html) => html.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn not_found(uri: Uri) -> Response {
    match pages::not_found(uri.path()) {
        Ok(html) => (StatusCode::NOT_FOUND, html).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: Coordinates = Coordinates::new(40.7128, -74.0060);

    fn query(lat: Option<&str>, lon: Option<&str>) -> WeatherQuery {
        WeatherQuery {
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
        }
    }

    #[test]
    fn test_query_with_valid_coordinates() {
        let coords = query(Some("47.6062"), Some(" -122.3321 ")).coordinates_or(FALLBACK);
        assert_eq!(coords, Coordinates::new(47.6062, -122.3321));
    }

    #[test]
    fn test_missing_value_uses_fallback() {
        assert_eq!(query(Some("47.6"), None).coordinates_or(FALLBACK), FALLBACK);
        assert_eq!(query(None, None).coordinates_or(FALLBACK), FALLBACK);
    }

    #[test]
    fn test_request_ids_are_sequential_and_shared_by_clones() {
        let state = AppState::new(ForecastResolver::default(), FALLBACK);
        let clone = state.clone();
        assert_eq!(state.next_request_id(), 1);
        assert_eq!(clone.next_request_id(), 2);
        assert_eq!(state.next_request_id(), 3);
    }

    #[test]
    fn test_unparseable_or_out_of_range_uses_fallback() {
        assert_eq!(query(Some("north"), Some("-74")).coordinates_or(FALLBACK), FALLBACK);
        assert_eq!(query(Some("95"), Some("-74")).coordinates_or(FALLBACK), FALLBACK);
        assert_eq!(query(Some("NaN"), Some("-74")).coordinates_or(FALLBACK), FALLBACK);
    }
}
