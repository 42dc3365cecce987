use serde::{Deserialize, Serialize};
use url::Url;

/// Geographic location handed to the resolver.
///
/// The resolver trusts these values as given; use [`Coordinates::checked`]
/// when they come from user input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build coordinates only if both values are finite and within
    /// -90..=90 / -180..=180.
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        (lat_ok && lon_ok).then(|| Self::new(latitude, longitude))
    }

    /// `lat,lon` at four decimal places, the granularity `/points` expects.
    pub fn points_key(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Outcome of the `/points` stage: where the forecast document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointResolution {
    pub forecast_endpoint: Url,
}

/// One forecast entry ("Tonight", "Monday", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub name: String,
    pub short_description: String,
    /// Temperature with its unit embedded, e.g. `54F`.
    pub temperature: String,
    pub wind_speed: String,
}

/// Periods in the order upstream listed them.
pub type ForecastResult = Vec<ForecastPeriod>;

// Upstream wire format

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPointsResponse {
    pub properties: ApiPointsProperties,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPointsProperties {
    #[serde(default)]
    pub forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiForecastResponse {
    pub properties: ApiForecastProperties,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiForecastProperties {
    pub periods: Vec<ApiPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPeriod {
    pub name: String,
    pub short_forecast: String,
    pub temperature: ApiTemperature,
    #[serde(default)]
    pub temperature_unit: Option<String>,
    pub wind_speed: String,
}

/// The forecast document has carried temperature both as text ("54F") and as
/// a bare number next to `temperatureUnit`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiTemperature {
    Text(String),
    Number(serde_json::Number),
}

impl TryFrom<ApiPointsResponse> for PointResolution {
    type Error = String;

    fn try_from(api: ApiPointsResponse) -> Result<Self, Self::Error> {
        let raw = api
            .properties
            .forecast
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "points document has no forecast endpoint".to_string())?;

        let forecast_endpoint = Url::parse(&raw)
            .map_err(|e| format!("forecast endpoint {:?} is not a valid URL: {}", raw, e))?;

        Ok(Self { forecast_endpoint })
    }
}

impl From<ApiPeriod> for ForecastPeriod {
    fn from(api: ApiPeriod) -> Self {
        let temperature = match api.temperature {
            ApiTemperature::Text(text) => text,
            ApiTemperature::Number(value) => {
                format!("{}{}", value, api.temperature_unit.unwrap_or_default())
            }
        };

        Self {
            name: api.name,
            short_description: api.short_forecast,
            temperature,
            wind_speed: api.wind_speed,
        }
    }
}
