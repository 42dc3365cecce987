//! Page rendering on top of the embedded templates.

use axum::response::Html;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use nimbus_weather::{Coordinates, ForecastError, ForecastPeriod};

use crate::templates::{templates, TemplateError, Vars};

pub const SITE_TITLE: &str = "Nimbus";
pub const WELCOME_MESSAGE: &str = "Welcome to Nimbus. Check the forecast for any US location.";
pub const EMPTY_FORECAST_MESSAGE: &str = "No forecast periods were published for this location.";

/// Format used for the server time on the home page.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shown for a request header the client did not send.
pub const UNKNOWN: &str = "Unknown";

/// Characters of `User-Agent` shown before the preview is cut.
pub const USER_AGENT_PREVIEW_CHARS: usize = 40;

/// What the home page reports about the request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub id: u64,
    pub method: String,
    pub user_agent: String,
    pub host: String,
}

fn user_agent_preview(user_agent: &str) -> String {
    let mut chars = user_agent.chars();
    let preview: String = chars.by_ref().take(USER_AGENT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

fn in_layout(title: &str, content: String) -> Result<Html<String>, TemplateError> {
    let mut vars = Vars::new();
    vars.insert("title", title.to_string());
    vars.insert("content", content);
    templates()?.layout.render(&vars).map(Html)
}

pub fn home<Tz>(now: &DateTime<Tz>, request: &RequestInfo) -> Result<Html<String>, TemplateError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut vars = Vars::new();
    vars.insert("title", SITE_TITLE.to_string());
    vars.insert("message", WELCOME_MESSAGE.to_string());
    vars.insert("time", now.format(TIME_FORMAT).to_string());
    vars.insert(
        "timestamp",
        now.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    vars.insert("request_id", request.id.to_string());
    vars.insert("method", request.method.clone());
    vars.insert("user_agent", user_agent_preview(&request.user_agent));
    vars.insert("host", request.host.clone());

    let content = templates()?.index.render(&vars)?;
    in_layout(SITE_TITLE, content)
}

/// Render the forecast page. A failed resolution still renders: the table is
/// empty and a notice explains why.
pub fn weather(
    location: Coordinates,
    outcome: &Result<Vec<ForecastPeriod>, ForecastError>,
) -> Result<Html<String>, TemplateError> {
    let templates = templates()?;

    let (rows, notice) = match outcome {
        Ok(periods) if periods.is_empty() => (String::new(), Some(EMPTY_FORECAST_MESSAGE)),
        Ok(periods) => (render_rows(periods)?, None),
        Err(err) => (String::new(), Some(err.user_message())),
    };

    let notice = match notice {
        Some(message) => {
            let mut vars = Vars::new();
            vars.insert("message", message.to_string());
            templates.notice.render(&vars)?
        }
        None => String::new(),
    };

    let mut vars = Vars::new();
    vars.insert("location", location.to_string());
    vars.insert("latitude", format!("{:.4}", location.latitude));
    vars.insert("longitude", format!("{:.4}", location.longitude));
    vars.insert("notice", notice);
    vars.insert("rows", rows);

    let content = templates.weather.render(&vars)?;
    in_layout(&format!("Forecast for {} | {}", location, SITE_TITLE), content)
}

fn render_rows(periods: &[ForecastPeriod]) -> Result<String, TemplateError> {
    let row = &templates()?.period_row;
    periods
        .iter()
        .map(|period| {
            let mut vars = Vars::new();
            vars.insert("name", period.name.clone());
            vars.insert("short_description", period.short_description.clone());
            vars.insert("temperature", period.temperature.clone());
            vars.insert("wind_speed", period.wind_speed.clone());
            row.render(&vars)
        })
        .collect()
}

pub fn not_found(path: &str) -> Result<Html<String>, TemplateError> {
    let mut vars = Vars::new();
    vars.insert("path", path.to_string());
    let content = templates()?.not_found.render(&vars)?;
    in_layout(&format!("Not found | {}", SITE_TITLE), content)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use nimbus_weather::Stage;

    const NYC: Coordinates = Coordinates::new(40.7128, -74.0060);

    fn tonight() -> ForecastPeriod {
        ForecastPeriod {
            name: "Tonight".into(),
            short_description: "Clear".into(),
            temperature: "54F".into(),
            wind_speed: "5mph".into(),
        }
    }

    fn request(user_agent: &str) -> RequestInfo {
        RequestInfo {
            id: 7,
            method: "GET".into(),
            user_agent: user_agent.into(),
            host: "localhost:3000".into(),
        }
    }

    #[test]
    fn test_home_shows_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 5).unwrap();
        let Html(html) = home(&now, &request("curl/8.5.0")).unwrap();
        assert!(html.contains("<title>Nimbus</title>"));
        assert!(html.contains("2026-10-14 09:30:05"));
        assert!(html.contains("2026-10-14T09:30:05.000Z"));
        assert!(html.contains(WELCOME_MESSAGE));
    }

    #[test]
    fn test_home_shows_request_details() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 5).unwrap();
        let Html(html) = home(&now, &request("curl/8.5.0")).unwrap();
        assert!(html.contains("#7"));
        assert!(html.contains("GET"));
        assert!(html.contains("curl/8.5.0"));
        assert!(!html.contains("curl/8.5.0..."));
        assert!(html.contains("localhost:3000"));
    }

    #[test]
    fn test_user_agent_preview_is_cut() {
        let long = "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";
        let preview = user_agent_preview(long);
        assert_eq!(preview, "Mozilla/5.0 (X11; Linux x86_64; rv:131.0...");

        let exact = "a".repeat(USER_AGENT_PREVIEW_CHARS);
        assert_eq!(user_agent_preview(&exact), exact);
        assert_eq!(user_agent_preview("é".repeat(41).as_str()).chars().count(), 43);
    }

    #[test]
    fn test_weather_lists_periods_in_order() {
        let mut monday = tonight();
        monday.name = "Monday".into();
        let Html(html) = weather(NYC, &Ok(vec![tonight(), monday])).unwrap();

        let first = html.find("<td>Tonight</td>").unwrap();
        let second = html.find("<td>Monday</td>").unwrap();
        assert!(first < second);
        assert!(html.contains("<td>54F</td>"));
        assert!(!html.contains("class=\"notice\""));
    }

    #[test]
    fn test_weather_escapes_upstream_text() {
        let mut period = tonight();
        period.short_description = "<img src=x onerror=alert(1)>".into();
        let Html(html) = weather(NYC, &Ok(vec![period])).unwrap();
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_weather_empty_forecast_has_notice() {
        let Html(html) = weather(NYC, &Ok(Vec::new())).unwrap();
        assert!(html.contains(EMPTY_FORECAST_MESSAGE));
    }

    #[test]
    fn test_weather_failure_degrades() {
        let err = ForecastError::UpstreamRejected {
            stage: Stage::Points,
            status: 500,
        };
        let expected = err.user_message();
        let Html(html) = weather(NYC, &Err(err)).unwrap();

        assert!(html.contains("Forecast for 40.7128, -74.0060"));
        assert!(html.contains(&crate::templates::escape_html(expected)));
        assert!(!html.contains("<td>"));
    }

    #[test]
    fn test_not_found_escapes_path() {
        let Html(html) = not_found("/<script>").unwrap();
        assert!(html.contains("<code>/&lt;script&gt;</code>"));
    }
}
