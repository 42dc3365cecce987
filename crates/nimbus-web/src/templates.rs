//! Minimal HTML templates.
//!
//! `{{name}}` inserts an escaped value, `{{{name}}}` inserts pre-rendered
//! markup. Templates are compiled into the binary and parsed once.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template {template}: unclosed tag at byte {offset}")]
    UnclosedTag { template: &'static str, offset: usize },

    #[error("template {template}: empty tag at byte {offset}")]
    EmptyTag { template: &'static str, offset: usize },

    #[error("template {template}: no value for {{{{{name}}}}}")]
    MissingValue { template: &'static str, name: String },
}

impl IntoResponse for TemplateError {
    fn into_response(self) -> Response {
        tracing::error!("Template error: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Escaped(String),
    Raw(String),
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

/// Values for one render; keys are tag names.
pub type Vars<'a> = BTreeMap<&'a str, String>;

impl Template {
    pub fn parse(name: &'static str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let consumed = source.len() - rest.len();
            let tag_offset = consumed + start;
            let after_open = &rest[start + 2..];
            let (raw, body, close) = match after_open.strip_prefix('{') {
                Some(inner) => (true, inner, "}}}"),
                None => (false, after_open, "}}"),
            };

            let end = body.find(close).ok_or(TemplateError::UnclosedTag {
                template: name,
                offset: tag_offset,
            })?;

            let key = body[..end].trim();
            if key.is_empty() {
                return Err(TemplateError::EmptyTag {
                    template: name,
                    offset: tag_offset,
                });
            }

            segments.push(if raw {
                Segment::Raw(key.to_string())
            } else {
                Segment::Escaped(key.to_string())
            });

            let tag_len = (rest.len() - body.len()) + end + close.len();
            rest = &source[consumed + tag_len..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn render(&self, vars: &Vars<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Escaped(key) => out.push_str(&escape_html(self.lookup(vars, key)?)),
                Segment::Raw(key) => out.push_str(self.lookup(vars, key)?),
            }
        }

        Ok(out)
    }

    fn lookup<'v>(&self, vars: &'v Vars<'_>, key: &str) -> Result<&'v str, TemplateError> {
        vars.get(key)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::MissingValue {
                template: self.name,
                name: key.to_string(),
            })
    }
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Every page template the server renders.
#[derive(Debug)]
pub struct Templates {
    pub layout: Template,
    pub index: Template,
    pub weather: Template,
    pub period_row: Template,
    pub notice: Template,
    pub not_found: Template,
}

impl Templates {
    fn parse_embedded() -> Result<Self, TemplateError> {
        Ok(Self {
            layout: Template::parse("layout", include_str!("../templates/layout.html"))?,
            index: Template::parse("index", include_str!("../templates/index.html"))?,
            weather: Template::parse("weather", include_str!("../templates/weather.html"))?,
            period_row: Template::parse("period_row", include_str!("../templates/period_row.html"))?,
            notice: Template::parse("notice", include_str!("../templates/notice.html"))?,
            not_found: Template::parse("not_found", include_str!("../templates/not_found.html"))?,
        })
    }
}

static TEMPLATES: LazyLock<Result<Templates, TemplateError>> =
    LazyLock::new(Templates::parse_embedded);

/// The process-wide templates, parsed on first access.
pub fn templates() -> Result<&'static Templates, TemplateError> {
    TEMPLATES.as_ref().map_err(|e| e.clone())
}
