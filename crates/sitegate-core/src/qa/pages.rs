//! Live page smoke checks and smoke-test path discovery.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::report::{PageCheck, PageChecks, PageSignals};
use super::site::Fetched;
use crate::config::GateConfig;

/// Paths checked when `publishedSpec` is unreadable.
pub const DEFAULT_PATHS: [&str; 3] = ["/", "/pricing", "/faq"];

const TITLE_MAX: usize = 140;
const CANONICAL_MAX: usize = 220;
const HTML_PREFIX_MAX: usize = 200;

lazy_static! {
    static ref TITLE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
    static ref CANONICAL_LINK: Regex =
        Regex::new(r#"(?i)<link[^>]*rel=["']canonical["'][^>]*>"#).unwrap();
    static ref HREF: Regex = Regex::new(r#"(?i)href=["']([^"']+)["']"#).unwrap();
    static ref ROBOTS_META: Regex = Regex::new(r#"(?i)<meta[^>]*name=["']robots["'][^>]*>"#).unwrap();
}

pub fn extract_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn extract_canonical(html: &str) -> Option<String> {
    let tag = CANONICAL_LINK.find(html)?;
    HREF.captures(tag.as_str()).map(|c| c[1].to_string())
}

pub fn has_meta_robots(html: &str) -> bool {
    ROBOTS_META.is_match(html)
}

/// First `max` characters, with an ellipsis when cut.
pub fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

/// Judge one fetched page against the enabled checks.
pub fn evaluate_page(path: &str, fetched: Result<Fetched, String>, config: &GateConfig) -> PageCheck {
    let fetched = match fetched {
        Ok(f) => f,
        Err(error) => {
            return PageCheck {
                path: path.to_string(),
                status: None,
                content_type: String::new(),
                ok: false,
                checks: PageChecks::default(),
                signals: PageSignals::default(),
                error: Some(error),
            }
        }
    };

    let is_html = fetched.content_type.contains("text/html");
    let (title, canonical) = if is_html {
        (extract_title(&fetched.body), extract_canonical(&fetched.body))
    } else {
        (None, None)
    };
    let robots = has_meta_robots(&fetched.body);

    let status_ok = if config.require_200 {
        fetched.status == 200
    } else {
        (200..400).contains(&fetched.status)
    };
    let checks = PageChecks {
        status_ok,
        title_ok: !config.require_title || title.is_some(),
        canonical_ok: !config.require_canonical || canonical.is_some(),
        robots_meta_ok: !config.require_robots_meta || robots,
    };

    PageCheck {
        path: path.to_string(),
        status: Some(fetched.status),
        content_type: fetched.content_type,
        ok: checks.all_ok(),
        checks,
        signals: PageSignals {
            title: title.map(|t| shorten(&t, TITLE_MAX)),
            canonical: canonical.map(|c| shorten(&c, CANONICAL_MAX)),
            html_first200: is_html.then(|| shorten(&fetched.body, HTML_PREFIX_MAX)),
        },
        error: None,
    }
}

fn string_or_field<'a>(v: &'a Value, field: &str) -> Option<&'a str> {
    v.as_str().or_else(|| v.get(field).and_then(Value::as_str))
}

/// Paths named by a `publishedSpec` document's `pages`, `routes` and
/// `navigation`, plus `/`. Deduplicated, `/`-prefixed, at most `max`.
pub fn discover_paths(spec: &Value, max: usize) -> Vec<String> {
    // A document persisted as a JSON string is parsed first.
    let parsed;
    let spec = match spec.as_str().map(serde_json::from_str::<Value>) {
        Some(Ok(v)) => {
            parsed = v;
            &parsed
        }
        _ => spec,
    };

    let list = |key: &str| spec.get(key).and_then(Value::as_array).cloned().unwrap_or_default();
    let pages = list("pages");
    let routes = list("routes");
    let navigation = list("navigation");

    let mut found: Vec<&str> = Vec::new();

    found.extend(pages.iter().filter_map(|p| string_or_field(p, "path")));
    found.extend(routes.iter().filter_map(|r| string_or_field(r, "path")));
    found.extend(navigation.iter().filter_map(|n| {
        n.get("href")
            .and_then(Value::as_str)
            .or_else(|| n.get("path").and_then(Value::as_str))
    }));
    found.push("/");

    let mut paths: Vec<String> = Vec::new();
    for raw in found {
        let path = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{}", raw)
        };
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths.truncate(max.max(1));
    paths
}

pub fn default_paths() -> Vec<String> {
    DEFAULT_PATHS.iter().map(|p| p.to_string()).collect()
}
