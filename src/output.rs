use serde::Serialize;

use crate::router::RouteDecision;
use crate::summary::VideoMetadata;

/// One line of `summarize --format json` output
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProgressEvent<'a> {
    Processing(&'a VideoMetadata),
    Completed { target: &'a str, url: &'a str },
}

/// A routing decision plus the cookie an HTTP consumer should set
#[derive(Debug, Serialize)]
pub struct RouteReport<'a> {
    #[serde(flatten)]
    pub decision: &'a RouteDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_cookie: Option<&'a str>,
}

/// One progress line for a processing snapshot
pub fn render_progress(meta: &VideoMetadata) -> String {
    let title = if meta.title.is_empty() { meta.video_id.as_str() } else { meta.title.as_str() };
    let mut line = format!("Processing: {title}");
    if !meta.uploader_id.is_empty() {
        line.push_str(&format!(" by {}", meta.uploader_id));
    }
    if meta.duration > 0 {
        line.push_str(&format!(" ({})", format_duration(meta.duration)));
    }
    line
}

/// `h:mm:ss` or `m:ss`
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub fn render_route(decision: &RouteDecision) -> String {
    match decision {
        RouteDecision::Stay { locale } => format!("stay ({locale})"),
        RouteDecision::Redirect { target } => format!("redirect {target}"),
        RouteDecision::Ignore => "ignore".to_string(),
    }
}

pub fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Compact single-line JSON, for streams of events
pub fn render_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
