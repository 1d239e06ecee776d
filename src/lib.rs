pub mod config;
pub mod error;
pub mod form;
pub mod locale;
pub mod output;
pub mod poller;
pub mod preference;
pub mod router;
pub mod summary;

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub use error::SumtubeError;
pub use locale::Locale;

/// An 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a bare identifier, e.g. typed on the command line
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        is_valid_id(raw).then(|| VideoId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// True when `s` is exactly 11 characters of `[A-Za-z0-9_-]`
pub fn is_valid_id(s: &str) -> bool {
    s.len() == 11 && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// Each pattern requires the id to be followed by a non-id character or the end of input,
// so longer segments are never truncated into a match.
const ID: &str = r"([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)";

fn id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"youtu\.be/",
            r"youtube\.com/watch\?(?:[^#\s]*&)?v=",
            r"youtube\.com/embed/",
            r"youtube\.com/live/",
            r"youtube\.com/shorts/",
            // legacy: bare v= parameters and /v/, /u/<c>/ paths
            r"(?:^|[?&#])v=",
            r"/v/",
            r"/u/[A-Za-z0-9_-]/",
        ]
        .iter()
        .map(|prefix| Regex::new(&format!("{prefix}{ID}")).unwrap())
        .collect()
    })
}

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for re in id_patterns() {
        if let Some(caps) = re.captures(input) {
            return Some(VideoId(caps[1].to_string()));
        }
    }

    // Fallback: any absolute URL carrying a valid `v` query parameter
    let url = url::Url::parse(input).ok()?;
    let v = url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())?;
    is_valid_id(&v).then_some(VideoId(v))
}
