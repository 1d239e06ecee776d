//! First-load routing: decide where an incoming visitor should land before anything renders.
//!
//! The router deliberately uses its own, narrower set of anchored patterns rather than
//! [`crate::extract_video_id`]. It scans a whole page URL (which may embed a YouTube URL
//! after the site's own origin) and only trusts identifiers with an unambiguous boundary
//! on both sides.

use std::borrow::Cow;
use std::sync::OnceLock;

use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;

use crate::preference::PreferenceStore;
use crate::{Locale, SumtubeError, VideoId, locale};

/// The current page location as the router sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub href: String,
}

impl Location {
    /// Accepts an absolute URL, or a bare path which is resolved against a placeholder origin
    pub fn parse(input: &str) -> Result<Self, SumtubeError> {
        let input = input.trim();
        let url = match url::Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => url::Url::parse("http://localhost/")
                .and_then(|base| base.join(input))
                .map_err(|e| SumtubeError::MalformedUrl(format!("{input}: {e}")))?,
            Err(e) => return Err(SumtubeError::MalformedUrl(format!("{input}: {e}"))),
        };
        Ok(Self {
            path: url.path().to_string(),
            href: input.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RouteDecision {
    /// Already on a canonical locale path; the preference was refreshed
    Stay { locale: Locale },
    /// Replace the current page with `target`
    Redirect { target: String },
    /// Leave the page as it is
    Ignore,
}

fn anchor_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)[?&]v=([A-Za-z0-9_-]{11})(?:[&#]|$)",
            r"(?i)youtu\.be/([A-Za-z0-9_-]{11})(?:[?&#]|$)",
            r"(?i)youtube\.com/embed/([A-Za-z0-9_-]{11})(?:[?&#]|$)",
            r"(?i)/([A-Za-z0-9_-]{11})(?:[/?#]|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Locale whose canonical prefix `path` already carries
pub fn locale_prefix(path: &str) -> Option<Locale> {
    Locale::ALL.into_iter().find(|l| {
        let root = l.home_path();
        path == root || path.starts_with(&format!("{root}/"))
    })
}

/// Find a video identifier anywhere in a page URL
pub fn find_video_id(href: &str) -> Option<VideoId> {
    let decoded = urlencoding::decode(href).unwrap_or(Cow::Borrowed(href));
    anchor_patterns()
        .iter()
        .find_map(|re| re.captures(&decoded))
        .and_then(|caps| VideoId::parse(&caps[1]))
}

/// Run the entry router once for the current page load
pub fn route(location: &Location, browser_tag: Option<&str>, store: &dyn PreferenceStore) -> RouteDecision {
    if let Some(current) = locale_prefix(&location.path) {
        if let Err(e) = store.set_preference(current) {
            warn!("Could not store locale preference: {e}");
        }
        debug!("Path {} already canonical for {current}", location.path);
        return RouteDecision::Stay { locale: current };
    }

    let active = || locale::resolve(browser_tag, store.get_preference().as_deref());

    if let Some(video_id) = find_video_id(&location.href) {
        let target = format!("/{}/{video_id}", active());
        info!("Redirecting {} -> {target}", location.href);
        return RouteDecision::Redirect { target };
    }

    if location.path.is_empty() || location.path == "/" {
        let target = active().home_path();
        info!("Redirecting root -> {target}");
        return RouteDecision::Redirect { target };
    }

    RouteDecision::Ignore
}

/// Route a raw page URL. An unparsable location leaves the page as it is.
pub fn route_url(input: &str, browser_tag: Option<&str>, store: &dyn PreferenceStore) -> RouteDecision {
    match Location::parse(input) {
        Ok(location) => route(&location, browser_tag, store),
        Err(e) => {
            warn!("Not routing: {e}");
            RouteDecision::Ignore
        }
    }
}
