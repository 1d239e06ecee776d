//! Supported locales and resolution of a browser language tag to one of them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A locale the site is published in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Pt,
    #[default]
    En,
    Fr,
    Es,
    It,
    De,
    Ru,
    Ar,
    Ja,
    Zh,
    Ko,
}

impl Locale {
    pub const ALL: [Locale; 11] = [
        Locale::Pt,
        Locale::En,
        Locale::Fr,
        Locale::Es,
        Locale::It,
        Locale::De,
        Locale::Ru,
        Locale::Ar,
        Locale::Ja,
        Locale::Zh,
        Locale::Ko,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Locale::Pt => "pt",
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::Es => "es",
            Locale::It => "it",
            Locale::De => "de",
            Locale::Ru => "ru",
            Locale::Ar => "ar",
            Locale::Ja => "ja",
            Locale::Zh => "zh",
            Locale::Ko => "ko",
        }
    }

    /// Exact, case-sensitive membership test against the supported codes
    pub fn from_code(code: &str) -> Option<Locale> {
        Locale::ALL.into_iter().find(|l| l.code() == code)
    }

    /// Root path of this locale, e.g. `/fr`
    pub fn home_path(self) -> String {
        format!("/{}", self.code())
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s).ok_or_else(|| format!("unsupported locale: {s}"))
    }
}

const TAG_MAP: &[(&str, Locale)] = &[
    ("pt", Locale::Pt),
    ("pt-br", Locale::Pt),
    ("en", Locale::En),
    ("en-us", Locale::En),
    ("fr", Locale::Fr),
    ("es", Locale::Es),
    ("es-es", Locale::Es),
    ("it", Locale::It),
    ("de", Locale::De),
    ("ru", Locale::Ru),
    ("ar", Locale::Ar),
    ("ja", Locale::Ja),
    ("zh", Locale::Zh),
    ("zh-cn", Locale::Zh),
    ("ko", Locale::Ko),
];

fn lookup(tag: &str) -> Option<Locale> {
    TAG_MAP.iter().find(|(t, _)| *t == tag).map(|(_, l)| *l)
}

/// Map a browser language tag to a supported locale, defaulting to English
pub fn detect(browser_tag: Option<&str>) -> Locale {
    let Some(tag) = browser_tag else {
        return Locale::default();
    };
    let tag = tag.trim().to_lowercase();
    let primary = tag.split('-').next().unwrap_or_default();
    lookup(&tag).or_else(|| lookup(primary)).unwrap_or_default()
}

/// Pick the active locale. A valid stored preference always wins over the browser tag.
pub fn resolve(browser_tag: Option<&str>, cookie_value: Option<&str>) -> Locale {
    cookie_value.and_then(Locale::from_code).unwrap_or_else(|| detect(browser_tag))
}

/// Derive a browser-style tag from the POSIX locale environment (`pt_BR.UTF-8` -> `pt-br`)
pub fn browser_tag_from_env() -> Option<String> {
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find_map(|value| posix_to_tag(&value))
}

fn posix_to_tag(value: &str) -> Option<String> {
    let base = value.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-").to_lowercase())
}
