//! The single persisted locale preference, modelled on the browser's `language` cookie.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::Locale;

pub const COOKIE_NAME: &str = "language";
pub const EXPIRY_DAYS: i64 = 365;

/// Read/write access to the stored locale preference
pub trait PreferenceStore {
    /// Raw stored value; callers validate it against the supported set
    fn get_preference(&self) -> Option<String>;

    /// Store `locale`, refreshing the expiry horizon
    fn set_preference(&self, locale: Locale) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalePreference {
    pub language: String,
    pub expires: DateTime<Utc>,
}

impl LocalePreference {
    pub fn new(locale: Locale, now: DateTime<Utc>) -> Self {
        Self {
            language: locale.code().to_string(),
            expires: now + Duration::days(EXPIRY_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Value for a `Set-Cookie` header. Not HttpOnly: page scripts read it too.
    pub fn set_cookie_header(&self) -> String {
        format!(
            "{COOKIE_NAME}={}; expires={}; path=/",
            urlencoding::encode(&self.language),
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT")
        )
    }
}

/// Find the `language` value in a `Cookie` request header
pub fn parse_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| {
            urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string())
        })
}

/// In-memory cookie store, seeded from a request's `Cookie` header
#[derive(Debug, Default)]
pub struct CookieJar {
    record: Mutex<Option<LocalePreference>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cookie the browser sent is by definition unexpired
    pub fn from_header(header: &str) -> Self {
        let record = parse_cookie_header(header).map(|language| LocalePreference {
            language,
            expires: Utc::now() + Duration::days(EXPIRY_DAYS),
        });
        Self {
            record: Mutex::new(record),
        }
    }

    pub fn with_record(record: LocalePreference) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    /// Current record, if any, for echoing back as `Set-Cookie`
    pub fn record(&self) -> Option<LocalePreference> {
        self.record.lock().ok().and_then(|r| r.clone())
    }
}

impl PreferenceStore for CookieJar {
    fn get_preference(&self) -> Option<String> {
        let record = self.record.lock().ok()?;
        record
            .as_ref()
            .filter(|r| !r.is_expired(Utc::now()))
            .map(|r| r.language.clone())
    }

    fn set_preference(&self, locale: Locale) -> Result<()> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| eyre::eyre!("preference lock poisoned"))?;
        *record = Some(LocalePreference::new(locale, Utc::now()));
        Ok(())
    }
}

/// Preference kept on disk so it survives between runs of the CLI
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Option<LocalePreference> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        let record: LocalePreference = serde_json::from_str(&data).ok()?;
        if record.is_expired(Utc::now()) {
            debug!("Stored preference expired at {}", record.expires);
            return None;
        }
        Some(record)
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(default_path())
    }
}

impl PreferenceStore for FileStore {
    fn get_preference(&self) -> Option<String> {
        self.load().map(|r| r.language)
    }

    fn set_preference(&self, locale: Locale) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let record = LocalePreference::new(locale, Utc::now());
        std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
        debug!("Stored locale preference {locale}: {}", self.path.display());
        Ok(())
    }
}

pub fn default_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sumtube")
        .join("preference.json")
}
