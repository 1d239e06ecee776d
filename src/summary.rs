use std::future::Future;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{Locale, SumtubeError, VideoId};

/// Body of a status request
#[derive(Debug, Serialize)]
pub struct SummaryRequest<'a> {
    #[serde(rename = "videoId")]
    pub video_id: &'a str,
    pub language: Locale,
}

/// Partial metadata reported while the summary is being produced
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VideoMetadata {
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(default)]
    pub uploader_id: String,
    #[serde(default)]
    pub title: String,
    /// Seconds
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompletedSummary {
    pub lang: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub path: String,
}

impl CompletedSummary {
    /// Site path of the finished summary page, `/{lang}/{videoId}/{path}`.
    /// Every field must be present; a half-built target is never returned.
    pub fn destination(&self) -> Result<String, SumtubeError> {
        let lang = Locale::from_code(&self.lang)
            .ok_or_else(|| SumtubeError::Protocol(format!("unsupported lang in completed response: {:?}", self.lang)))?;
        let video_id = self.video_id.trim();
        let path = self.path.trim().trim_start_matches('/');
        if video_id.is_empty() {
            return Err(SumtubeError::Protocol("completed response without videoId".into()));
        }
        if path.is_empty() {
            return Err(SumtubeError::Protocol("completed response without path".into()));
        }
        Ok(format!("/{lang}/{video_id}/{path}"))
    }
}

/// One status report from the summary service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryStatus {
    Processing(VideoMetadata),
    Completed(CompletedSummary),
}

/// Parse a response body. Anything but the two known shapes is a protocol violation.
pub fn parse_status(body: &str) -> Result<SummaryStatus, SumtubeError> {
    Ok(serde_json::from_str(body)?)
}

/// Where job status comes from
pub trait StatusSource: Send + Sync + 'static {
    fn fetch(
        &self,
        video_id: &VideoId,
        locale: Locale,
    ) -> impl Future<Output = Result<SummaryStatus, SumtubeError>> + Send;
}

/// Status source backed by the summary service's HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusSource {
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/summary", api_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl StatusSource for HttpStatusSource {
    async fn fetch(&self, video_id: &VideoId, locale: Locale) -> Result<SummaryStatus, SumtubeError> {
        let body = SummaryRequest {
            video_id: video_id.as_str(),
            language: locale,
        };
        debug!("POST {} videoId={video_id} language={locale}", self.endpoint);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!("Summary service returned {status}: {text}");
            return Err(SumtubeError::Transport(format!("summary service returned {status}")));
        }

        let text = resp.text().await?;
        parse_status(&text).inspect_err(|e| warn!("Rejecting response {text:?}: {e}"))
    }
}
