//! Status polling for one submission.
//!
//! A [`SubmissionSession`] owns a cancellation token and the handle it uses to publish
//! display state. [`PollingClient::run`] drives the session through
//! `Requesting -> (Processing <-> Requesting) -> Completed | Failed`, with at most one
//! request outstanding: the next request is only issued after the previous response
//! was handled and the fixed delay elapsed. Both suspension points race the session's
//! token, and every publication re-checks it under the view lock, so a superseded
//! session can never touch what the current one displays.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::summary::{StatusSource, SummaryStatus, VideoMetadata};
use crate::{Locale, SumtubeError, VideoId};

pub const POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Performs the final full-page navigation
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, target: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Error,
}

/// What the form shows for the current submission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FormView {
    pub phase: Phase,
    pub in_flight: bool,
    pub metadata: Option<VideoMetadata>,
    /// Failure of the polling session itself
    pub error: Option<String>,
    /// Rejected form input; survives state changes of a session already in flight
    pub validation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Requesting,
    Processing(VideoMetadata),
    Completed { target: String },
    Failed(String),
}

/// One user-initiated summarization request
#[derive(Debug)]
pub struct SubmissionSession {
    video_id: VideoId,
    locale: Locale,
    token: CancellationToken,
    view: Arc<watch::Sender<FormView>>,
    state: Mutex<PollState>,
}

impl SubmissionSession {
    pub fn new(video_id: VideoId, locale: Locale, view: Arc<watch::Sender<FormView>>) -> Self {
        Self {
            video_id,
            locale,
            token: CancellationToken::new(),
            view,
            state: Mutex::new(PollState::Idle),
        }
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn state(&self) -> PollState {
        self.state.lock().map(|s| s.clone()).unwrap_or(PollState::Idle)
    }

    /// Tear the session down; any pending request or delay is abandoned
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Apply `next` to the shared view unless the session has been superseded.
    /// Returns false when the transition was dropped.
    fn transition(&self, next: PollState) -> bool {
        self.transition_then(next, || {})
    }

    /// Like [`Self::transition`], running `commit` under the view lock once the
    /// transition is applied. A cancel racing with `commit` either lands first and
    /// suppresses it, or lands after it has already happened.
    fn transition_then(&self, next: PollState, commit: impl FnOnce()) -> bool {
        let applied = self.view.send_if_modified(|view| {
            if self.token.is_cancelled() {
                return false;
            }
            match &next {
                PollState::Idle => {}
                PollState::Requesting => {
                    view.phase = Phase::Loading;
                    view.in_flight = true;
                    view.error = None;
                }
                PollState::Processing(meta) => view.metadata = Some(meta.clone()),
                PollState::Completed { .. } => {}
                PollState::Failed(message) => {
                    view.phase = Phase::Error;
                    view.in_flight = false;
                    view.error = Some(message.clone());
                }
            }
            commit();
            true
        });

        if applied {
            debug!("Session {}: {next:?}", self.video_id);
            if let Ok(mut state) = self.state.lock() {
                *state = next;
            }
        }
        applied
    }
}

pub struct PollingClient<S, N> {
    source: S,
    navigator: N,
    interval: Duration,
}

impl<S: StatusSource, N: Navigator> PollingClient<S, N> {
    pub fn new(source: S, navigator: N) -> Self {
        Self {
            source,
            navigator,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll until the summary is complete, then navigate once. Errors are terminal:
    /// a failed session is never retried.
    pub async fn run(&self, session: &SubmissionSession) -> Result<String, SumtubeError> {
        let result = self.poll(session).await;
        match &result {
            Ok(target) => info!("Summary for {} ready at {target}", session.video_id),
            Err(SumtubeError::Cancelled) => debug!("Session {} superseded", session.video_id),
            Err(e) => {
                warn!("Session {} failed: {e}", session.video_id);
                session.transition(PollState::Failed(e.user_message()));
            }
        }
        result
    }

    async fn poll(&self, session: &SubmissionSession) -> Result<String, SumtubeError> {
        loop {
            if !session.transition(PollState::Requesting) {
                return Err(SumtubeError::Cancelled);
            }

            let status = tokio::select! {
                biased;
                _ = session.token.cancelled() => return Err(SumtubeError::Cancelled),
                status = self.source.fetch(&session.video_id, session.locale) => status?,
            };

            match status {
                SummaryStatus::Processing(meta) => {
                    if !session.transition(PollState::Processing(meta)) {
                        return Err(SumtubeError::Cancelled);
                    }
                    tokio::select! {
                        biased;
                        _ = session.token.cancelled() => return Err(SumtubeError::Cancelled),
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
                SummaryStatus::Completed(done) => {
                    let target = done.destination()?;
                    let next = PollState::Completed { target: target.clone() };
                    if !session.transition_then(next, || self.navigator.navigate(&target)) {
                        return Err(SumtubeError::Cancelled);
                    }
                    return Ok(target);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};

    use tokio::time::Instant;

    use super::*;
    use crate::summary::CompletedSummary;

    /// Replays canned responses per video id and counts requests
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        script: Mutex<HashMap<String, VecDeque<Result<SummaryStatus, SumtubeError>>>>,
        calls: Mutex<Vec<(String, Locale)>>,
    }

    impl ScriptedSource {
        pub(crate) fn push(&self, video_id: &str, response: Result<SummaryStatus, SumtubeError>) {
            self.script
                .lock()
                .unwrap()
                .entry(video_id.to_string())
                .or_default()
                .push_back(response);
        }

        pub(crate) fn calls_for(&self, video_id: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|(v, _)| v == video_id).count()
        }

        pub(crate) fn calls(&self) -> Vec<(String, Locale)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl StatusSource for Arc<ScriptedSource> {
        async fn fetch(&self, video_id: &VideoId, locale: Locale) -> Result<SummaryStatus, SumtubeError> {
            self.calls.lock().unwrap().push((video_id.to_string(), locale));
            let next = self
                .script
                .lock()
                .unwrap()
                .get_mut(video_id.as_str())
                .and_then(|q| q.pop_front());
            next.unwrap_or_else(|| Err(SumtubeError::Transport("script exhausted".into())))
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingNavigator {
        pub(crate) targets: Mutex<Vec<String>>,
    }

    impl Navigator for Arc<RecordingNavigator> {
        fn navigate(&self, target: &str) {
            self.targets.lock().unwrap().push(target.to_string());
        }
    }

    pub(crate) fn processing(video_id: &str, title: &str) -> Result<SummaryStatus, SumtubeError> {
        Ok(SummaryStatus::Processing(VideoMetadata {
            video_id: video_id.into(),
            uploader_id: "@uploader".into(),
            title: title.into(),
            duration: 213,
        }))
    }

    pub(crate) fn completed(lang: &str, video_id: &str, path: &str) -> Result<SummaryStatus, SumtubeError> {
        Ok(SummaryStatus::Completed(CompletedSummary {
            lang: lang.into(),
            video_id: video_id.into(),
            path: path.into(),
        }))
    }

    fn fixture() -> (Arc<ScriptedSource>, Arc<RecordingNavigator>) {
        (Arc::default(), Arc::default())
    }

    fn session(video_id: &str, locale: Locale) -> (SubmissionSession, watch::Receiver<FormView>) {
        let (tx, rx) = watch::channel(FormView::default());
        let session = SubmissionSession::new(VideoId::parse(video_id).unwrap(), locale, Arc::new(tx));
        (session, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_twice_then_completed() {
        let (source, nav) = fixture();
        source.push("dQw4w9WgXcQ", processing("dQw4w9WgXcQ", "first"));
        source.push("dQw4w9WgXcQ", processing("dQw4w9WgXcQ", "refined"));
        source.push("dQw4w9WgXcQ", completed("fr", "dQw4w9WgXcQ", "never-gonna"));
        let client = PollingClient::new(source.clone(), nav.clone());
        let (session, rx) = session("dQw4w9WgXcQ", Locale::Fr);

        let start = Instant::now();
        let target = client.run(&session).await.unwrap();

        // two delays of the fixed interval and nothing else
        let elapsed = start.elapsed();
        assert!(elapsed >= POLL_INTERVAL * 2 && elapsed < POLL_INTERVAL * 3, "elapsed: {elapsed:?}");
        assert_eq!(target, "/fr/dQw4w9WgXcQ/never-gonna");
        assert_eq!(*nav.targets.lock().unwrap(), vec![target.clone()]);
        assert_eq!(source.calls().len(), 3);
        assert!(source.calls().iter().all(|(_, l)| *l == Locale::Fr));
        assert_eq!(session.state(), PollState::Completed { target });
        assert_eq!(rx.borrow().metadata.as_ref().unwrap().title, "refined");
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_uses_final_response_only() {
        let (source, nav) = fixture();
        source.push("dQw4w9WgXcQ", processing("aaaaaaaaaaa", "x"));
        source.push("dQw4w9WgXcQ", completed("de", "bbbbbbbbbbb", "final-slug"));
        let client = PollingClient::new(source, nav.clone());
        let (session, _rx) = session("dQw4w9WgXcQ", Locale::En);

        client.run(&session).await.unwrap();
        assert_eq!(*nav.targets.lock().unwrap(), vec!["/de/bbbbbbbbbbb/final-slug".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_not_retried() {
        let (source, nav) = fixture();
        source.push("dQw4w9WgXcQ", Err(SumtubeError::Transport("connection refused".into())));
        let client = PollingClient::new(source.clone(), nav.clone());
        let (session, rx) = session("dQw4w9WgXcQ", Locale::En);

        let start = Instant::now();
        let err = client.run(&session).await.unwrap_err();
        assert!(matches!(err, SumtubeError::Transport(_)));
        assert!(start.elapsed() < POLL_INTERVAL);
        assert_eq!(source.calls().len(), 1);
        assert!(nav.targets.lock().unwrap().is_empty());

        let view = rx.borrow();
        assert_eq!(view.phase, Phase::Error);
        assert!(!view.in_flight);
        assert!(view.error.is_some());
        assert!(matches!(session.state(), PollState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_completed_payload_never_navigates() {
        let (source, nav) = fixture();
        source.push("dQw4w9WgXcQ", processing("dQw4w9WgXcQ", "t"));
        source.push("dQw4w9WgXcQ", completed("en", "dQw4w9WgXcQ", ""));
        let client = PollingClient::new(source, nav.clone());
        let (session, rx) = session("dQw4w9WgXcQ", Locale::En);

        let err = client.run(&session).await.unwrap_err();
        assert!(matches!(err, SumtubeError::Protocol(_)));
        assert!(nav.targets.lock().unwrap().is_empty());
        assert_eq!(rx.borrow().phase, Phase::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_suppresses_repoll() {
        let (source, nav) = fixture();
        source.push("dQw4w9WgXcQ", processing("dQw4w9WgXcQ", "first"));
        source.push("dQw4w9WgXcQ", processing("dQw4w9WgXcQ", "zombie"));
        let client = Arc::new(PollingClient::new(source.clone(), nav.clone()));
        let (session, rx) = session("dQw4w9WgXcQ", Locale::En);
        let session = Arc::new(session);

        let handle = {
            let client = client.clone();
            let session = session.clone();
            tokio::spawn(async move { client.run(&session).await })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.borrow().metadata.as_ref().unwrap().title, "first");
        session.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SumtubeError::Cancelled)));
        tokio::time::sleep(POLL_INTERVAL * 2).await;
        assert_eq!(source.calls().len(), 1);
        assert_eq!(rx.borrow().metadata.as_ref().unwrap().title, "first");
        // the failure path must not repaint a cancelled session's view either
        assert_eq!(rx.borrow().phase, Phase::Loading);
    }

    /// Answers with a finished summary, but supersedes the session while doing so
    #[derive(Default)]
    struct SupersedingSource {
        session: Mutex<Option<Arc<SubmissionSession>>>,
    }

    impl StatusSource for Arc<SupersedingSource> {
        async fn fetch(&self, video_id: &VideoId, _locale: Locale) -> Result<SummaryStatus, SumtubeError> {
            if let Some(session) = self.session.lock().unwrap().as_ref() {
                session.cancel();
            }
            completed("en", video_id.as_str(), "slug")
        }
    }

    #[tokio::test]
    async fn test_superseded_session_never_navigates() {
        let source = Arc::new(SupersedingSource::default());
        let nav = Arc::new(RecordingNavigator::default());
        let client = PollingClient::new(source.clone(), nav.clone());
        let (session, rx) = session("dQw4w9WgXcQ", Locale::En);
        let session = Arc::new(session);
        *source.session.lock().unwrap() = Some(session.clone());

        let result = client.run(&session).await;
        assert!(matches!(result, Err(SumtubeError::Cancelled)));
        assert!(nav.targets.lock().unwrap().is_empty());
        assert_eq!(session.state(), PollState::Requesting);
        assert_eq!(rx.borrow().phase, Phase::Loading);
    }

    #[tokio::test]
    async fn test_navigation_commits_with_completed_state() {
        let (source, nav) = fixture();
        source.push("dQw4w9WgXcQ", completed("en", "dQw4w9WgXcQ", "slug"));
        let client = PollingClient::new(source, nav.clone());
        let (session, _rx) = session("dQw4w9WgXcQ", Locale::En);

        client.run(&session).await.unwrap();
        session.cancel();
        assert_eq!(*nav.targets.lock().unwrap(), vec!["/en/dQw4w9WgXcQ/slug".to_string()]);
        assert_eq!(
            session.state(),
            PollState::Completed {
                target: "/en/dQw4w9WgXcQ/slug".into()
            }
        );
    }

    #[test]
    fn test_transition_after_cancel_is_dropped() {
        let (session, rx) = session("dQw4w9WgXcQ", Locale::En);
        session.cancel();
        assert!(!session.transition(PollState::Requesting));
        assert_eq!(*rx.borrow(), FormView::default());
        assert_eq!(session.state(), PollState::Idle);
    }
}
