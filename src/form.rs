use std::sync::Arc;

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::poller::{FormView, Navigator, Phase, PollingClient, SubmissionSession};
use crate::summary::StatusSource;
use crate::{Locale, SumtubeError, VideoId, extract_video_id};

struct ActiveSubmission {
    session: Arc<SubmissionSession>,
    handle: JoinHandle<Result<String, SumtubeError>>,
}

/// Raw input plus the one submission it may have in flight
pub struct SubmissionForm<S, N> {
    client: Arc<PollingClient<S, N>>,
    locale: Locale,
    input: String,
    view: Arc<watch::Sender<FormView>>,
    active: Option<ActiveSubmission>,
}

impl<S: StatusSource, N: Navigator> SubmissionForm<S, N> {
    /// `locale` is the active locale of the page the form is rendered on
    pub fn new(client: PollingClient<S, N>, locale: Locale) -> Self {
        let (view, _) = watch::channel(FormView::default());
        Self {
            client: Arc::new(client),
            locale,
            input: String::new(),
            view: Arc::new(view),
            active: None,
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn view(&self) -> FormView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormView> {
        self.view.subscribe()
    }

    /// The submit control is disabled while this is true
    pub fn is_in_flight(&self) -> bool {
        self.view.borrow().in_flight
    }

    /// Validate the input and start polling for it. A new submission replaces the
    /// previous one; the old session is cancelled before the new one publishes anything.
    pub fn submit(&mut self) -> Result<VideoId, SumtubeError> {
        let Some(video_id) = extract_video_id(&self.input) else {
            let err = SumtubeError::InvalidInput(self.input.trim().to_string());
            let message = err.user_message();
            self.view.send_modify(|view| view.validation = Some(message));
            debug!("Rejected input {:?}", self.input);
            return Err(err);
        };

        if let Some(previous) = self.active.take() {
            info!("Replacing submission for {}", previous.session.video_id());
            previous.session.cancel();
        }

        self.view.send_modify(|view| {
            *view = FormView {
                phase: Phase::Loading,
                in_flight: true,
                metadata: None,
                error: None,
                validation: None,
            }
        });

        let session = Arc::new(SubmissionSession::new(video_id.clone(), self.locale, self.view.clone()));
        let handle = {
            let client = self.client.clone();
            let session = session.clone();
            tokio::spawn(async move { client.run(&session).await })
        };
        info!("Submitted {video_id} ({})", self.locale);
        self.active = Some(ActiveSubmission { session, handle });
        Ok(video_id)
    }

    /// Wait for the current submission to finish. `None` when nothing was submitted.
    pub async fn wait(&mut self) -> Option<Result<String, SumtubeError>> {
        let active = self.active.take()?;
        let result = match active.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SumtubeError::Cancelled),
            Err(e) => Err(SumtubeError::Transport(format!("polling task failed: {e}"))),
        };
        Some(result)
    }
}

impl<S, N> Drop for SubmissionForm<S, N> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.session.cancel();
        }
    }
}
