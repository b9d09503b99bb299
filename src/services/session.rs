use crate::error::AppError;
use crate::models::classify_types::{PredictionResult, ResultView};
use crate::models::history_types::HistoryEntry;
use crate::models::session_types::{
    ImageCandidate, ImageInfo, SessionSnapshot, SessionState, UploadedImage,
};
use crate::services::history_store::HistoryStore;
use crate::services::inference_client::InferenceClient;
use crate::services::upload;
use std::sync::{Arc, Mutex, MutexGuard};

/// A prediction request that has been started but not yet applied.
#[derive(Debug)]
pub struct Submission {
    pub token: u64,
    pub image: UploadedImage,
}

/// What applying a finished request did to the session.
#[derive(Debug, PartialEq)]
pub enum Completion {
    /// The result is now current and should be appended to the history.
    Succeeded {
        filename: String,
        result: PredictionResult,
    },
    Failed,
    /// The request was abandoned by `clear` or a newer selection; nothing changed.
    Stale,
}

/// Upload/predict lifecycle for a single image.
///
/// Every request carries a token. `clear` and `select_file` drop the live
/// token, so a response that arrives afterwards is recognised as stale.
/// Selections validated off the lock carry a ticket the same way: `clear` and
/// any later selection retire it.
pub struct Session {
    state: SessionState,
    image: Option<UploadedImage>,
    result: Option<PredictionResult>,
    error: Option<String>,
    next_token: u64,
    live_token: Option<u64>,
    selection: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            image: None,
            result: None,
            error: None,
            next_token: 1,
            live_token: None,
            selection: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validates and selects a file. On rejection the session is left as it was.
    pub fn select_file(&mut self, candidate: ImageCandidate) -> Result<(), AppError> {
        let image = upload::validate(candidate)?;
        self.select_validated(image);
        Ok(())
    }

    /// Reserves the right to select once validation finishes. Taking a new
    /// ticket retires every earlier one.
    pub fn begin_selection(&mut self) -> u64 {
        self.selection += 1;
        self.selection
    }

    /// Applies a validated image only if nothing has cleared or replaced the
    /// selection since `ticket` was taken.
    pub fn select_if_current(&mut self, ticket: u64, image: UploadedImage) -> bool {
        if ticket != self.selection {
            log::debug!("Ignoring superseded selection of {}", image.filename);
            return false;
        }
        self.select_validated(image);
        true
    }

    /// Selects an image that already passed `upload::validate`.
    pub fn select_validated(&mut self, image: UploadedImage) {
        self.selection += 1;
        log::debug!("Selected {} ({} bytes)", image.filename, image.size_bytes);
        self.image = Some(image);
        self.result = None;
        self.error = None;
        self.live_token = None;
        self.state = SessionState::Ready;
    }

    pub fn clear(&mut self) {
        if self.state == SessionState::Submitting {
            log::debug!("Abandoning in-flight prediction");
        }
        self.image = None;
        self.result = None;
        self.error = None;
        self.live_token = None;
        self.selection += 1;
        self.state = SessionState::Idle;
    }

    /// Starts a request from `Ready` or `Failed`. Returns `None` in any other
    /// state, which makes repeated submits while one is in flight a no-op.
    pub fn begin_submit(&mut self) -> Option<Submission> {
        if !matches!(self.state, SessionState::Ready | SessionState::Failed) {
            return None;
        }
        let image = self.image.clone()?;

        let token = self.next_token;
        self.next_token += 1;
        self.live_token = Some(token);
        self.error = None;
        self.state = SessionState::Submitting;

        Some(Submission { token, image })
    }

    pub fn complete(&mut self, token: u64, outcome: Result<PredictionResult, AppError>) -> Completion {
        if self.state != SessionState::Submitting || self.live_token != Some(token) {
            log::debug!("Ignoring response for abandoned submission {}", token);
            return Completion::Stale;
        }
        self.live_token = None;

        match outcome {
            Ok(result) => {
                self.state = SessionState::Succeeded;
                self.result = Some(result.clone());
                let filename = self
                    .image
                    .as_ref()
                    .map(|image| image.filename.clone())
                    .unwrap_or_default();
                Completion::Succeeded { filename, result }
            }
            Err(e) => {
                log::warn!("Prediction failed: {}", e);
                self.state = SessionState::Failed;
                self.error = Some(e.message().to_string());
                Completion::Failed
            }
        }
    }

    pub fn snapshot(&self, history: &[HistoryEntry]) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            image: self.image.as_ref().map(ImageInfo::from),
            result: self.result.as_ref().map(ResultView::from),
            error: self.error.clone(),
            history: history.to_vec(),
        }
    }
}

type Listener = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

/// Drives a [`Session`] against an inference client and the history store.
///
/// Locks are never held across the network call. When both are needed the
/// session lock is taken before the history lock.
#[derive(Clone)]
pub struct SessionController {
    session: Arc<Mutex<Session>>,
    history: Arc<Mutex<HistoryStore>>,
    client: Arc<dyn InferenceClient>,
    listener: Option<Listener>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionController {
    pub fn new(client: Arc<dyn InferenceClient>, history: HistoryStore) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            history: Arc::new(Mutex::new(history)),
            client,
            listener: None,
        }
    }

    /// Called with a fresh snapshot after every state change.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = lock(&self.session);
        let history = lock(&self.history);
        session.snapshot(history.entries())
    }

    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.history).entries().to_vec()
    }

    pub fn current_result(&self) -> Option<PredictionResult> {
        lock(&self.session).result().cloned()
    }

    pub fn select_file(&self, candidate: ImageCandidate) -> Result<SessionSnapshot, AppError> {
        let image = upload::validate(candidate)?;
        Ok(self.select_validated(image))
    }

    pub fn select_validated(&self, image: UploadedImage) -> SessionSnapshot {
        lock(&self.session).select_validated(image);
        self.publish()
    }

    /// Ticket for a selection whose validation runs outside the session lock.
    pub fn begin_selection(&self) -> u64 {
        lock(&self.session).begin_selection()
    }

    /// Applies the image for `ticket`, or leaves the session alone when a
    /// clear or a newer selection came in meanwhile.
    pub fn finish_selection(&self, ticket: u64, image: UploadedImage) -> SessionSnapshot {
        if lock(&self.session).select_if_current(ticket, image) {
            self.publish()
        } else {
            self.snapshot()
        }
    }

    pub fn clear(&self) -> SessionSnapshot {
        lock(&self.session).clear();
        self.publish()
    }

    /// Runs one prediction for the selected image. Returns immediately with
    /// the current snapshot when there is nothing to submit or a request is
    /// already in flight.
    pub async fn submit(&self) -> SessionSnapshot {
        let submission = lock(&self.session).begin_submit();
        let Some(Submission { token, image }) = submission else {
            return self.snapshot();
        };
        log::info!("Submitting {} for classification", image.filename);
        self.publish();

        let outcome = self.client.predict(image).await;

        let snapshot = {
            let mut session = lock(&self.session);
            let mut history = lock(&self.history);
            if let Completion::Succeeded { filename, result } = session.complete(token, outcome) {
                log::info!(
                    "{} classified as {} ({:.2}%)",
                    filename,
                    result.prediction,
                    result.confidence
                );
                if let Err(e) = history.record(&filename, &result) {
                    log::warn!("Failed to save history entry: {}", e);
                }
            }
            session.snapshot(history.entries())
        };
        self.notify(&snapshot);
        snapshot
    }

    pub fn clear_history(&self) -> Result<SessionSnapshot, AppError> {
        lock(&self.history).clear()?;
        Ok(self.publish())
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        self.notify(&snapshot);
        snapshot
    }

    fn notify(&self, snapshot: &SessionSnapshot) {
        if let Some(listener) = &self.listener {
            listener(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classify_types::Prediction;

    fn jpeg(name: &str, size: usize) -> ImageCandidate {
        ImageCandidate::new(name, "image/jpeg", vec![0; size])
    }

    fn malignant() -> PredictionResult {
        PredictionResult {
            prediction: Prediction::Malignant,
            confidence: 87.5,
            heatmap_url: None,
        }
    }

    #[test]
    fn invalid_selection_keeps_prior_state() {
        let mut session = Session::new();
        assert!(session.select_file(ImageCandidate::new("a.gif", "image/gif", vec![0; 10])).is_err());
        assert_eq!(session.state(), SessionState::Idle);

        session.select_file(jpeg("a.jpg", 10)).unwrap();
        let submission = session.begin_submit().unwrap();
        session.complete(submission.token, Ok(malignant()));
        assert_eq!(session.state(), SessionState::Succeeded);

        let err = session
            .select_file(ImageCandidate::new("big.png", "image/png", vec![0; 6 * 1024 * 1024]))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(session.state(), SessionState::Succeeded);
        assert_eq!(session.image().unwrap().filename, "a.jpg");
        assert!(session.result().is_some());
    }

    #[test]
    fn submit_only_from_ready_or_failed() {
        let mut session = Session::new();
        assert!(session.begin_submit().is_none());

        session.select_file(jpeg("a.jpg", 10)).unwrap();
        let first = session.begin_submit().unwrap();
        assert_eq!(session.state(), SessionState::Submitting);
        assert!(session.begin_submit().is_none());

        session.complete(first.token, Err(AppError::Service("timeout".into())));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.error(), Some("timeout"));

        let retry = session.begin_submit().unwrap();
        assert_ne!(retry.token, first.token);
        assert_eq!(session.error(), None);
        session.complete(retry.token, Ok(malignant()));
        assert!(session.begin_submit().is_none());
    }

    #[test]
    fn abandoned_response_is_ignored() {
        let mut session = Session::new();
        session.select_file(jpeg("a.jpg", 10)).unwrap();
        let stale = session.begin_submit().unwrap();
        session.clear();
        assert_eq!(session.complete(stale.token, Ok(malignant())), Completion::Stale);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.result().is_none());

        session.select_file(jpeg("b.jpg", 10)).unwrap();
        let old = session.begin_submit().unwrap();
        session.select_file(jpeg("c.jpg", 10)).unwrap();
        let current = session.begin_submit().unwrap();
        assert_eq!(session.complete(old.token, Err(AppError::Service("late".into()))), Completion::Stale);
        assert_eq!(session.state(), SessionState::Submitting);

        let done = session.complete(current.token, Ok(malignant()));
        assert_eq!(
            done,
            Completion::Succeeded {
                filename: "c.jpg".into(),
                result: malignant()
            }
        );
        assert_eq!(session.complete(current.token, Ok(malignant())), Completion::Stale);
    }

    #[test]
    fn new_selection_clears_result_and_error() {
        let mut session = Session::new();
        session.select_file(jpeg("a.jpg", 10)).unwrap();
        let submission = session.begin_submit().unwrap();
        session.complete(submission.token, Err(AppError::Service("down".into())));

        session.select_file(jpeg("b.jpg", 10)).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.error(), None);
        assert!(session.result().is_none());
    }

    #[test]
    fn superseded_selection_is_dropped() {
        let mut session = Session::new();
        let ticket = session.begin_selection();
        session.clear();
        let late = upload::validate(jpeg("late.jpg", 10)).unwrap();
        assert!(!session.select_if_current(ticket, late));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.image().is_none());

        let first = session.begin_selection();
        let second = session.begin_selection();
        let b = upload::validate(jpeg("b.jpg", 10)).unwrap();
        assert!(session.select_if_current(second, b));
        let a = upload::validate(jpeg("a.jpg", 10)).unwrap();
        assert!(!session.select_if_current(first, a));
        assert_eq!(session.image().unwrap().filename, "b.jpg");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn snapshot_describes_selected_image() {
        let mut session = Session::new();
        session.select_file(jpeg("slide.jpg", 2048)).unwrap();
        let snapshot = session.snapshot(&[]);
        let image = snapshot.image.unwrap();
        assert_eq!(snapshot.state, SessionState::Ready);
        assert_eq!(image.size_label, "2.00 KB");
        assert_eq!(image.mime_type, "image/jpeg");
    }
}
