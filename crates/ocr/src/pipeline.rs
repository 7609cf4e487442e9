use divvy_core::{AnalysisPermit, BillItem, SharedSession};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::parser::ReceiptParser;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::RecognitionMode;

/// Shown when neither recognition pass produced an item.
pub const EMPTY_RESULT_MESSAGE: &str =
    "No items found. Try again closer to the receipt, with the paper flat and well lit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// Both passes returned zero fragments.
    NoTextFound,
    /// Text was found but no line survived classification and extraction.
    NoPriceableLines,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    Idle,
    Analyzing,
    Success(Vec<BillItem>),
    Empty { reason: EmptyReason, message: String },
    Failed(String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("OCR recognition failed: {0}")]
    OcrFailed(#[from] OcrError),
    #[error("No text found on the image")]
    NoTextFound,
    #[error("No priced items found on the image")]
    NoPriceableLines,
    #[error("An analysis is already running")]
    Busy,
    #[error("Analysis cancelled")]
    Cancelled,
}

impl From<EmptyReason> for AnalysisError {
    fn from(reason: EmptyReason) -> Self {
        match reason {
            EmptyReason::NoTextFound => AnalysisError::NoTextFound,
            EmptyReason::NoPriceableLines => AnalysisError::NoPriceableLines,
        }
    }
}

enum PassOutcome {
    Items(Vec<BillItem>),
    Empty { saw_text: bool },
}

/// One running analysis: holds the session permit and, if dropped before it settles,
/// puts the published state back to `Idle`.
struct InFlight<'a> {
    state: &'a watch::Sender<AnalysisState>,
    _permit: AnalysisPermit,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, state: AnalysisState) {
        self.state.send_replace(state);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("analysis abandoned before completion");
            self.state.send_replace(AnalysisState::Idle);
        }
    }
}

/// Orchestrates: accurate pass → (if empty) fast pass → commit into the session.
///
/// At most one analysis runs against a session at a time, across every orchestrator
/// sharing it; a second call while one is in flight is rejected with
/// [`AnalysisError::Busy`].
pub struct RecognitionOrchestrator<R: OcrBackend + 'static> {
    backend: Arc<R>,
    parser: Arc<ReceiptParser>,
    session: SharedSession,
    state: watch::Sender<AnalysisState>,
}

impl<R: OcrBackend + 'static> RecognitionOrchestrator<R> {
    pub fn new(backend: R, parser: ReceiptParser, session: SharedSession) -> Self {
        let (state, _) = watch::channel(AnalysisState::Idle);
        Self {
            backend: Arc::new(backend),
            parser: Arc::new(parser),
            session,
            state,
        }
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn state(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    /// Analyze one captured image and, on success, replace the session's items.
    ///
    /// `cancel` is checked before the fallback pass and again under the session lock
    /// right before committing; a cancelled analysis commits nothing. Dropping the
    /// returned future also commits nothing and releases the session.
    pub async fn analyze(
        &self,
        image: impl Into<Arc<[u8]>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BillItem>, AnalysisError> {
        let permit = self.session.lock().await.try_begin_analysis();
        let Some(permit) = permit else {
            warn!("analysis requested while another is running on this session");
            return Err(AnalysisError::Busy);
        };
        let mut run = InFlight { state: &self.state, _permit: permit, settled: false };
        self.state.send_replace(AnalysisState::Analyzing);

        let outcome = self.run_passes(image.into(), cancel).await;

        let mut session = self.session.lock().await;

        if cancel.is_cancelled() {
            info!("analysis cancelled, discarding result");
            run.settle(AnalysisState::Idle);
            return Err(AnalysisError::Cancelled);
        }

        match outcome {
            Ok(PassOutcome::Items(items)) => {
                info!(items = items.len(), "committing analyzed batch");
                session.commit_batch(items.clone());
                run.settle(AnalysisState::Success(items.clone()));
                Ok(items)
            }
            Ok(PassOutcome::Empty { saw_text }) => {
                let reason = if saw_text {
                    EmptyReason::NoPriceableLines
                } else {
                    EmptyReason::NoTextFound
                };
                info!(?reason, "no items after both passes");
                session.set_error(EMPTY_RESULT_MESSAGE);
                run.settle(AnalysisState::Empty {
                    reason,
                    message: EMPTY_RESULT_MESSAGE.to_string(),
                });
                Err(reason.into())
            }
            Err(e) => {
                warn!(error = %e, "recognition failed");
                session.set_error(e.to_string());
                run.settle(AnalysisState::Failed(e.to_string()));
                Err(AnalysisError::OcrFailed(e))
            }
        }
    }

    async fn run_passes(
        &self,
        image: Arc<[u8]>,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, OcrError> {
        let (accurate_fragments, items) =
            self.run_pass(Arc::clone(&image), RecognitionMode::Accurate).await?;
        if !items.is_empty() {
            return Ok(PassOutcome::Items(items));
        }
        if cancel.is_cancelled() {
            return Ok(PassOutcome::Empty { saw_text: accurate_fragments > 0 });
        }

        let (fast_fragments, items) = self.run_pass(image, RecognitionMode::Fast).await?;
        if items.is_empty() {
            return Ok(PassOutcome::Empty {
                saw_text: accurate_fragments > 0 || fast_fragments > 0,
            });
        }
        Ok(PassOutcome::Items(items))
    }

    /// One recognition + parse round. Returns the fragment count and parsed items.
    async fn run_pass(
        &self,
        image: Arc<[u8]>,
        mode: RecognitionMode,
    ) -> Result<(usize, Vec<BillItem>), OcrError> {
        let params = mode.params();
        debug!(
            %mode,
            language_correction = params.uses_language_correction,
            minimum_text_height = params.minimum_text_height,
            "starting recognition pass"
        );
        let backend = Arc::clone(&self.backend);
        let fragments = tokio::task::spawn_blocking(move || backend.recognize(&image, mode))
            .await
            .map_err(|e| OcrError::Engine(format!("recognition task failed: {e}")))??;

        let items = self.parser.parse_fragments(&fragments);
        info!(
            %mode,
            fragments = fragments.len(),
            items = items.len(),
            "recognition pass finished"
        );
        Ok((fragments.len(), items))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::locale::Locale;
    use crate::recognizer::MockRecognizer;
    use crate::types::TextFragment;
    use divvy_core::{BillSession, Money};
    use std::time::Duration;

    fn burger_and_fries() -> Vec<TextFragment> {
        vec![
            TextFragment::new("Burger", 0.2, 0.80),
            TextFragment::new("7.99", 0.8, 0.81),
            TextFragment::new("Fries", 0.2, 0.40),
            TextFragment::new("3.50", 0.8, 0.41),
        ]
    }

    fn orchestrator<R: OcrBackend + 'static>(backend: R) -> RecognitionOrchestrator<R> {
        RecognitionOrchestrator::new(
            backend,
            ReceiptParser::new(ParserConfig::for_locale(Locale::ItalianEnglish)),
            BillSession::new().shared(),
        )
    }

    /// Delays every call so tests can act while an analysis is in flight.
    struct SlowRecognizer {
        delay: Duration,
        inner: MockRecognizer,
    }

    impl OcrBackend for SlowRecognizer {
        fn recognize(
            &self,
            image_bytes: &[u8],
            mode: RecognitionMode,
        ) -> Result<Vec<TextFragment>, OcrError> {
            std::thread::sleep(self.delay);
            self.inner.recognize(image_bytes, mode)
        }
    }

    fn slow(fragments: Vec<TextFragment>) -> SlowRecognizer {
        SlowRecognizer {
            delay: Duration::from_millis(300),
            inner: MockRecognizer::new(fragments),
        }
    }

    #[tokio::test]
    async fn accurate_pass_success_skips_fast_pass() {
        let orch = orchestrator(MockRecognizer::new(burger_and_fries()));
        let items = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(orch.backend().calls(), vec![RecognitionMode::Accurate]);
        assert_eq!(orch.state(), AnalysisState::Success(items.clone()));

        let session = orch.session();
        let session = session.lock().await;
        assert_eq!(session.items(), items.as_slice());
        assert!(!session.is_analyzing());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn falls_back_to_fast_pass() {
        let fast = vec![TextFragment::new("Tiramisu 5,00", 0.5, 0.5)];
        let orch = orchestrator(MockRecognizer::per_mode(Ok(vec![]), Ok(fast)));

        let items = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap();

        assert_eq!(
            orch.backend().calls(),
            vec![RecognitionMode::Accurate, RecognitionMode::Fast]
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Tiramisu");
        assert_eq!(items[0].price, Some(Money::from_cents(500)));
    }

    #[tokio::test]
    async fn both_passes_empty() {
        let orch = orchestrator(MockRecognizer::new(vec![]));
        let err = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, AnalysisError::NoTextFound));
        match orch.state() {
            AnalysisState::Empty { reason, message } => {
                assert_eq!(reason, EmptyReason::NoTextFound);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected state {other:?}"),
        }
        let session = orch.session();
        assert_eq!(session.lock().await.last_error(), Some(EMPTY_RESULT_MESSAGE));
    }

    #[tokio::test]
    async fn text_without_items_is_no_priceable_lines() {
        let noise = vec![
            TextFragment::new("Totale 23.50", 0.5, 0.5),
            TextFragment::new("Grazie!", 0.5, 0.2),
        ];
        let orch = orchestrator(MockRecognizer::new(noise));
        let err = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoPriceableLines));
        assert_eq!(orch.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn hard_failure_skips_fallback() {
        let orch = orchestrator(MockRecognizer::per_mode(
            Err(OcrError::Engine("vision request failed".into())),
            Ok(burger_and_fries()),
        ));
        let err = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, AnalysisError::OcrFailed(OcrError::Engine(_))));
        assert_eq!(orch.backend().calls(), vec![RecognitionMode::Accurate]);
        assert_eq!(
            orch.state(),
            AnalysisState::Failed("OCR engine error: vision request failed".to_string())
        );
    }

    #[tokio::test]
    async fn failure_on_fast_pass() {
        let orch = orchestrator(MockRecognizer::per_mode(
            Ok(vec![]),
            Err(OcrError::Engine("timeout".into())),
        ));
        let err = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::OcrFailed(_)));
        assert!(matches!(orch.state(), AnalysisState::Failed(_)));
    }

    #[tokio::test]
    async fn failed_and_empty_keep_previous_batch() {
        let orch = orchestrator(MockRecognizer::per_mode(Ok(burger_and_fries()), Ok(vec![])));
        let first = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap();

        let empty = RecognitionOrchestrator::new(
            MockRecognizer::new(vec![]),
            ReceiptParser::default(),
            orch.session(),
        );
        assert!(empty.analyze(b"img".to_vec(), &CancellationToken::new()).await.is_err());

        let session = orch.session();
        let session = session.lock().await;
        assert_eq!(session.items(), first.as_slice());
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn new_analysis_replaces_batch() {
        let session = BillSession::new().shared();
        let a = RecognitionOrchestrator::new(
            MockRecognizer::new(burger_and_fries()),
            ReceiptParser::default(),
            Arc::clone(&session),
        );
        let b = RecognitionOrchestrator::new(
            MockRecognizer::new(vec![TextFragment::new("Soup 4.00", 0.5, 0.5)]),
            ReceiptParser::default(),
            Arc::clone(&session),
        );
        a.analyze(b"one".to_vec(), &CancellationToken::new()).await.unwrap();
        b.analyze(b"two".to_vec(), &CancellationToken::new()).await.unwrap();

        let names: Vec<String> =
            session.lock().await.items().iter().map(|i| i.name.clone()).collect();
        assert_eq!(names, vec!["Soup"]);
    }

    #[tokio::test]
    async fn pre_cancelled_analysis_commits_nothing() {
        let orch = orchestrator(MockRecognizer::new(burger_and_fries()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orch.analyze(b"img".to_vec(), &cancel).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(orch.state(), AnalysisState::Idle);
        let session = orch.session();
        assert!(session.lock().await.items().is_empty());
    }

    #[tokio::test]
    async fn cancel_while_in_flight_discards_result() {
        let orch = orchestrator(slow(burger_and_fries()));
        let cancel = CancellationToken::new();

        let (result, _) = tokio::join!(orch.analyze(b"img".to_vec(), &cancel), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        let session = orch.session();
        let session = session.lock().await;
        assert!(session.items().is_empty());
        assert!(!session.is_analyzing());
    }

    #[tokio::test]
    async fn second_analysis_while_running_is_rejected() {
        let orch = orchestrator(slow(burger_and_fries()));
        let cancel = CancellationToken::new();

        let (first, second) = tokio::join!(orch.analyze(b"img".to_vec(), &cancel), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(orch.session().lock().await.is_analyzing());
            assert_eq!(orch.state(), AnalysisState::Analyzing);
            orch.analyze(b"img".to_vec(), &cancel).await
        });

        assert_eq!(first.unwrap().len(), 2);
        assert!(matches!(second, Err(AnalysisError::Busy)));
    }

    #[tokio::test]
    async fn one_analysis_per_session_across_orchestrators() {
        let session = BillSession::new().shared();
        let a = RecognitionOrchestrator::new(
            slow(burger_and_fries()),
            ReceiptParser::default(),
            Arc::clone(&session),
        );
        let b = RecognitionOrchestrator::new(
            MockRecognizer::new(vec![TextFragment::new("Soup 4.00", 0.5, 0.5)]),
            ReceiptParser::default(),
            Arc::clone(&session),
        );
        let cancel = CancellationToken::new();

        let (first, second) = tokio::join!(a.analyze(b"one".to_vec(), &cancel), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            b.analyze(b"two".to_vec(), &cancel).await
        });

        assert_eq!(first.unwrap().len(), 2);
        assert!(matches!(second, Err(AnalysisError::Busy)));
        assert!(b.backend().calls().is_empty());
        assert_eq!(b.state(), AnalysisState::Idle);

        let session = session.lock().await;
        assert_eq!(session.items().len(), 2);
        assert!(!session.is_analyzing());
    }

    #[tokio::test]
    async fn abandoned_analysis_releases_session() {
        let orch = orchestrator(slow(burger_and_fries()));
        let cancel = CancellationToken::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            orch.analyze(b"img".to_vec(), &cancel),
        )
        .await;
        assert!(abandoned.is_err());

        assert_eq!(orch.state(), AnalysisState::Idle);
        assert!(!orch.session().lock().await.is_analyzing());
        assert!(orch.session().lock().await.items().is_empty());

        let items = orch.analyze(b"img".to_vec(), &cancel).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn fallback_pass_drops_language_correction() {
        let orch = orchestrator(MockRecognizer::new(vec![]));
        let _ = orch.analyze(b"img".to_vec(), &CancellationToken::new()).await;

        let params = orch.backend().requested_params();
        assert_eq!(params.len(), 2);
        assert!(params[0].uses_language_correction);
        assert!(!params[1].uses_language_correction);
        assert!(params[1].minimum_text_height < params[0].minimum_text_height);
    }

    #[tokio::test]
    async fn subscribers_see_final_state() {
        let orch = orchestrator(MockRecognizer::new(burger_and_fries()));
        let mut rx = orch.subscribe();
        orch.analyze(b"img".to_vec(), &CancellationToken::new()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(matches!(*rx.borrow_and_update(), AnalysisState::Success(_)));
    }
}
