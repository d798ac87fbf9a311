//! Session orchestration: drives normalize → batch → extract → merge.
//!
//! One `AnalysisSession` per document. Batches run strictly sequentially —
//! the engine is a shared, stateful resource — and batch `i` is fully
//! merged before batch `i + 1` begins, so progress callbacks observe a
//! monotonically growing character list. A failed batch is skipped, never
//! retried and never fatal; cancellation is cooperative and observed only
//! at batch boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::batcher::create_batches;
use super::engine::ExtractionEngine;
use super::error::AnalysisError;
use super::merger::CharacterAccumulator;
use super::normalize::split_into_paragraphs;
use super::types::{
    AnalysisConfig, BatchStatusEvent, SessionOutcome, SessionState, NARRATOR_NAME,
};

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// State machine for one document-analysis session:
/// `Idle → Running → (Completed | Failed | Cancelled)`.
///
/// Holds its own accumulator and cancellation flag; analyzing multiple
/// documents concurrently means one session per document. Nothing here is
/// process-wide.
pub struct AnalysisSession {
    session_id: String,
    config: AnalysisConfig,
    state: SessionState,
    accumulator: CharacterAccumulator,
    cancel: Arc<AtomicBool>,
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig) -> Self {
        let accumulator = CharacterAccumulator::with_strategy(config.match_strategy);
        Self {
            session_id: new_session_id(),
            config,
            state: SessionState::Idle,
            accumulator,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Request cooperative cancellation. An in-flight engine call completes;
    /// no further batch is started.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Shareable handle for cancelling from another thread.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run the full analysis over `pages`.
    ///
    /// Errors only on pipeline-level failures before any batch runs (a
    /// session that already ran, or normalization yielding zero paragraphs
    /// from non-empty input). Per-batch engine failures are counted in the
    /// outcome instead.
    pub fn run(
        &mut self,
        pages: &[String],
        engine: &dyn ExtractionEngine,
        progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
    ) -> Result<SessionOutcome, AnalysisError> {
        if self.state != SessionState::Idle {
            return Err(AnalysisError::Config(format!(
                "session already ran (state: {})",
                self.state
            )));
        }

        let start = Instant::now();
        self.state = SessionState::Running;

        let paragraphs = split_into_paragraphs(pages);
        if paragraphs.is_empty() {
            if pages.iter().any(|p| !p.trim().is_empty()) {
                // Non-empty input that normalizes to nothing is a
                // normalization anomaly, not an empty document.
                self.state = SessionState::Failed;
                return Err(AnalysisError::EmptyNormalization);
            }
            // Empty document: zero batches, but the session still runs its
            // full lifecycle so event-driven consumers see it end.
            if self.config.include_narrator {
                self.accumulator.ensure_character(NARRATOR_NAME);
            }
            self.state = SessionState::Completed;
            let outcome = self.outcome(0, 0, start);
            if let Some(progress) = progress_fn {
                progress(BatchStatusEvent::Started { total_batches: 0 });
                progress(BatchStatusEvent::SessionCompleted {
                    characters: outcome.characters.clone(),
                    failed_batches: 0,
                });
            }
            return Ok(outcome);
        }

        let batches = create_batches(&paragraphs, self.config.budget.input_tokens());
        let total_batches = batches.len();

        tracing::info!(
            session_id = %self.session_id,
            paragraphs = paragraphs.len(),
            total_batches,
            "Analysis session starting"
        );

        if self.config.include_narrator {
            self.accumulator.ensure_character(NARRATOR_NAME);
        }

        if let Some(progress) = progress_fn {
            progress(BatchStatusEvent::Started { total_batches });
        }

        let mut failed_batches = 0;
        let mut cancelled = false;

        for batch in &batches {
            // Cooperative cancellation, checked only between batches.
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!(
                    session_id = %self.session_id,
                    completed = batch.batch_index,
                    "Session cancelled; keeping partial results"
                );
                cancelled = true;
                break;
            }

            let input_text = self.config.budget.prepare_input_text(&batch.text);

            match engine.analyze(&input_text, batch.batch_index, total_batches, &self.config.budget) {
                Ok(extracted) => {
                    self.accumulator.merge_batch(&extracted);
                    if let Some(progress) = progress_fn {
                        progress(BatchStatusEvent::BatchCompleted {
                            batch_index: batch.batch_index,
                            total_batches,
                            characters: self.accumulator.to_list(),
                        });
                    }
                }
                Err(e) => {
                    // One bad batch must not abort the document.
                    tracing::warn!(
                        session_id = %self.session_id,
                        batch_index = batch.batch_index,
                        error = %e,
                        "Engine failed for batch; skipping its merge"
                    );
                    failed_batches += 1;
                    if let Some(progress) = progress_fn {
                        progress(BatchStatusEvent::BatchFailed {
                            batch_index: batch.batch_index,
                            total_batches,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        self.state = if cancelled {
            SessionState::Cancelled
        } else {
            SessionState::Completed
        };

        let outcome = self.outcome(total_batches, failed_batches, start);

        if let Some(progress) = progress_fn {
            progress(BatchStatusEvent::SessionCompleted {
                characters: outcome.characters.clone(),
                failed_batches,
            });
        }

        tracing::info!(
            session_id = %self.session_id,
            state = %self.state,
            characters = outcome.characters.len(),
            failed_batches,
            duration_ms = outcome.duration_ms,
            "Analysis session finished"
        );

        Ok(outcome)
    }

    /// Accumulated characters so far, most-quoted first. Valid at any point;
    /// partial while running or after cancellation.
    pub fn characters(&self) -> Vec<super::types::MergedCharacter> {
        self.accumulator.to_list()
    }

    fn outcome(&self, total_batches: usize, failed_batches: usize, start: Instant) -> SessionOutcome {
        SessionOutcome {
            session_id: self.session_id.clone(),
            state: self.state,
            characters: self.accumulator.to_list(),
            total_batches,
            failed_batches,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::pipeline::budget::PassTokenBudget;
    use crate::pipeline::types::{ExtractedCharacter, MatchStrategy};

    /// Engine that reports one character per batch, named by batch index.
    struct ScriptedEngine;

    impl ExtractionEngine for ScriptedEngine {
        fn analyze(
            &self,
            _batch_text: &str,
            batch_index: usize,
            _total_batches: usize,
            _budget: &PassTokenBudget,
        ) -> Result<Vec<ExtractedCharacter>, AnalysisError> {
            Ok(vec![ExtractedCharacter {
                name: format!("Person{batch_index}"),
                dialogs: vec![format!("Line from batch {batch_index}.")],
                ..ExtractedCharacter::default()
            }])
        }
    }

    /// Engine that fails on one specific batch.
    struct FlakyEngine {
        fail_on: usize,
    }

    impl ExtractionEngine for FlakyEngine {
        fn analyze(
            &self,
            _batch_text: &str,
            batch_index: usize,
            _total_batches: usize,
            _budget: &PassTokenBudget,
        ) -> Result<Vec<ExtractedCharacter>, AnalysisError> {
            if batch_index == self.fail_on {
                return Err(AnalysisError::Engine("context overflow".to_string()));
            }
            Ok(vec![ExtractedCharacter {
                name: "Alice".to_string(),
                dialogs: vec![format!("Line {batch_index}.")],
                ..ExtractedCharacter::default()
            }])
        }
    }

    /// Engine that cancels the session from inside the first call.
    struct SelfCancellingEngine {
        cancel: Arc<AtomicBool>,
    }

    impl ExtractionEngine for SelfCancellingEngine {
        fn analyze(
            &self,
            _batch_text: &str,
            batch_index: usize,
            _total_batches: usize,
            _budget: &PassTokenBudget,
        ) -> Result<Vec<ExtractedCharacter>, AnalysisError> {
            self.cancel.store(true, Ordering::Relaxed);
            Ok(vec![ExtractedCharacter {
                name: format!("Person{batch_index}"),
                ..ExtractedCharacter::default()
            }])
        }
    }

    /// Small budget so a handful of paragraphs spans several batches.
    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            match_strategy: MatchStrategy::Fuzzy,
            budget: PassTokenBudget::new(0, 25, 0).unwrap(),
            include_narrator: false,
        }
    }

    /// Pages yielding several ~100-char paragraphs.
    fn sample_pages() -> Vec<String> {
        (0..6)
            .map(|i| format!("Paragraph number {i} with enough text to pass the length filter and fill a good part of a batch."))
            .collect()
    }

    #[test]
    fn session_completes_and_merges_every_batch() {
        let mut session = AnalysisSession::new(small_config());
        let outcome = session.run(&sample_pages(), &ScriptedEngine, None).unwrap();

        assert_eq!(outcome.state, SessionState::Completed);
        assert!(outcome.total_batches > 1);
        assert_eq!(outcome.failed_batches, 0);
        assert_eq!(outcome.characters.len(), outcome.total_batches);
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn narrator_is_seeded_when_configured() {
        let config = AnalysisConfig {
            include_narrator: true,
            ..small_config()
        };
        let mut session = AnalysisSession::new(config);
        let outcome = session.run(&sample_pages(), &ScriptedEngine, None).unwrap();

        assert!(outcome.characters.iter().any(|c| c.name == NARRATOR_NAME));
    }

    #[test]
    fn failed_batch_is_skipped_not_fatal() {
        let mut session = AnalysisSession::new(small_config());
        let outcome = session
            .run(&sample_pages(), &FlakyEngine { fail_on: 1 }, None)
            .unwrap();

        assert_eq!(outcome.state, SessionState::Completed);
        assert_eq!(outcome.failed_batches, 1);
        // Alice still accumulated lines from the surviving batches.
        let alice = outcome.characters.iter().find(|c| c.name == "Alice").unwrap();
        assert_eq!(alice.dialogs.len(), outcome.total_batches - 1);
    }

    #[test]
    fn cancellation_between_batches_keeps_partial_results() {
        let mut session = AnalysisSession::new(small_config());
        let engine = SelfCancellingEngine {
            cancel: session.cancel_handle(),
        };
        let outcome = session.run(&sample_pages(), &engine, None).unwrap();

        assert_eq!(outcome.state, SessionState::Cancelled);
        // The in-flight first batch completed and was merged.
        assert_eq!(outcome.characters.len(), 1);
    }

    #[test]
    fn empty_input_completes_with_nothing() {
        let mut session = AnalysisSession::new(small_config());
        let outcome = session.run(&[], &ScriptedEngine, None).unwrap();

        assert_eq!(outcome.state, SessionState::Completed);
        assert_eq!(outcome.total_batches, 0);
        assert!(outcome.characters.is_empty());
    }

    #[test]
    fn empty_input_still_emits_session_lifecycle_events() {
        let events = RefCell::new(Vec::new());
        let progress = |event: BatchStatusEvent| events.borrow_mut().push(event);

        let config = AnalysisConfig {
            include_narrator: true,
            ..small_config()
        };
        let mut session = AnalysisSession::new(config);
        let outcome = session.run(&[], &ScriptedEngine, Some(&progress)).unwrap();

        assert_eq!(outcome.state, SessionState::Completed);
        // The narrator is seeded even when no batch ever runs.
        assert!(outcome.characters.iter().any(|c| c.name == NARRATOR_NAME));

        let events = events.into_inner();
        assert!(matches!(
            events.first(),
            Some(BatchStatusEvent::Started { total_batches: 0 })
        ));
        assert!(matches!(
            events.last(),
            Some(BatchStatusEvent::SessionCompleted { failed_batches: 0, .. })
        ));
    }

    #[test]
    fn zero_paragraphs_from_real_input_is_a_failure() {
        let mut session = AnalysisSession::new(small_config());
        // Content survives cleaning but every fragment is ≤ 10 chars.
        let pages = vec!["tiny\n\nwords".to_string()];
        let result = session.run(&pages, &ScriptedEngine, None);

        assert!(matches!(result, Err(AnalysisError::EmptyNormalization)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn session_cannot_run_twice() {
        let mut session = AnalysisSession::new(small_config());
        session.run(&sample_pages(), &ScriptedEngine, None).unwrap();
        let again = session.run(&sample_pages(), &ScriptedEngine, None);

        assert!(matches!(again, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn progress_reports_monotonically_growing_characters() {
        let events = RefCell::new(Vec::new());
        let progress = |event: BatchStatusEvent| events.borrow_mut().push(event);

        let mut session = AnalysisSession::new(small_config());
        session
            .run(&sample_pages(), &ScriptedEngine, Some(&progress))
            .unwrap();

        let events = events.into_inner();
        assert!(matches!(events.first(), Some(BatchStatusEvent::Started { .. })));
        assert!(matches!(events.last(), Some(BatchStatusEvent::SessionCompleted { .. })));

        let mut last_count = 0;
        let mut last_index = None;
        for event in &events {
            if let BatchStatusEvent::BatchCompleted { batch_index, characters, .. } = event {
                assert!(characters.len() >= last_count);
                last_count = characters.len();
                // Batches reported strictly in order.
                if let Some(prev) = last_index {
                    assert_eq!(*batch_index, prev + 1);
                }
                last_index = Some(*batch_index);
            }
        }
        assert!(last_count > 0);
    }

    #[test]
    fn failed_batches_emit_failure_events() {
        let events = RefCell::new(Vec::new());
        let progress = |event: BatchStatusEvent| events.borrow_mut().push(event);

        let mut session = AnalysisSession::new(small_config());
        session
            .run(&sample_pages(), &FlakyEngine { fail_on: 0 }, Some(&progress))
            .unwrap();

        let events = events.into_inner();
        assert!(events.iter().any(|e| matches!(
            e,
            BatchStatusEvent::BatchFailed { batch_index: 0, .. }
        )));
    }
}
