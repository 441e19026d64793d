use crate::app::ports::{
    CandidateRetriever, CheckpointSink, ConfirmationGate, PersistenceSink, PromptContext,
    PromptKind,
};
use crate::config::MatcherConfig;
use crate::domain::LocationSource;
use crate::error::{FetcherError, Result};
use crate::infra::csv_export::locations_with_candidates_to_csv;
use crate::matcher::stats::{summarize, MatchStats};
use crate::matcher::{classify, MatchingResult};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where the runner currently is in its batch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    AwaitingConfirmation,
    Processing,
    Checkpointing,
    Done,
    Aborted,
}

/// How a run ended. `resume_offset` is the value to pass as `start_offset`
/// when rerunning; it counts fully checkpointed batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The operator declined to continue.
    Aborted { resume_offset: usize },
    /// A batch failed; prior batches remain checkpointed and usable.
    Failed {
        batch_index: usize,
        resume_offset: usize,
        message: String,
    },
}

/// Result of a full batch run: the merged classification output, its outcome
/// distribution, and how the loop ended.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: MatchStats,
    pub result: MatchingResult,
}

/// Drives the classification engine over a large source list in fixed-size
/// batches, checkpointing after every batch so an interrupted run can resume
/// from the last durable offset.
pub struct BatchRunner {
    retriever: Arc<dyn CandidateRetriever>,
    gate: Arc<dyn ConfirmationGate>,
    checkpoints: Arc<dyn CheckpointSink>,
    persistence: Arc<dyn PersistenceSink>,
    matcher_config: MatcherConfig,
    /// Storage prefix for this run, e.g. `btcmap/2024-05-01`.
    root_path: String,
}

impl BatchRunner {
    pub fn new(
        retriever: Arc<dyn CandidateRetriever>,
        gate: Arc<dyn ConfirmationGate>,
        checkpoints: Arc<dyn CheckpointSink>,
        persistence: Arc<dyn PersistenceSink>,
        matcher_config: MatcherConfig,
        root_path: String,
    ) -> Self {
        Self {
            retriever,
            gate,
            checkpoints,
            persistence,
            matcher_config,
            root_path,
        }
    }

    /// Runs the batch loop. `start_offset` skips that many leading batches,
    /// resuming a previously interrupted run without reprocessing
    /// already-checkpointed data.
    pub async fn run(
        &self,
        sources: Vec<LocationSource>,
        batch_size: usize,
        start_offset: usize,
    ) -> Result<RunReport> {
        if batch_size == 0 {
            return Err(FetcherError::Config("batch size must be at least 1".to_string()));
        }

        let total_batches = sources.len().div_ceil(batch_size);
        let mut index = start_offset * batch_size;
        let mut batch_index = start_offset + 1;
        let mut phase = RunPhase::Idle;
        let mut accumulated = MatchingResult::default();
        let mut outcome = RunOutcome::Completed;

        info!(
            "Matching {} locations in {} batches of {} locations each",
            sources.len(),
            total_batches,
            batch_size
        );
        if start_offset > 0 {
            warn!(
                "Skipping the first {} batches, which contain {} locations",
                start_offset, index
            );
        }

        while index < sources.len() {
            phase = RunPhase::AwaitingConfirmation;
            if !self.confirm_batch(batch_index, total_batches).await {
                warn!("Batch processing canceled by the operator");
                outcome = RunOutcome::Aborted { resume_offset: batch_index - 1 };
                phase = RunPhase::Aborted;
                break;
            }

            phase = RunPhase::Processing;
            let end = (index + batch_size).min(sources.len());
            debug!("Processing batch {}/{} ({} locations)", batch_index, total_batches, end - index);
            let batch = sources[index..end].to_vec();
            let result = match classify(batch, self.retriever.as_ref(), &self.matcher_config).await {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        "Batch {} failed: {}. Prior batches are checkpointed; resume with offset {}",
                        batch_index,
                        e,
                        batch_index - 1
                    );
                    outcome = RunOutcome::Failed {
                        batch_index,
                        resume_offset: batch_index - 1,
                        message: e.to_string(),
                    };
                    break;
                }
            };

            phase = RunPhase::Checkpointing;
            let part_path = format!("{}/part-{}", self.root_path, batch_index);
            if let Err(e) = self.checkpoint(&part_path, &result).await {
                error!(
                    "Checkpoint for batch {} failed: {}. Resume with offset {}",
                    batch_index,
                    e,
                    batch_index - 1
                );
                outcome = RunOutcome::Failed {
                    batch_index,
                    resume_offset: batch_index - 1,
                    message: e.to_string(),
                };
                break;
            }

            let stats = summarize(&result.matched, &result.unmatched);
            info!(
                "Batch {}/{} checkpointed to {}. Total: {} | {}",
                batch_index,
                total_batches,
                part_path,
                stats.total,
                stats.inline()
            );

            accumulated.extend(result);
            batch_index += 1;
            index = end;
        }

        if phase != RunPhase::Aborted {
            phase = RunPhase::Done;
        }
        debug!("Batch loop finished in phase {:?}", phase);

        let stats = summarize(&accumulated.matched, &accumulated.unmatched);
        info!(
            "Matching finished: {} matched | {} unmatched | {} total. {}",
            accumulated.matched.len(),
            accumulated.unmatched.len(),
            stats.total,
            stats.inline()
        );

        if accumulated.total() > 0 {
            let all_path = format!("{}/all", self.root_path);
            self.checkpoint(&all_path, &accumulated).await?;
            info!("Full run checkpointed to {}", all_path);

            if !accumulated.matched.is_empty() {
                self.persistence.upsert(&accumulated.matched).await?;
                info!("{} matched locations handed to persistence", accumulated.matched.len());
            }
        }

        Ok(RunReport { outcome, stats, result: accumulated })
    }

    /// Asks the gate to confirm the next batch. A primary decline offers a
    /// secondary "are you sure" prompt: declining that aborts the run,
    /// accepting it re-asks the primary question for the same batch.
    async fn confirm_batch(&self, batch_index: usize, total_batches: usize) -> bool {
        loop {
            let proceed = PromptContext {
                kind: PromptKind::Proceed,
                batch_index,
                total_batches,
            };
            if self.gate.confirm(&proceed).await {
                return true;
            }

            let abandon = PromptContext {
                kind: PromptKind::AbandonRun,
                batch_index,
                total_batches,
            };
            if !self.gate.confirm(&abandon).await {
                return false;
            }
            // Operator backed out of abandoning; ask about the batch again.
        }
    }

    /// Writes the matched/unmatched pair for one checkpoint. Both writes run
    /// concurrently and the checkpoint only counts as durable when both
    /// succeed; a partial success surfaces as a hard failure.
    async fn checkpoint(&self, path: &str, result: &MatchingResult) -> Result<()> {
        let matched_csv = locations_with_candidates_to_csv(&result.matched)?;
        let unmatched_csv = locations_with_candidates_to_csv(&result.unmatched)?;

        let matched_path = format!("{path}/matched.csv");
        let unmatched_path = format!("{path}/unmatched.csv");

        tokio::try_join!(
            self.checkpoints.write(&matched_path, &matched_csv),
            self.checkpoints.write(&unmatched_path, &unmatched_csv),
        )
        .map_err(|e| FetcherError::Checkpoint {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, Category, LocationCandidates};
    use crate::matcher::tests::test_source;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Gate that answers from a script and records every prompt it saw.
    struct ScriptedGate {
        answers: Mutex<Vec<bool>>,
        seen: Mutex<Vec<PromptKind>>,
    }

    impl ScriptedGate {
        fn new(answers: Vec<bool>) -> Self {
            Self {
                answers: Mutex::new(answers),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn always_yes() -> Self {
            Self::new(Vec::new())
        }
    }

    #[async_trait]
    impl ConfirmationGate for ScriptedGate {
        async fn confirm(&self, prompt: &PromptContext) -> bool {
            self.seen.lock().unwrap().push(prompt.kind);
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                true
            } else {
                answers.remove(0)
            }
        }
    }

    /// Retriever serving one co-located candidate per source, so every
    /// location geo-matches deterministically.
    struct EchoRetriever;

    #[async_trait]
    impl CandidateRetriever for EchoRetriever {
        async fn fetch(&self, sources: &[LocationSource]) -> Result<Vec<Vec<Candidate>>> {
            Ok(sources
                .iter()
                .map(|s| {
                    vec![Candidate::new(
                        format!("place-{}", s.id),
                        s.name.clone(),
                        String::new(),
                        s.lat,
                        s.lng,
                        None,
                        None,
                        Vec::new(),
                        Category::Miscellaneous,
                    )]
                })
                .collect())
        }
    }

    /// Retriever that fails for any source whose id starts with "bad".
    struct FlakyRetriever;

    #[async_trait]
    impl CandidateRetriever for FlakyRetriever {
        async fn fetch(&self, sources: &[LocationSource]) -> Result<Vec<Vec<Candidate>>> {
            if sources.iter().any(|s| s.id.starts_with("bad")) {
                return Err(FetcherError::Retrieval("places service unreachable".to_string()));
            }
            EchoRetriever.fetch(sources).await
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CheckpointSink for MemorySink {
        async fn write(&self, path: &str, content: &str) -> Result<String> {
            self.written
                .lock()
                .unwrap()
                .insert(path.to_string(), content.to_string());
            Ok(format!("mem://{path}"))
        }
    }

    /// Sink that rejects one of the two files of every pair.
    struct HalfBrokenSink;

    #[async_trait]
    impl CheckpointSink for HalfBrokenSink {
        async fn write(&self, path: &str, _content: &str) -> Result<String> {
            if path.ends_with("unmatched.csv") {
                return Err(FetcherError::Retrieval("bucket rejected the write".to_string()));
            }
            Ok(format!("mem://{path}"))
        }
    }

    #[derive(Default)]
    struct MemoryPersistence {
        upserted: Mutex<Vec<LocationCandidates>>,
    }

    #[async_trait]
    impl PersistenceSink for MemoryPersistence {
        async fn upsert(&self, matched: &[LocationCandidates]) -> Result<()> {
            self.upserted.lock().unwrap().extend_from_slice(matched);
            Ok(())
        }
    }

    fn sources(n: usize) -> Vec<LocationSource> {
        (0..n)
            .map(|i| test_source(&format!("{i}"), &format!("Shop {i}"), i as f64 * 0.01, 0.0))
            .collect()
    }

    fn runner(
        retriever: Arc<dyn CandidateRetriever>,
        gate: Arc<dyn ConfirmationGate>,
        sink: Arc<MemorySink>,
        persistence: Arc<MemoryPersistence>,
    ) -> BatchRunner {
        BatchRunner::new(
            retriever,
            gate,
            sink,
            persistence,
            MatcherConfig::default(),
            "btcmap/testrun".to_string(),
        )
    }

    #[tokio::test]
    async fn processes_all_batches_and_checkpoints_each() {
        let gate = Arc::new(ScriptedGate::always_yes());
        let sink = Arc::new(MemorySink::default());
        let persistence = Arc::new(MemoryPersistence::default());
        let runner = runner(Arc::new(EchoRetriever), gate, sink.clone(), persistence.clone());

        let report = runner.run(sources(5), 2, 0).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.result.matched.len(), 5);
        assert_eq!(report.stats.total, 5);

        let written = sink.written.lock().unwrap();
        for part in 1..=3 {
            assert!(written.contains_key(&format!("btcmap/testrun/part-{part}/matched.csv")));
            assert!(written.contains_key(&format!("btcmap/testrun/part-{part}/unmatched.csv")));
        }
        assert!(written.contains_key("btcmap/testrun/all/matched.csv"));
        assert_eq!(persistence.upserted.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn declining_both_prompts_aborts_before_processing() {
        let gate = Arc::new(ScriptedGate::new(vec![false, false]));
        let sink = Arc::new(MemorySink::default());
        let persistence = Arc::new(MemoryPersistence::default());
        let runner = runner(Arc::new(EchoRetriever), gate.clone(), sink.clone(), persistence);

        let report = runner.run(sources(4), 2, 0).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Aborted { resume_offset: 0 });
        assert!(sink.written.lock().unwrap().is_empty());
        assert_eq!(
            *gate.seen.lock().unwrap(),
            vec![PromptKind::Proceed, PromptKind::AbandonRun]
        );
    }

    #[tokio::test]
    async fn backing_out_of_abandon_re_asks_the_primary_prompt() {
        // Decline the batch, back out of abandoning, then accept the batch.
        let gate = Arc::new(ScriptedGate::new(vec![false, true, true]));
        let sink = Arc::new(MemorySink::default());
        let persistence = Arc::new(MemoryPersistence::default());
        let runner = runner(Arc::new(EchoRetriever), gate.clone(), sink.clone(), persistence);

        let report = runner.run(sources(2), 2, 0).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(
            *gate.seen.lock().unwrap(),
            vec![PromptKind::Proceed, PromptKind::AbandonRun, PromptKind::Proceed]
        );
    }

    #[tokio::test]
    async fn aborting_mid_run_still_checkpoints_and_persists_prior_batches() {
        // Accept batch 1, then decline batch 2 and confirm the abandon.
        let gate = Arc::new(ScriptedGate::new(vec![true, false, false]));
        let sink = Arc::new(MemorySink::default());
        let persistence = Arc::new(MemoryPersistence::default());
        let runner = runner(Arc::new(EchoRetriever), gate, sink.clone(), persistence.clone());

        let report = runner.run(sources(4), 2, 0).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Aborted { resume_offset: 1 });
        let written = sink.written.lock().unwrap();
        assert!(written.contains_key("btcmap/testrun/part-1/matched.csv"));
        assert!(!written.contains_key("btcmap/testrun/part-2/matched.csv"));
        assert!(written.contains_key("btcmap/testrun/all/matched.csv"));
        assert_eq!(persistence.upserted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn retrieval_failure_reports_the_resume_offset() {
        let mut list = sources(4);
        list[2].id = "bad-2".to_string();
        let gate = Arc::new(ScriptedGate::always_yes());
        let sink = Arc::new(MemorySink::default());
        let persistence = Arc::new(MemoryPersistence::default());
        let runner = runner(Arc::new(FlakyRetriever), gate, sink.clone(), persistence);

        let report = runner.run(list, 2, 0).await.unwrap();

        match report.outcome {
            RunOutcome::Failed { batch_index, resume_offset, .. } => {
                assert_eq!(batch_index, 2);
                assert_eq!(resume_offset, 1);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // Batch 1 stays durable
        assert!(sink
            .written
            .lock()
            .unwrap()
            .contains_key("btcmap/testrun/part-1/matched.csv"));
    }

    #[tokio::test]
    async fn partial_checkpoint_write_is_a_hard_failure() {
        let gate = Arc::new(ScriptedGate::always_yes());
        let persistence = Arc::new(MemoryPersistence::default());
        let runner = BatchRunner::new(
            Arc::new(EchoRetriever),
            gate,
            Arc::new(HalfBrokenSink),
            persistence,
            MatcherConfig::default(),
            "btcmap/testrun".to_string(),
        );

        let report = runner.run(sources(2), 2, 0).await;

        // The per-batch failure is recorded, then the final "all" checkpoint
        // fails the same way and propagates.
        assert!(report.is_err() || matches!(report.unwrap().outcome, RunOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn resuming_skips_already_checkpointed_batches() {
        let gate = Arc::new(ScriptedGate::always_yes());
        let full_sink = Arc::new(MemorySink::default());
        let resumed_sink = Arc::new(MemorySink::default());
        let persistence = Arc::new(MemoryPersistence::default());

        let full = runner(
            Arc::new(EchoRetriever),
            gate.clone(),
            full_sink.clone(),
            persistence.clone(),
        );
        full.run(sources(6), 2, 0).await.unwrap();

        let resumed = runner(Arc::new(EchoRetriever), gate, resumed_sink.clone(), persistence);
        let report = resumed.run(sources(6), 2, 1).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.result.total(), 4);

        let full_written = full_sink.written.lock().unwrap();
        let resumed_written = resumed_sink.written.lock().unwrap();
        assert!(!resumed_written.contains_key("btcmap/testrun/part-1/matched.csv"));
        for part in 2..=3 {
            for file in ["matched.csv", "unmatched.csv"] {
                let path = format!("btcmap/testrun/part-{part}/{file}");
                assert_eq!(
                    full_written.get(&path),
                    resumed_written.get(&path),
                    "checkpoint {path} must be identical when resuming"
                );
            }
        }
    }

    #[tokio::test]
    async fn zero_batch_size_is_a_config_error() {
        let runner = runner(
            Arc::new(EchoRetriever),
            Arc::new(ScriptedGate::always_yes()),
            Arc::new(MemorySink::default()),
            Arc::new(MemoryPersistence::default()),
        );
        assert!(matches!(
            runner.run(sources(2), 0, 0).await,
            Err(FetcherError::Config(_))
        ));
    }

    #[tokio::test]
    async fn empty_source_list_completes_without_prompts() {
        let gate = Arc::new(ScriptedGate::always_yes());
        let sink = Arc::new(MemorySink::default());
        let runner = runner(
            Arc::new(EchoRetriever),
            gate.clone(),
            sink.clone(),
            Arc::new(MemoryPersistence::default()),
        );

        let report = runner.run(Vec::new(), 10, 0).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.stats.total, 0);
        assert!(gate.seen.lock().unwrap().is_empty());
        assert!(sink.written.lock().unwrap().is_empty());
    }
}
