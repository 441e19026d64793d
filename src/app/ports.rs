use crate::domain::{Candidate, LocationCandidates, LocationSource};
use crate::error::Result;
use async_trait::async_trait;

/// Supplies externally sourced match candidates for a set of source records.
///
/// Implementations must return exactly one candidate list per input source in
/// the same order; an empty list is permitted, dropping or reordering sources
/// is not.
#[async_trait]
pub trait CandidateRetriever: Send + Sync {
    async fn fetch(&self, sources: &[LocationSource]) -> Result<Vec<Vec<Candidate>>>;
}

/// Which question the batch runner is asking the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Proceed with the next batch?
    Proceed,
    /// Really stop? Already-fetched data will still be checkpointed.
    AbandonRun,
}

/// Context handed to the confirmation gate so it can render a useful prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext {
    pub kind: PromptKind,
    /// 1-based index of the batch the decision applies to.
    pub batch_index: usize,
    pub total_batches: usize,
}

/// Interactive yes/no gate between batches; the only cancellation point of a
/// run.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &PromptContext) -> bool;
}

/// Durable store for batch checkpoints. `write` returns the location (URL or
/// path) of the written object; `read` fetches a previously written
/// checkpoint back, for the combine and push flows.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn write(&self, path: &str, content: &str) -> Result<String>;

    async fn read(&self, path: &str) -> Result<String> {
        Err(crate::error::FetcherError::Checkpoint {
            path: path.to_string(),
            message: "this sink does not support reading".to_string(),
        })
    }
}

/// Final destination for the accumulated matched set of a full run.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn upsert(&self, matched: &[LocationCandidates]) -> Result<()>;
}
