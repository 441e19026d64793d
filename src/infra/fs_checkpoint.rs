use crate::app::ports::{CheckpointSink, PersistenceSink};
use crate::domain::LocationCandidates;
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Checkpoint sink backed by the local filesystem, for development and for
/// runs that keep their output next to the binary.
pub struct FsCheckpointSink {
    root: PathBuf,
}

impl FsCheckpointSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CheckpointSink for FsCheckpointSink {
    async fn write(&self, path: &str, content: &str) -> Result<String> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        debug!("Wrote checkpoint to {}", target.display());
        Ok(target.to_string_lossy().to_string())
    }

    async fn read(&self, path: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.root.join(path)).await?)
    }
}

/// Persistence stand-in for runs without a configured database. The final
/// matched set is already durable in the `all` checkpoint, so this only
/// reminds the operator that nothing reached a database.
pub struct DiscardPersistence;

#[async_trait]
impl PersistenceSink for DiscardPersistence {
    async fn upsert(&self, matched: &[LocationCandidates]) -> Result<()> {
        warn!(
            "No database configured, {} matched locations were not persisted",
            matched.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_nested_paths() {
        let dir = tempdir().unwrap();
        let sink = FsCheckpointSink::new(dir.path());

        let location = sink
            .write("btcmap/2024-05-01/part-1/matched.csv", "state\n")
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&location).await.unwrap();
        assert_eq!(written, "state\n");

        let read_back = sink.read("btcmap/2024-05-01/part-1/matched.csv").await.unwrap();
        assert_eq!(read_back, "state\n");
    }
}
