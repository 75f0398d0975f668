use crate::pipeline::Reading;
use async_trait::async_trait;
use std::path::PathBuf;

/// Destination for flushed batches.
///
/// The batching sink is the only caller, so implementations see batches one
/// at a time and in flush order.
#[async_trait]
pub trait BatchWriter: Send {
    /// Serialize one non-empty batch into every artifact
    async fn write_batch(&mut self, batch: &[Reading]) -> Result<(), OutputError>;

    /// Make everything written so far visible under its final name
    async fn finish(&mut self) -> Result<(), OutputError>;

    /// Discard everything written so far
    async fn abort(&mut self) -> Result<(), OutputError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid output path '{0}'")]
    InvalidPath(PathBuf),

    #[error("failed to render batch")]
    Format(#[from] std::fmt::Error),

    #[error("writer already closed")]
    Closed,
}
