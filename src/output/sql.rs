use super::traits::{BatchWriter, OutputError};
use crate::pipeline::Reading;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PARTIAL_SUFFIX: &str = ".partial";

/// Render one multi-row INSERT statement for a non-empty batch.
pub fn render_insert_statement(
    table: &str,
    batch: &[Reading],
    out: &mut String,
) -> std::fmt::Result {
    writeln!(out, "INSERT INTO {} (nmi, timestamp, consumption)", table)?;
    out.push_str("  VALUES\n");

    for (i, reading) in batch.iter().enumerate() {
        let separator = if i + 1 == batch.len() { ";" } else { "," };
        out.push_str("    ('");
        push_quoted(out, &reading.nmi);
        write!(
            out,
            "','{}',{}){}",
            reading.timestamp.format(TIMESTAMP_FORMAT),
            reading.consumption,
            separator
        )?;
        out.push('\n');
    }
    Ok(())
}

/// Render a batch as bulk-load rows, with no separator after the last row.
pub fn render_copy_rows(batch: &[Reading], out: &mut String) -> std::fmt::Result {
    for (i, reading) in batch.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write!(
            out,
            "{},{},{}",
            reading.nmi,
            reading.timestamp.format(TIMESTAMP_FORMAT),
            reading.consumption
        )?;
    }
    Ok(())
}

// Single quotes in a literal are doubled
fn push_quoted(out: &mut String, value: &str) {
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
}

fn partial_path(path: &Path) -> Result<PathBuf, OutputError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| OutputError::InvalidPath(path.to_path_buf()))?;
    let mut partial = file_name.to_os_string();
    partial.push(PARTIAL_SUFFIX);
    Ok(path.with_file_name(partial))
}

/// One output file, written under a `.partial` name until committed.
struct Artifact {
    path: PathBuf,
    partial: PathBuf,
    file: Option<BufWriter<File>>,
    committed: bool,
    discarded: bool,
}

impl Artifact {
    async fn create(path: &Path, buffer_size: usize) -> Result<Self, OutputError> {
        let partial = partial_path(path)?;
        let file = File::create(&partial)
            .await
            .map_err(|source| OutputError::Io {
                path: partial.clone(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            partial,
            file: Some(BufWriter::with_capacity(buffer_size.max(1), file)),
            committed: false,
            discarded: false,
        })
    }

    fn io_error(&self, source: std::io::Error) -> OutputError {
        OutputError::Io {
            path: self.partial.clone(),
            source,
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), OutputError> {
        let file = self.file.as_mut().ok_or(OutputError::Closed)?;
        let result = file.write_all(bytes).await;
        result.map_err(|e| self.io_error(e))
    }

    /// Flush and close the partial file, leaving it under its partial name
    async fn flush(&mut self) -> Result<(), OutputError> {
        let mut file = self.file.take().ok_or(OutputError::Closed)?;
        let result = file.flush().await;
        drop(file);
        result.map_err(|e| self.io_error(e))
    }

    async fn commit(&mut self) -> Result<(), OutputError> {
        if self.discarded || self.file.is_some() {
            return Err(OutputError::Closed);
        }
        tokio::fs::rename(&self.partial, &self.path)
            .await
            .map_err(|source| OutputError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.committed = true;
        Ok(())
    }

    /// Remove whatever this artifact put on disk. A committed artifact loses
    /// its final file; whatever that path held before the run is not restored.
    async fn discard(&mut self) -> Result<(), OutputError> {
        if self.discarded {
            return Ok(());
        }
        // Unflushed bytes are dropped with the file
        self.file = None;
        self.discarded = true;

        let target = if self.committed {
            &self.path
        } else {
            &self.partial
        };
        match tokio::fs::remove_file(target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OutputError::Io {
                path: target.clone(),
                source,
            }),
        }
    }
}

/// Writes the insert-statement and bulk-load artifacts.
pub struct SqlFileWriter {
    table: String,
    insert: Artifact,
    copy: Artifact,
    batches: u64,
    scratch: String,
}

impl SqlFileWriter {
    /// Create both artifacts as `.partial` files next to their final paths
    pub async fn create(
        table: impl Into<String>,
        insert_path: &Path,
        copy_path: &Path,
        buffer_size: usize,
    ) -> Result<Self, OutputError> {
        let insert = Artifact::create(insert_path, buffer_size).await?;
        let copy = match Artifact::create(copy_path, buffer_size).await {
            Ok(copy) => copy,
            Err(e) => {
                let mut insert = insert;
                if let Err(cleanup) = insert.discard().await {
                    warn!(error = %cleanup, "Failed to remove partial insert artifact");
                }
                return Err(e);
            }
        };

        Ok(Self {
            table: table.into(),
            insert,
            copy,
            batches: 0,
            scratch: String::new(),
        })
    }

    pub fn insert_path(&self) -> &Path {
        &self.insert.path
    }

    pub fn copy_path(&self) -> &Path {
        &self.copy.path
    }

    /// Both files are flushed before either is renamed, so a failed flush
    /// leaves nothing at the final paths.
    async fn commit(&mut self) -> Result<(), OutputError> {
        let insert = self.insert.flush().await;
        let copy = self.copy.flush().await;
        insert.and(copy)?;

        self.insert.commit().await?;
        self.copy.commit().await
    }
}

#[async_trait]
impl BatchWriter for SqlFileWriter {
    async fn write_batch(&mut self, batch: &[Reading]) -> Result<(), OutputError> {
        if batch.is_empty() {
            return Ok(());
        }

        self.scratch.clear();
        render_insert_statement(&self.table, batch, &mut self.scratch)?;
        self.insert.write_all(self.scratch.as_bytes()).await?;

        self.scratch.clear();
        if self.batches > 0 {
            self.scratch.push('\n');
        }
        render_copy_rows(batch, &mut self.scratch)?;
        self.copy.write_all(self.scratch.as_bytes()).await?;

        self.batches += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), OutputError> {
        if let Err(e) = self.commit().await {
            if let Err(cleanup) = self.abort().await {
                warn!(error = %cleanup, "Failed to remove artifacts after finish failed");
            }
            return Err(e);
        }
        debug!(
            insert = %self.insert.path.display(),
            copy = %self.copy.path.display(),
            batches = self.batches,
            "Artifacts finished"
        );
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), OutputError> {
        let insert = self.insert.discard().await;
        let copy = self.copy.discard().await;
        insert.and(copy)
    }
}
