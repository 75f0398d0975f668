use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Sizing of the expansion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Readings per flushed batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Expansion worker count
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_interval_queue_capacity")]
    pub interval_queue_capacity: usize,
    #[serde(default = "default_reading_queue_capacity")]
    pub reading_queue_capacity: usize,
}

fn default_batch_size() -> usize {
    16384
}

fn default_workers() -> usize {
    8
}

fn default_interval_queue_capacity() -> usize {
    4096
}

fn default_reading_queue_capacity() -> usize {
    2048
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
            interval_queue_capacity: default_interval_queue_capacity(),
            reading_queue_capacity: default_reading_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default = "default_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_buffer_size")]
    pub write_buffer_size: usize,
}

fn default_buffer_size() -> usize {
    1024 * 1024
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: default_buffer_size(),
            write_buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_table")]
    pub table: String,
    /// Insert-statement file; derived from the input path when unset
    #[serde(default)]
    pub insert_path: Option<PathBuf>,
    /// Bulk-load file
    #[serde(default = "default_copy_path")]
    pub copy_path: PathBuf,
}

fn default_table() -> String {
    "meter_readings".to_string()
}

fn default_copy_path() -> PathBuf {
    PathBuf::from("meter_readings.sql.csv")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            insert_path: None,
            copy_path: default_copy_path(),
        }
    }
}

impl OutputConfig {
    /// Insert-statement path for an input file: the configured path, or the
    /// input with its `.csv` extension replaced by `.sql`.
    pub fn insert_path_for(&self, input: &std::path::Path) -> PathBuf {
        match &self.insert_path {
            Some(path) => path.clone(),
            None => input.with_extension("sql"),
        }
    }
}
