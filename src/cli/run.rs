use crate::config::{load_or_default, validate_config, Config, ConfigError};
use crate::output::{OutputError, SqlFileWriter};
use crate::pipeline::{run_pipeline, PipelineError, PipelineSummary};
use crate::source::reader::{LineReader, ReaderError};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("input error: {0}")]
    Reader(#[from] ReaderError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("failed to encode summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Command-line overrides for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: PathBuf,
    pub insert_out: Option<PathBuf>,
    pub copy_out: Option<PathBuf>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub json: bool,
}

impl RunOptions {
    /// Fold the overrides into the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.insert_out {
            config.output.insert_path = Some(path.clone());
        }
        if let Some(path) = &self.copy_out {
            config.output.copy_path = path.clone();
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.pipeline.batch_size = batch_size;
        }
    }
}

pub async fn run(config_path: Option<&Path>, options: RunOptions) -> Result<(), RunError> {
    let mut config = load_or_default(config_path)?;
    options.apply(&mut config);
    validate_config(&config)?;

    let summary = convert(&options.input, &config).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Convert one NEM12 file into its SQL artifacts
pub async fn convert(input: &Path, config: &Config) -> Result<PipelineSummary, RunError> {
    let insert_path = config.output.insert_path_for(input);
    let copy_path = &config.output.copy_path;

    let cwd = std::env::current_dir().unwrap_or_default();
    let (input_abs, insert_abs, copy_abs) = (
        normalized(input, &cwd),
        normalized(&insert_path, &cwd),
        normalized(copy_path, &cwd),
    );
    if insert_abs == copy_abs || insert_abs == input_abs || copy_abs == input_abs {
        return Err(ConfigError::Validation(format!(
            "input '{}', insert output '{}' and copy output '{}' must all differ",
            input.display(),
            insert_path.display(),
            copy_path.display()
        ))
        .into());
    }

    info!(
        input = %input.display(),
        insert = %insert_path.display(),
        copy = %copy_path.display(),
        table = %config.output.table,
        "Converting NEM12 file"
    );

    let reader = LineReader::open(input, config.io.read_buffer_size).await?;
    let writer = SqlFileWriter::create(
        config.output.table.clone(),
        &insert_path,
        copy_path,
        config.io.write_buffer_size,
    )
    .await?;

    Ok(run_pipeline(reader, writer, &config.pipeline).await?)
}

/// Resolve `path` against `cwd` and fold `.` and `..` lexically, so that
/// `./meters.csv` and `meters.csv` compare equal. Symlinks are not followed.
fn normalized(path: &Path, cwd: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn print_summary(summary: &PipelineSummary) {
    println!("Lines read:        {}", summary.lines);
    println!("Interval blocks:   {}", summary.jobs);
    println!("Readings written:  {}", summary.readings);
    println!("Batches flushed:   {}", summary.batches);
    println!("Rejected records:  {}", summary.rejected);
    println!("Workers:           {}", summary.workers);
    println!("Elapsed:           {} ms", summary.elapsed_ms);
}
