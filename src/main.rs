use clap::{Parser, Subcommand};
use nem12sql::cli::run::RunOptions;
use nem12sql::config::resolve_config_path;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nem12sql")]
#[command(about = "Convert NEM12 meter data files into SQL load files", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a NEM12 file
    Run {
        /// NEM12 input file
        input: PathBuf,

        /// Insert-statement output (default: input with a .sql extension)
        #[arg(long)]
        insert_out: Option<PathBuf>,

        /// Bulk-load output
        #[arg(long)]
        copy_out: Option<PathBuf>,

        #[arg(long)]
        workers: Option<usize>,

        #[arg(long)]
        batch_size: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        #[arg(long)]
        stdout: bool,
    },
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays clean for --json and --stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nem12sql=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            insert_out,
            copy_out,
            workers,
            batch_size,
            json,
        } => {
            let options = RunOptions {
                input,
                insert_out,
                copy_out,
                workers,
                batch_size,
                json,
            };
            nem12sql::cli::run::run(cli.config.as_deref(), options).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                nem12sql::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                nem12sql::cli::config::validate(resolve_config_path(cli.config.as_deref()))?;
            }
        },
    }

    Ok(())
}
