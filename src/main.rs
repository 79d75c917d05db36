use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finmention::classify::BackendKind;
use finmention::config::{Config, LogFormat};
use finmention::error::{Error, FinmentionErrorTrait};
use finmention::locator::DEFAULT_WINDOW;
use finmention::report::ReportFormat;

mod commands;

#[derive(Parser)]
#[command(
    name = "finmention",
    version,
    about = "Technology mention extraction and sentiment classification for financial filings",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate technology mentions and classify their sentiment
    Analyze {
        /// Financial document (PDF or plain text)
        #[arg(short, long)]
        document: PathBuf,

        /// Taxonomy CSV with a `technologies` column
        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Seed alias table (TOML or JSON); built-in table when omitted
        #[arg(long)]
        seed_aliases: Option<PathBuf>,

        /// Classification backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendKind>,

        /// Context characters kept on each side of a match
        #[arg(short, long)]
        window: Option<usize>,

        /// Maximum number of classification calls in flight
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Report format
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Locate technology mentions and print their context
    Mentions {
        /// Financial document (PDF or plain text)
        #[arg(short, long)]
        document: PathBuf,

        /// Taxonomy CSV with a `technologies` column
        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Seed alias table (TOML or JSON); built-in table when omitted
        #[arg(long)]
        seed_aliases: Option<PathBuf>,

        /// Context characters kept on each side of a match
        #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        /// Characters of context to print per mention
        #[arg(long, default_value = "160")]
        preview: usize,
    },

    /// Print the synonym index built from the taxonomy
    Taxonomy {
        /// Taxonomy CSV with a `technologies` column
        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Seed alias table (TOML or JSON); built-in table when omitted
        #[arg(long)]
        seed_aliases: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let category = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<Error>())
                .map_or("unknown", |err| err.category().as_str());
            tracing::error!(error = %e, category, "finmention failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.unwrap_or(config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("finmention starting");

    match cli.command {
        Commands::Analyze {
            document,
            taxonomy,
            seed_aliases,
            backend,
            window,
            max_concurrent,
            format,
            output,
        } => {
            tracing::info!(
                document = %document.display(),
                taxonomy = %taxonomy.display(),
                backend = ?backend,
                "Starting analyze command"
            );
            commands::analyze(
                config,
                commands::AnalyzeParams {
                    document,
                    taxonomy,
                    seed_aliases,
                    backend,
                    window,
                    max_concurrent,
                    format,
                    output,
                },
            )
            .await?;
        }

        Commands::Mentions {
            document,
            taxonomy,
            seed_aliases,
            window,
            preview,
        } => {
            tracing::info!(
                document = %document.display(),
                taxonomy = %taxonomy.display(),
                window = %window,
                "Starting mentions command"
            );
            commands::mentions(commands::MentionsParams {
                document,
                taxonomy,
                seed_aliases,
                window,
                preview,
            })
            .await?;
        }

        Commands::Taxonomy {
            taxonomy,
            seed_aliases,
        } => {
            tracing::info!(taxonomy = %taxonomy.display(), "Starting taxonomy command");
            commands::taxonomy(taxonomy, seed_aliases).await?;
        }
    }

    tracing::info!("finmention completed successfully");
    Ok(())
}

fn setup_tracing(format: LogFormat, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("finmention=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("finmention={level},warn"))?
    };

    // stdout is reserved for progress and the report
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
