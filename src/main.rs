//! songlake CLI
//!
//! Runs the ETL job once and exits. The input and output roots default to the
//! fixed production locations; credentials come from an INI-style file when
//! one is given.

use clap::Parser;
use songlake::config::{Credentials, JobConfig, DEFAULT_INPUT_ROOT, DEFAULT_OUTPUT_ROOT};
use std::path::PathBuf;

/// Batch ETL job: event logs to a partitioned Parquet star schema
#[derive(Parser, Debug)]
#[command(name = "songlake")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root of the raw input datasets (s3://bucket/prefix or local path)
    #[arg(short, long, default_value = DEFAULT_INPUT_ROOT)]
    input: String,

    /// Root under which the output datasets are written
    #[arg(short, long, default_value = DEFAULT_OUTPUT_ROOT)]
    output: String,

    /// Credentials file (INI-style, section [aws_keys])
    #[arg(short, long)]
    credentials: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = try_main(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn try_main(cli: Cli) -> songlake::Result<()> {
    let mut config = JobConfig::new()
        .with_input_root(cli.input)
        .with_output_root(cli.output);

    if let Some(path) = cli.credentials {
        config = config.with_credentials(Credentials::from_file(path)?);
    }

    songlake::run(&config).await
}
