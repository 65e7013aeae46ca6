//! download_gd - Download a single file from Google Drive.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use gdrive_transfer::cli::CommonArgs;
use gdrive_transfer::file_ref::parse_file_id;
use gdrive_transfer::logging::init_logging;
use gdrive_transfer::{download_file, format_size, DownloadConfig};

/// Download a file from Google Drive.
#[derive(Parser)]
#[command(name = "download_gd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File ID or sharing URL.
    #[arg(short = 'i', long = "id")]
    id: String,

    /// Output filename/path. If empty the original name will be used.
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Directory to store the file in.
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_id =
        parse_file_id(&cli.id).with_context(|| format!("Invalid file URL or ID: {}", cli.id))?;

    let output_dir = cli.dir.unwrap_or_default();
    if !output_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create directory: {:?}", output_dir))?;
    }

    let client = cli.common.connect().await?;

    let config = DownloadConfig {
        file_id,
        output_name: cli.file,
        output_dir,
    };

    println!("Downloading {}...", config.file_id);
    let outcome = download_file(&client, &config)
        .await
        .with_context(|| format!("Failed to download file: {}", config.file_id))?;

    println!(
        "Saved to: {} ({})",
        outcome.path.display(),
        format_size(outcome.bytes, false)
    );
    Ok(())
}
