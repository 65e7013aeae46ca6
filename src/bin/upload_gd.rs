//! upload_gd - Upload a single file to Google Drive with progress reporting.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use gdrive_transfer::cli::CommonArgs;
use gdrive_transfer::logging::init_logging;
use gdrive_transfer::{upload_file, ConsoleProgress, UploadConfig};

/// Upload a file to Google Drive.
#[derive(Parser)]
#[command(name = "upload_gd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file path.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Title on Drive. Defaults to the input file's name.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Folder to upload into; created if it does not exist.
    #[arg(short = 'f', long = "folder")]
    folder: Option<String>,

    /// Description stored with the file.
    #[arg(long)]
    description: Option<String>,

    /// MIME type. Guessed from the file extension when omitted.
    #[arg(long)]
    mime_type: Option<String>,

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
    let client = cli.common.connect().await?;

    let config = UploadConfig {
        input_path: cli.input,
        title: cli.output,
        description: cli.description,
        folder_name: cli.folder,
        mime_type: cli.mime_type,
    };

    println!("Read file: {}", config.input_path.display());
    println!("Output name: {}", config.title());
    println!("Mime : {}", config.mime_type());

    println!("Start upload");
    let progress = ConsoleProgress::new();
    let outcome = upload_file(
        &client,
        &config,
        || progress.begin(),
        |current, total| progress.update(current, total),
    )
    .await
    .with_context(|| format!("Failed to upload {}", config.input_path.display()))?;

    println!();
    println!("{}", progress.summary(&outcome.file.name, outcome.bytes));
    println!("Upload Done. ID : {}", outcome.file.id);
    Ok(())
}
