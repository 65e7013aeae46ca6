//! gdrive_transfer - download and upload single files on Google Drive.
//!
//! The library backs two command-line tools:
//! - `download_gd` saves a Drive file locally, under its original name by default
//! - `upload_gd` uploads a local file, optionally into a named folder, printing
//!   the transfer rate as it goes
//!
//! # Example
//!
//! ```no_run
//! use gdrive_transfer::{download_file, Authenticator, DownloadConfig, DriveClient, OAuthConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OAuthConfig::from_file("client_secret.json")?;
//!     let auth = Authenticator::new(config).with_token_cache("token.json")?;
//!     auth.authorize().await?;
//!     let client = DriveClient::new(auth);
//!
//!     let download = DownloadConfig {
//!         file_id: "file-id".to_string(),
//!         ..Default::default()
//!     };
//!     let outcome = download_file(&client, &download).await?;
//!     println!("Saved to {}", outcome.path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod error;
pub mod file_ref;
pub mod logging;
pub mod models;
pub mod progress;
pub mod service;
pub mod transfer;

// Re-exports for convenience
pub use auth::{Authenticator, OAuthConfig, Token};
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use models::{FileMetadata, NewFile};
pub use progress::{comma, format_size, ConsoleProgress, TransferRate};
pub use service::DriveService;
pub use transfer::{
    download_file, upload_file, DownloadConfig, DownloadOutcome, UploadConfig, UploadOutcome,
};
