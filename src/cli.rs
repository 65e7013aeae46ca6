//! Arguments and setup shared by `download_gd` and `upload_gd`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::auth::{Authenticator, OAuthConfig};
use crate::client::DriveClient;

/// Credential and logging options common to both tools.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the OAuth2 client secret JSON file.
    #[arg(long, env = "GDRIVE_CLIENT_SECRET", default_value = "client_secret.json")]
    pub credentials: PathBuf,

    /// Where the OAuth2 token is cached between runs.
    #[arg(long, env = "GDRIVE_TOKEN_CACHE", default_value = "token.json")]
    pub token_cache: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl CommonArgs {
    /// Load credentials, authorize, and build the Drive client.
    pub async fn connect(&self) -> Result<DriveClient> {
        let config = OAuthConfig::from_file(&self.credentials).with_context(|| {
            format!(
                "Unable to read client secret file {}",
                self.credentials.display()
            )
        })?;

        let auth = Authenticator::new(config)
            .with_token_cache(&self.token_cache)
            .with_context(|| {
                format!("Unable to load token cache {}", self.token_cache.display())
            })?;
        auth.authorize()
            .await
            .context("Unable to authorize with Google")?;

        Ok(DriveClient::new(auth))
    }
}
