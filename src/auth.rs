//! OAuth2 installed-application authentication for Google APIs.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{DriveError, Result};
use crate::models::{ClientSecretFile, TokenResponse};

/// Google OAuth2 consent endpoint.
const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth2 token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google Drive API scope.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Redirect used when the client secret lists none: the code is shown to the user.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// OAuth2 client configuration built from a client secret file.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl OAuthConfig {
    /// Load the configuration from a client secret JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read(path)?;
        Self::from_json(&content)
    }

    /// Parse a client secret document in either the `installed` or `web` layout.
    pub fn from_json(content: &[u8]) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_slice(content)?;
        let secret = file.installed.or(file.web).ok_or_else(|| {
            DriveError::InvalidClientSecret(
                "expected an \"installed\" or \"web\" client".to_string(),
            )
        })?;

        Ok(Self {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            auth_uri: secret.auth_uri.unwrap_or_else(|| AUTH_URI.to_string()),
            token_uri: secret.token_uri.unwrap_or_else(|| TOKEN_URI.to_string()),
            redirect_uri: secret
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| OOB_REDIRECT_URI.to_string()),
            scope: DRIVE_SCOPE.to_string(),
        })
    }

    /// URL the user visits to grant access and obtain an authorization code.
    pub fn authorization_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("state", "state-token"),
            ],
        )
        .map_err(|e| DriveError::InvalidClientSecret(format!("bad auth_uri: {}", e)))
    }
}

/// An OAuth2 token as stored in the token cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as seconds since the UNIX epoch. `None` means no known expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        let expiry = response
            .expires_in
            .map(|secs| unix_now().saturating_add(secs));
        Self {
            access_token: response.access_token,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            refresh_token: response.refresh_token.or(previous_refresh),
            expiry,
        }
    }

    /// Whether the token can still be used for at least [`EXPIRY_MARGIN`].
    pub fn is_valid(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry > unix_now() + EXPIRY_MARGIN.as_secs(),
            None => true,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Authenticator for Google APIs using a user's OAuth2 consent.
#[derive(Clone)]
pub struct Authenticator {
    config: Arc<OAuthConfig>,
    client: Client,
    cache_path: Option<PathBuf>,
    token: Arc<RwLock<Option<Token>>>,
}

impl Authenticator {
    /// Create an authenticator with no token yet.
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: Client::new(),
            cache_path: None,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Persist tokens to `path`, loading an existing token from it if present.
    ///
    /// A cache that cannot be read or parsed is treated as empty, so the
    /// consent flow runs again and overwrites it.
    pub fn with_token_cache<P: Into<PathBuf>>(mut self, path: P) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            match load_token(&path) {
                Ok(token) => {
                    debug!(path = %path.display(), "loaded cached token");
                    self.token = Arc::new(RwLock::new(Some(token)));
                }
                Err(e) => warn!(path = %path.display(), "ignoring unreadable token cache: {}", e),
            }
        }
        self.cache_path = Some(path);
        Ok(self)
    }

    /// Use an already obtained token.
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Arc::new(RwLock::new(Some(token)));
        self
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Make sure a token is held, running the interactive consent flow if not.
    ///
    /// The consent URL is printed to stdout and the authorization code is read
    /// from stdin.
    pub async fn authorize(&self) -> Result<()> {
        if self.has_token().await {
            return Ok(());
        }

        let url = self.config.authorization_url()?;
        println!(
            "Go to the following link in your browser then type the authorization code:\n{}",
            url
        );

        let mut code = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut code)
            .await?;
        let code = code.trim();
        if code.is_empty() {
            return Err(DriveError::Authentication(
                "no authorization code entered".to_string(),
            ));
        }

        self.exchange_code(code).await?;
        Ok(())
    }

    /// Exchange an authorization code for a token and cache it.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self.request_token(&params).await?;
        let token = Token::from_response(response, None);
        self.store(token.clone()).await?;
        info!("authorization complete");
        Ok(token)
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn access_token(&self) -> Result<String> {
        let refresh_token = {
            let cached = self.token.read().await;
            match cached.as_ref() {
                Some(token) if token.is_valid() => return Ok(token.access_token.clone()),
                Some(token) => token.refresh_token.clone(),
                None => None,
            }
        };

        let refresh_token = refresh_token.ok_or_else(|| {
            DriveError::Authentication(
                "no valid token and no refresh token; authorization is required".to_string(),
            )
        })?;

        let token = self.refresh(refresh_token).await?;
        Ok(token.access_token)
    }

    async fn refresh(&self, refresh_token: String) -> Result<Token> {
        debug!("refreshing access token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self.request_token(&params).await?;
        let token = Token::from_response(response, Some(refresh_token));
        self.store(token.clone()).await?;
        Ok(token)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_uri)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn store(&self, token: Token) -> Result<()> {
        if let Some(path) = &self.cache_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            write_private(path, &serde_json::to_vec_pretty(&token)?)?;
            debug!(path = %path.display(), "saved token");
        }
        *self.token.write().await = Some(token);
        Ok(())
    }
}

fn load_token(path: &Path) -> Result<Token> {
    let content = fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

/// Write `contents` to `path` readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // `mode` only applies to newly created files.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.flush()
}
