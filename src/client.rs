//! Google Drive REST client.

use std::io::{self, SeekFrom};

use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Client, Response};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileListResponse, FileMetadata, NewFile};
use crate::service::{DownloadBody, DriveService};

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default resumable chunk size (16 MiB). Drive requires multiples of 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Fields requested for every file resource.
const FILE_FIELDS: &str = "id, name, originalFilename, mimeType, description, parents, size, webViewLink";

/// Client for the Google Drive API.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    api_base: String,
    upload_base: String,
    chunk_size: usize,
}

impl DriveClient {
    /// Create a client for the public Drive endpoints.
    pub fn new(auth: Authenticator) -> Self {
        Self::with_endpoints(auth, DRIVE_API_BASE, UPLOAD_API_BASE)
    }

    /// Create a client for custom API and upload base URLs.
    pub fn with_endpoints(
        auth: Authenticator,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            http: Client::new(),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the number of bytes sent per resumable upload request.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Open a resumable upload session and return its URL.
    async fn start_session(&self, file: &NewFile, size: u64) -> Result<String> {
        let token = self.auth.access_token().await?;
        let mime_type = file
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "resumable"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", size.to_string())
            .json(file)
            .send()
            .await?;
        let response = check_status(response).await?;

        let session_url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(DriveError::MissingUploadUrl)?
            .to_string();
        debug!(name = %file.name, size, "opened resumable upload session");
        Ok(session_url)
    }
}

impl DriveService for DriveClient {
    async fn get_file(&self, file_id: &str) -> Result<FileMetadata> {
        let token = self.auth.access_token().await?;
        debug!(file_id, "fetching file metadata");

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .send()
            .await?;

        let metadata: FileMetadata = check_status(response).await?.json().await?;
        Ok(metadata)
    }

    async fn download(&self, file_id: &str) -> Result<DownloadBody> {
        let token = self.auth.access_token().await?;
        debug!(file_id, "downloading file content");

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let stream = response.bytes_stream().map_err(io::Error::other);
        let body: DownloadBody = Box::pin(StreamReader::new(stream));
        Ok(body)
    }

    async fn list_files(&self, query: &str, page_size: u32) -> Result<Vec<FileMetadata>> {
        let token = self.auth.access_token().await?;
        debug!(query, page_size, "listing files");

        let fields = format!("files({})", FILE_FIELDS);
        let page_size = page_size.to_string();
        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("spaces", "drive"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
                ("fields", fields.as_str()),
            ])
            .send()
            .await?;

        let list: FileListResponse = check_status(response).await?.json().await?;
        Ok(list.files)
    }

    async fn create_file(&self, file: &NewFile) -> Result<FileMetadata> {
        let token = self.auth.access_token().await?;
        debug!(name = %file.name, "creating file");

        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .json(file)
            .send()
            .await?;

        let metadata: FileMetadata = check_status(response).await?.json().await?;
        Ok(metadata)
    }

    async fn upload_resumable<R, F>(
        &self,
        file: &NewFile,
        mut content: R,
        size: u64,
        mut on_progress: F,
    ) -> Result<FileMetadata>
    where
        R: AsyncRead + AsyncSeek + Unpin,
        F: FnMut(u64, u64),
    {
        let session_url = self.start_session(file, size).await?;

        if size == 0 {
            let response = self
                .http
                .put(&session_url)
                .header(CONTENT_RANGE, "bytes */0")
                .body(Vec::new())
                .send()
                .await?;
            let metadata: FileMetadata = check_status(response).await?.json().await?;
            on_progress(0, 0);
            return Ok(metadata);
        }

        let mut offset = 0u64;
        let mut confirmed = 0u64;
        let mut buf = vec![0u8; (self.chunk_size as u64).min(size) as usize];

        loop {
            let len = (size - offset).min(buf.len() as u64) as usize;
            content.read_exact(&mut buf[..len]).await?;
            let end = offset + len as u64 - 1;
            debug!(offset, end, size, "uploading chunk");

            let response = self
                .http
                .put(&session_url)
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", offset, end, size))
                .body(buf[..len].to_vec())
                .send()
                .await?;

            match response.status().as_u16() {
                200 | 201 => {
                    on_progress(size, size);
                    let metadata: FileMetadata = response.json().await?;
                    return Ok(metadata);
                }
                // Resume Incomplete: the Range header says how much was persisted.
                308 => {
                    let persisted = persisted_bytes(response.headers());
                    if persisted <= offset || persisted >= size {
                        return Err(DriveError::Api {
                            status: 308,
                            message: format!(
                                "upload stalled at {} of {} bytes",
                                persisted, size
                            ),
                        });
                    }
                    if persisted != end + 1 {
                        content.seek(SeekFrom::Start(persisted)).await?;
                    }
                    offset = persisted;
                    if persisted > confirmed {
                        confirmed = persisted;
                        on_progress(confirmed, size);
                    }
                }
                _ => return Err(api_error(response).await),
            }
        }
    }
}

/// Number of bytes the server holds, from a `Range: bytes=0-N` header.
fn persisted_bytes(headers: &HeaderMap) -> u64 {
    headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit('-').next())
        .and_then(|end| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .unwrap_or(0)
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error(response).await)
    }
}

/// Turn a failed response into [`DriveError::Api`], preferring Google's error body.
async fn api_error(response: Response) -> DriveError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return DriveError::Api {
            status: api_error.error.code,
            message: api_error.error.message,
        };
    }
    DriveError::Api {
        status: status.as_u16(),
        message: error_body,
    }
}
