//! The set of Drive capabilities the transfer operations rely on.

use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncSeek};

use crate::error::Result;
use crate::models::{FileMetadata, NewFile};

/// Streaming body of a file download.
pub type DownloadBody = Pin<Box<dyn AsyncRead + Send>>;

/// Remote file storage: get, download, list, insert and resumable upload.
///
/// [`DriveClient`](crate::client::DriveClient) implements this against the
/// Drive REST API; tests substitute an in-memory store.
#[allow(async_fn_in_trait)]
pub trait DriveService {
    /// Fetch a file's metadata.
    async fn get_file(&self, file_id: &str) -> Result<FileMetadata>;

    /// Start downloading a file's content.
    ///
    /// Resolves once the service has accepted the request, before any byte of
    /// the body has been read.
    async fn download(&self, file_id: &str) -> Result<DownloadBody>;

    /// List at most `page_size` files matching a Drive query.
    async fn list_files(&self, query: &str, page_size: u32) -> Result<Vec<FileMetadata>>;

    /// Insert a metadata-only file, such as a folder.
    async fn create_file(&self, file: &NewFile) -> Result<FileMetadata>;

    /// Upload `size` bytes from `content` as a new file.
    ///
    /// `on_progress(sent, total)` is called each time the service confirms
    /// more of the content. `sent` never decreases.
    async fn upload_resumable<R, F>(
        &self,
        file: &NewFile,
        content: R,
        size: u64,
        on_progress: F,
    ) -> Result<FileMetadata>
    where
        R: AsyncRead + AsyncSeek + Unpin,
        F: FnMut(u64, u64);
}
