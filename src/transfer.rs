//! Single-file download and upload operations.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{FileMetadata, NewFile, FOLDER_MIME_TYPE};
use crate::service::DriveService;

/// Description given to folders created on demand by an upload.
pub const FOLDER_DESCRIPTION: &str = "Created by upload_gd";

/// What to download and where to put it.
#[derive(Debug, Clone, Default)]
pub struct DownloadConfig {
    pub file_id: String,
    /// Local file name. When empty the file's original name on Drive is used.
    pub output_name: Option<String>,
    /// Directory the file is written to. Empty means the current directory.
    pub output_dir: PathBuf,
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Download a file into `output_dir`.
///
/// The content request is made before the local file is created, so a
/// failure there leaves nothing behind. Failures after that point leave
/// whatever was already written.
pub async fn download_file<S: DriveService>(
    service: &S,
    config: &DownloadConfig,
) -> Result<DownloadOutcome> {
    let name = match config.output_name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => {
            let metadata = service.get_file(&config.file_id).await?;
            local_name(&metadata)
        }
    };
    let path = config.output_dir.join(&name);

    let mut body = service.download(&config.file_id).await?;

    let file = File::create(&path).await?;
    let mut writer = BufWriter::new(file);
    let bytes = tokio::io::copy(&mut body, &mut writer).await?;
    writer.flush().await?;

    info!(file_id = %config.file_id, path = %path.display(), bytes, "download complete");
    Ok(DownloadOutcome { path, bytes })
}

/// File name for a server-reported name, keeping only its last component.
fn local_name(metadata: &FileMetadata) -> String {
    Path::new(metadata.download_name())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| metadata.id.clone())
}

/// What to upload and where.
#[derive(Debug, Clone, Default)]
pub struct UploadConfig {
    pub input_path: PathBuf,
    /// Title on Drive. Defaults to the input file's name.
    pub title: Option<String>,
    pub description: Option<String>,
    /// Folder to upload into, created if missing. Empty means My Drive's root.
    pub folder_name: Option<String>,
    /// Overrides the MIME type guessed from the file extension.
    pub mime_type: Option<String>,
}

impl UploadConfig {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Default::default()
        }
    }

    /// Title the uploaded file will get.
    pub fn title(&self) -> String {
        match self.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => self
                .input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.input_path.display().to_string()),
        }
    }

    /// MIME type sent with the content.
    pub fn mime_type(&self) -> String {
        match self.mime_type.as_deref().filter(|m| !m.is_empty()) {
            Some(mime) => mime.to_string(),
            None => mime_guess::from_path(&self.input_path)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub file: FileMetadata,
    /// Size reported by Drive, or the local size if Drive omitted it.
    pub bytes: u64,
}

/// Upload a local file, reporting `(sent, total)` through `on_progress`.
///
/// `on_start` runs once the destination folder is resolved, right before the
/// content transfer begins. Nothing is called if an earlier step fails.
pub async fn upload_file<S, B, F>(
    service: &S,
    config: &UploadConfig,
    on_start: B,
    on_progress: F,
) -> Result<UploadOutcome>
where
    S: DriveService,
    B: FnOnce(),
    F: FnMut(u64, u64),
{
    let input = File::open(&config.input_path).await?;
    let stat = input.metadata().await?;
    if !stat.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", config.input_path.display()),
        )
        .into());
    }
    let size = stat.len();

    let parent = match config.folder_name.as_deref() {
        Some(name) => get_or_create_folder(service, name).await?,
        None => None,
    };

    let file = NewFile {
        name: config.title(),
        description: config.description.clone().filter(|d| !d.is_empty()),
        mime_type: Some(config.mime_type()),
        parents: parent.into_iter().collect(),
    };
    debug!(name = %file.name, size, parents = ?file.parents, "starting upload");

    on_start();
    let uploaded = service
        .upload_resumable(&file, input, size, on_progress)
        .await?;
    let bytes = uploaded.size.unwrap_or(size);

    info!(id = %uploaded.id, name = %uploaded.name, bytes, "upload complete");
    Ok(UploadOutcome {
        file: uploaded,
        bytes,
    })
}

/// Find a folder by name, creating it if none exists.
///
/// Returns `None` for an empty name: the file goes to the root folder.
pub async fn get_or_create_folder<S: DriveService>(
    service: &S,
    folder_name: &str,
) -> Result<Option<String>> {
    if folder_name.is_empty() {
        return Ok(None);
    }

    let query = folder_query(folder_name);
    if let Some(folder) = service.list_files(&query, 1).await?.into_iter().next() {
        debug!(folder = folder_name, id = %folder.id, "using existing folder");
        return Ok(Some(folder.id));
    }

    println!("Folder not found. Create new folder : {}", folder_name);
    let folder = service
        .create_file(&NewFile::folder(folder_name, FOLDER_DESCRIPTION))
        .await?;
    info!(folder = folder_name, id = %folder.id, "created folder");
    Ok(Some(folder.id))
}

/// Drive query matching non-trashed folders called `name`.
pub fn folder_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, FOLDER_MIME_TYPE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_query_escapes_quotes() {
        assert_eq!(
            folder_query("Bob's files"),
            "name = 'Bob\\'s files' and mimeType = 'application/vnd.google-apps.folder' and trashed = false"
        );
        assert!(folder_query(r"a\b").starts_with(r"name = 'a\\b'"));
    }

    #[test]
    fn test_upload_title_defaults_to_file_name() {
        let mut config = UploadConfig::new("/tmp/backups/db.tar.gz");
        assert_eq!(config.title(), "db.tar.gz");

        config.title = Some(String::new());
        assert_eq!(config.title(), "db.tar.gz");

        config.title = Some("nightly".to_string());
        assert_eq!(config.title(), "nightly");
    }

    #[test]
    fn test_upload_mime_type() {
        let mut config = UploadConfig::new("photo.png");
        assert_eq!(config.mime_type(), "image/png");

        config.input_path = PathBuf::from("README");
        assert_eq!(config.mime_type(), "application/octet-stream");

        config.mime_type = Some("text/markdown".to_string());
        assert_eq!(config.mime_type(), "text/markdown");
    }

    #[test]
    fn test_local_name_strips_directories() {
        let metadata = FileMetadata {
            id: "abc".to_string(),
            name: "../../etc/passwd".to_string(),
            ..Default::default()
        };
        assert_eq!(local_name(&metadata), "passwd");

        let metadata = FileMetadata {
            id: "abc".to_string(),
            name: "..".to_string(),
            ..Default::default()
        };
        assert_eq!(local_name(&metadata), "abc");
    }
}
