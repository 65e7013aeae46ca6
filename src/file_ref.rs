//! Extract Google Drive file IDs from sharing URLs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// `drive.google.com/file/d/<ID>` and the Docs editors' `/<kind>/d/<ID>`.
static PATH_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:drive|docs)\.google\.com/(?:file|document|spreadsheets|presentation|forms)/(?:u/\d+/)?d/([a-zA-Z0-9_-]+)",
    )
    .expect("Invalid path ID regex")
});

/// `drive.google.com/open?id=<ID>` and `drive.google.com/uc?id=<ID>&export=download`.
static QUERY_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://drive\.google\.com/(?:open|uc)\?(?:[^#]*&)?id=([a-zA-Z0-9_-]+)")
        .expect("Invalid query ID regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Extract a file ID from a Drive URL or validate a raw ID.
///
/// # Examples
///
/// ```
/// use gdrive_transfer::file_ref::parse_file_id;
///
/// let id = parse_file_id("https://drive.google.com/file/d/1abc123/view").unwrap();
/// assert_eq!(id, "1abc123");
///
/// let id = parse_file_id("1abc123").unwrap();
/// assert_eq!(id, "1abc123");
/// ```
pub fn parse_file_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    for regex in [&*PATH_ID_REGEX, &*QUERY_ID_REGEX] {
        if let Some(id) = regex.captures(trimmed).and_then(|c| c.get(1)) {
            return Ok(id.as_str().to_string());
        }
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidFileId(url_or_id.to_string()))
}
