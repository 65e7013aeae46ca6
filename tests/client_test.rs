//! Tests for DriveClient with mocked HTTP responses.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use tempfile::TempDir;

use gdrive_transfer::error::DriveError;
use gdrive_transfer::models::NewFile;
use gdrive_transfer::service::DriveService;
use gdrive_transfer::transfer::get_or_create_folder;
use gdrive_transfer::{
    download_file, upload_file, Authenticator, DownloadConfig, DriveClient, OAuthConfig, Token,
    UploadConfig,
};

fn test_client(server: &ServerGuard, chunk_size: usize) -> DriveClient {
    let secret = json!({
        "installed": {
            "client_id": "client",
            "client_secret": "secret",
            "token_uri": format!("{}/token", server.url())
        }
    });
    let config = OAuthConfig::from_json(secret.to_string().as_bytes()).unwrap();
    let auth = Authenticator::new(config).with_token(Token {
        access_token: "test-token".to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: None,
        expiry: None,
    });
    DriveClient::with_endpoints(auth, server.url(), format!("{}/upload", server.url()))
        .with_chunk_size(chunk_size)
}

mod metadata {
    use super::*;

    #[tokio::test]
    async fn get_file_parses_metadata() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files/abc123")
            .match_header("authorization", "Bearer test-token")
            .match_query(Matcher::UrlEncoded(
                "supportsAllDrives".into(),
                "true".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "abc123",
                    "name": "Report",
                    "originalFilename": "report.pdf",
                    "mimeType": "application/pdf",
                    "size": "2048"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let metadata = client.get_file("abc123").await.unwrap();

        assert_eq!(metadata.name, "Report");
        assert_eq!(metadata.download_name(), "report.pdf");
        assert_eq!(metadata.size, Some(2048));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn google_error_body_is_used() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(
                json!({"error": {"code": 404, "message": "File not found: missing."}}).to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let err = client.get_file("missing").await.unwrap_err();

        match err {
            DriveError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found: missing.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn plain_error_body_keeps_http_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/abc")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let err = client.get_file("abc").await.unwrap_err();

        assert!(matches!(
            err,
            DriveError::Api { status: 503, ref message } if message == "upstream unavailable"
        ));
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn saves_under_original_name() {
        let mut server = Server::new_async().await;
        let meta = server
            .mock("GET", "/files/f1")
            .match_query(Matcher::Regex("fields=".into()))
            .with_status(200)
            .with_body(json!({"id": "f1", "name": "Data", "originalFilename": "data.csv"}).to_string())
            .create_async()
            .await;
        let content = server
            .mock("GET", "/files/f1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("a,b\n1,2\n")
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let out = TempDir::new().unwrap();
        let config = DownloadConfig {
            file_id: "f1".to_string(),
            output_name: None,
            output_dir: out.path().to_path_buf(),
        };

        let outcome = download_file(&client, &config).await.unwrap();

        assert_eq!(outcome.path, out.path().join("data.csv"));
        assert_eq!(outcome.bytes, 8);
        assert_eq!(std::fs::read_to_string(&outcome.path).unwrap(), "a,b\n1,2\n");
        meta.assert_async().await;
        content.assert_async().await;
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/f1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(403)
            .with_body(json!({"error": {"code": 403, "message": "Forbidden"}}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let out = TempDir::new().unwrap();
        let config = DownloadConfig {
            file_id: "f1".to_string(),
            output_name: Some("f1.bin".to_string()),
            output_dir: out.path().to_path_buf(),
        };

        let err = download_file(&client, &config).await.unwrap_err();

        assert!(matches!(err, DriveError::Api { status: 403, .. }));
        assert!(!out.path().join("f1.bin").exists());
    }
}

mod folders {
    use super::*;

    #[tokio::test]
    async fn existing_folder_is_reused() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "q".into(),
                    "name = 'backups' and mimeType = 'application/vnd.google-apps.folder' and trashed = false".into(),
                ),
                Matcher::UrlEncoded("pageSize".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(json!({"files": [{"id": "folder9", "name": "backups"}]}).to_string())
            .create_async()
            .await;
        let create = server
            .mock("POST", "/files")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let id = get_or_create_folder(&client, "backups").await.unwrap();

        assert_eq!(id.as_deref(), Some("folder9"));
        list.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn missing_folder_is_created() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded("pageSize".into(), "1".into()))
            .with_status(200)
            .with_body(json!({"files": []}).to_string())
            .create_async()
            .await;
        let create = server
            .mock("POST", "/files")
            .match_query(Matcher::UrlEncoded(
                "supportsAllDrives".into(),
                "true".into(),
            ))
            .match_body(Matcher::PartialJson(json!({
                "name": "backups",
                "mimeType": "application/vnd.google-apps.folder"
            })))
            .with_status(200)
            .with_body(json!({"id": "new-folder", "name": "backups"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let id = get_or_create_folder(&client, "backups").await.unwrap();

        assert_eq!(id.as_deref(), Some("new-folder"));
        create.assert_async().await;
    }
}

mod resumable_upload {
    use super::*;

    async fn mock_session(server: &mut ServerGuard) -> mockito::Mock {
        let location = format!("{}/session/1", server.url());
        server
            .mock("POST", "/upload/files")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "resumable".into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("location", &location)
            .create_async()
            .await
    }

    async fn mock_chunk(
        server: &mut ServerGuard,
        range: &str,
        body: &'static str,
        persisted: &str,
    ) -> mockito::Mock {
        server
            .mock("PUT", "/session/1")
            .match_header("content-range", range)
            .match_body(body)
            .with_status(308)
            .with_header("range", persisted)
            .expect(1)
            .create_async()
            .await
    }

    fn input_file(dir: &TempDir, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn uploads_in_chunks_with_progress() {
        let mut server = Server::new_async().await;
        let session = mock_session(&mut server).await;
        let first = mock_chunk(&mut server, "bytes 0-4/12", "hello", "bytes=0-4").await;
        let second = mock_chunk(&mut server, "bytes 5-9/12", " worl", "bytes=0-9").await;
        let last = server
            .mock("PUT", "/session/1")
            .match_header("content-range", "bytes 10-11/12")
            .match_body("d!")
            .with_status(200)
            .with_body(json!({"id": "up1", "name": "hello.txt", "size": "12"}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, 5);
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir, b"hello world!");

        let mut seen = Vec::new();
        let outcome = upload_file(
            &client,
            &UploadConfig::new(&input),
            || {},
            |current, total| seen.push((current, total)),
        )
        .await
        .unwrap();

        assert_eq!(outcome.file.id, "up1");
        assert_eq!(outcome.bytes, 12);
        assert_eq!(seen, vec![(5, 12), (10, 12), (12, 12)]);
        session.assert_async().await;
        first.assert_async().await;
        second.assert_async().await;
        last.assert_async().await;
    }

    #[tokio::test]
    async fn resends_bytes_the_server_did_not_keep() {
        let mut server = Server::new_async().await;
        mock_session(&mut server).await;
        let first = mock_chunk(&mut server, "bytes 0-4/12", "hello", "bytes=0-2").await;
        let second = mock_chunk(&mut server, "bytes 3-7/12", "lo wo", "bytes=0-7").await;
        server
            .mock("PUT", "/session/1")
            .match_header("content-range", "bytes 8-11/12")
            .match_body("rld!")
            .with_status(201)
            .with_body(json!({"id": "up2", "name": "hello.txt"}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, 5);
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir, b"hello world!");

        let mut seen = Vec::new();
        let outcome = upload_file(
            &client,
            &UploadConfig::new(&input),
            || {},
            |current, total| seen.push((current, total)),
        )
        .await
        .unwrap();

        assert_eq!(outcome.file.id, "up2");
        // Drive omitted the size, so the local size is reported.
        assert_eq!(outcome.bytes, 12);
        assert_eq!(seen, vec![(3, 12), (8, 12), (12, 12)]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn empty_file_is_finalized_in_one_request() {
        let mut server = Server::new_async().await;
        mock_session(&mut server).await;
        let finalize = server
            .mock("PUT", "/session/1")
            .match_header("content-range", "bytes */0")
            .with_status(200)
            .with_body(json!({"id": "empty", "name": "hello.txt", "size": "0"}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, 5);
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir, b"");

        let mut seen = Vec::new();
        let outcome = upload_file(
            &client,
            &UploadConfig::new(&input),
            || {},
            |current, total| seen.push((current, total)),
        )
        .await
        .unwrap();

        assert_eq!(outcome.bytes, 0);
        assert_eq!(seen, vec![(0, 0)]);
        finalize.assert_async().await;
    }

    #[tokio::test]
    async fn session_without_location_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/upload/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let client = test_client(&server, 5);
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir, b"hello");

        let err = upload_file(&client, &UploadConfig::new(&input), || {}, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::MissingUploadUrl));
    }

    #[tokio::test]
    async fn failed_chunk_is_not_retried() {
        let mut server = Server::new_async().await;
        mock_session(&mut server).await;
        let chunk = server
            .mock("PUT", "/session/1")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server, 5);
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir, b"hello world!");

        let mut calls = 0;
        let err = upload_file(
            &client,
            &UploadConfig::new(&input),
            || {},
            |_, _| calls += 1,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DriveError::Api { status: 500, .. }));
        assert_eq!(calls, 0);
        chunk.assert_async().await;
    }

    #[tokio::test]
    async fn metadata_is_sent_when_opening_the_session() {
        let mut server = Server::new_async().await;
        let location = format!("{}/session/1", server.url());
        let session = server
            .mock("POST", "/upload/files")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "resumable".into()))
            .match_header("x-upload-content-type", "text/plain")
            .match_header("x-upload-content-length", "5")
            .match_body(Matcher::Json(json!({
                "name": "greeting",
                "mimeType": "text/plain",
                "parents": ["folder1"]
            })))
            .with_status(200)
            .with_header("location", &location)
            .create_async()
            .await;
        server
            .mock("PUT", "/session/1")
            .with_status(200)
            .with_body(json!({"id": "up3", "name": "greeting", "parents": ["folder1"]}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, 1024);
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir, b"hello");
        let file = NewFile {
            name: "greeting".to_string(),
            description: None,
            mime_type: Some("text/plain".to_string()),
            parents: vec!["folder1".to_string()],
        };
        let content = tokio::fs::File::open(&input).await.unwrap();

        let uploaded = client
            .upload_resumable(&file, content, 5, |_, _| {})
            .await
            .unwrap();

        assert_eq!(uploaded.parents, vec!["folder1".to_string()]);
        session.assert_async().await;
    }
}
