use crate::engine::EngineHandle;
use crate::{channel, pages, upload};
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub dataset_dir: Arc<PathBuf>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/upload", get(pages::uploader))
        .route("/static/index.js", get(pages::index_js))
        .route("/static/uploader.js", get(pages::uploader_js))
        .route(
            "/upload-file",
            get(upload::upload_file_get).post(upload::upload_file),
        )
        .route("/socket", get(channel::ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::test_engine;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const BOUNDARY: &str = "facecast-test-boundary";

    /// Router with a 1 MiB body limit.
    fn app(dataset_dir: PathBuf) -> Router {
        let (engine, _) = test_engine();
        router(
            AppState {
                engine,
                dataset_dir: Arc::new(dataset_dir),
            },
            1024 * 1024,
        )
    }

    fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        Request::post("/upload-file")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, content)))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/static/index.js"));
    }

    #[tokio::test]
    async fn test_static_script_content_type() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(Request::get("/static/index.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let ctype = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(ctype.starts_with("application/javascript"));
    }

    #[tokio::test]
    async fn test_healthz() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_upload_file_get_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(Request::get("/upload-file").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["message"], "Post method not used");
    }

    #[tokio::test]
    async fn test_upload_wrong_extension_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("dataset");
        let resp = app(dataset.clone())
            .oneshot(upload_request(upload::UPLOAD_FIELD, "archive.txt", b"hello"))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["message"], "File type not allowed");
        assert!(!dataset.exists());
    }

    #[tokio::test]
    async fn test_upload_missing_field() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(upload_request("other", "faces.zip", b"PK"))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["message"], "No file in request.files");
    }

    #[tokio::test]
    async fn test_upload_without_multipart_body() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(Request::post("/upload-file").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["message"], "No file in request.files");
    }

    #[tokio::test]
    async fn test_upload_over_body_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let oversized = vec![0u8; 2 * 1024 * 1024];
        let resp = app(tmp.path().to_path_buf())
            .oneshot(upload_request(upload::UPLOAD_FIELD, "faces.zip", &oversized))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(resp).await["status"], "ERROR");
        assert!(!tmp.path().join("faces.zip").exists());
    }

    #[tokio::test]
    async fn test_upload_corrupt_zip_is_server_error() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(upload_request(upload::UPLOAD_FIELD, "faces.zip", b"not a zip"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["status"], "ERROR");
    }

    #[tokio::test]
    async fn test_upload_zip_success() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer.start_file("alice/a.jpg", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"jpeg bytes").unwrap();
        let archive = writer.finish().unwrap().into_inner();

        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path().to_path_buf())
            .oneshot(upload_request(upload::UPLOAD_FIELD, "faces.zip", &archive))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "SUCCESS");
        assert_eq!(std::fs::read(tmp.path().join("alice/a.jpg")).unwrap(), b"jpeg bytes");
    }
}
