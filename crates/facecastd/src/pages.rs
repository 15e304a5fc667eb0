//! Static browser client, embedded at compile time.

use axum::http::header;
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const UPLOADER_HTML: &str = include_str!("../assets/uploader.html");
const INDEX_JS: &str = include_str!("../assets/index.js");
const UPLOADER_JS: &str = include_str!("../assets/uploader.js");

const JAVASCRIPT: &str = "application/javascript; charset=utf-8";

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn uploader() -> Html<&'static str> {
    Html(UPLOADER_HTML)
}

pub async fn index_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, JAVASCRIPT)], INDEX_JS)
}

pub async fn uploader_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, JAVASCRIPT)], UPLOADER_JS)
}
