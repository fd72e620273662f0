// tests/e2e_smoke.rs
//! Full app from config with the file-backed stores. No source is fetched, so
//! no network is needed.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use rss_aggregator::config::{AppConfig, StoreBackend};
use tower::ServiceExt; // for `oneshot` (tower 0.5 with features=["util"])

fn file_backed_app(dir: &std::path::Path) -> Router {
    let cfg = AppConfig {
        store_backend: StoreBackend::File,
        store_dir: dir.to_path_buf(),
        public_base_url: "https://agg.example/".to_string(),
        ..AppConfig::default()
    };
    rss_aggregator::app_with(&cfg).expect("file-backed app builds")
}

#[tokio::test]
async fn smoke_create_and_inspect_with_file_store() {
    let tmp = tempfile::tempdir().unwrap();
    let app = file_backed_app(tmp.path());

    let req = Request::builder()
        .method("POST")
        .uri("/create")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("feeds=https%3A%2F%2Fa.example%2Frss"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
    let id = location
        .trim_start_matches("/feed/")
        .trim_end_matches(".xml")
        .to_string();

    // A fresh app over the same directory still knows the feed.
    let app = file_backed_app(tmp.path());
    let resp = app
        .oneshot(
            Request::get(format!("/api/feeds/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let s = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(s.contains("https://a.example/rss"), "body: {s}");
    assert!(
        s.contains(&format!("https://agg.example/feed/{id}.xml")),
        "body: {s}"
    );

    assert!(tmp.path().join("feeds").is_dir());
    assert!(tmp.path().join("sources").is_dir());
    assert!(tmp.path().join("aggregates").is_dir());
}
