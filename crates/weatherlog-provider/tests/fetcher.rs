//! Integration tests for `ProviderFetcher` against an in-process stub
//! provider served by axum on a loopback port.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc
)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use weatherlog_core::config::ProviderConfig;
use weatherlog_core::fetch::{FetchError, Fetcher};
use weatherlog_provider::ProviderFetcher;

// =============================================================================
// Stub provider
// =============================================================================

#[derive(Debug, Clone, Default)]
struct SeenRequest {
    key: String,
    coords: String,
    query: HashMap<String, String>,
}

type Seen = Arc<Mutex<Option<SeenRequest>>>;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub provider");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn fetcher(base_url: &str, timeout_secs: u64) -> ProviderFetcher {
    let config = ProviderConfig {
        base_url: base_url.to_owned(),
        api_key: "test-key".to_owned(),
        latitude: 49.8209,
        longitude: 18.2625,
        lang: "cs".to_owned(),
        timeout_secs,
    };
    ProviderFetcher::new(&config, "Ostrava").unwrap()
}

/// A provider that always answers with `status` and `body`.
async fn fixed_provider(status: StatusCode, body: &'static str) -> String {
    serve(Router::new().route(
        "/forecast/{key}/{coords}",
        get(move || async move { (status, body) }),
    ))
    .await
}

const CLEAR_BODY: &str = r#"{
    "latitude": 49.8209,
    "longitude": 18.2625,
    "timezone": "Europe/Prague",
    "currently": {
        "time": 1700000000,
        "summary": "Clear",
        "icon": "clear-day",
        "temperature": 21.5,
        "humidity": 0.41
    }
}"#;

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn fetch_maps_current_conditions() {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/forecast/{key}/{coords}",
            get(
                |State(seen): State<Seen>,
                 Path((key, coords)): Path<(String, String)>,
                 Query(query): Query<HashMap<String, String>>| async move {
                    *seen.lock().unwrap() = Some(SeenRequest { key, coords, query });
                    CLEAR_BODY
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let base = serve(router).await;

    let reading = fetcher(&base, 5).fetch().await.unwrap();
    assert_eq!(reading.observed_at, 1_700_000_000);
    assert!((reading.temperature - 21.5).abs() < f64::EPSILON);
    assert_eq!(reading.description, "Clear");
    assert_eq!(reading.icon, "clear-day");
    assert_eq!(reading.location, "Ostrava");

    let request = seen.lock().unwrap().clone().unwrap();
    assert_eq!(request.key, "test-key");
    assert_eq!(request.coords, "49.8209,18.2625");
    assert_eq!(request.query["exclude"], "hourly,minutely,daily,alerts");
    assert_eq!(request.query["units"], "si");
    assert_eq!(request.query["lang"], "cs");
}

#[tokio::test]
async fn each_fetch_is_one_request() {
    let hits = Arc::new(Mutex::new(0_u32));
    let router = Router::new()
        .route(
            "/forecast/{key}/{coords}",
            get(|State(hits): State<Arc<Mutex<u32>>>| async move {
                *hits.lock().unwrap() += 1;
                (StatusCode::SERVICE_UNAVAILABLE, "busy")
            }),
        )
        .with_state(Arc::clone(&hits));
    let base = serve(router).await;
    let fetcher = fetcher(&base, 5);

    assert!(fetcher.fetch().await.is_err());
    assert_eq!(*hits.lock().unwrap(), 1);
    assert!(fetcher.fetch().await.is_err());
    assert_eq!(*hits.lock().unwrap(), 2);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn non_success_status_is_http_error() {
    let base = fixed_provider(StatusCode::SERVICE_UNAVAILABLE, "maintenance").await;
    let err = fetcher(&base, 5).fetch().await.unwrap_err();
    assert_eq!(err, FetchError::Http { status: 503 });
}

#[tokio::test]
async fn forbidden_key_is_http_error() {
    let base = fixed_provider(StatusCode::FORBIDDEN, "{\"error\":\"permission denied\"}").await;
    let err = fetcher(&base, 5).fetch().await.unwrap_err();
    assert_eq!(err, FetchError::Http { status: 403 });
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let base = fixed_provider(StatusCode::OK, "<html>gateway</html>").await;
    let err = fetcher(&base, 5).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed { .. }), "got {err}");
}

#[tokio::test]
async fn missing_field_is_malformed() {
    let base = fixed_provider(
        StatusCode::OK,
        r#"{"currently": {"time": 1700000000, "summary": "Clear", "temperature": 3.0}}"#,
    )
    .await;
    let err = fetcher(&base, 5).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed { .. }));
    assert!(err.to_string().contains("currently.icon"));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetcher(&format!("http://{addr}"), 5).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Unreachable { .. }), "got {err}");
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn slow_provider_times_out_as_unreachable() {
    let router = Router::new().route(
        "/forecast/{key}/{coords}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            CLEAR_BODY
        }),
    );
    let base = serve(router).await;

    let started = std::time::Instant::now();
    let err = fetcher(&base, 1).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Unreachable { .. }), "got {err}");
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!err.to_string().contains("test-key"));
}
