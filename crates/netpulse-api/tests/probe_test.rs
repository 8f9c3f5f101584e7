// Integration tests for `NetProber` and `TransferClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use bytes::Bytes;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netpulse_api::{
    Error, NetProber, ProbeErrorKind, ProbeTarget, Prober, TransferClient, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NetProber, TransferClient) {
    let server = MockServer::start().await;
    let http = reqwest::Client::new();
    (
        server,
        NetProber::with_client(http.clone()),
        TransferClient::with_client(http),
    )
}

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{p}", server.uri())).unwrap()
}

// ── Probe primitive ─────────────────────────────────────────────────

#[tokio::test]
async fn test_head_probe_success() {
    let (server, prober, _) = setup().await;

    Mock::given(method("HEAD"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let target = ProbeTarget::head(url(&server, "/ping"));
    let outcome = prober.probe(&target, Duration::from_secs(2)).await;

    assert!(outcome.succeeded, "expected success, got {outcome:?}");
    assert_eq!(outcome.error_kind, None);
    assert!(outcome.target.starts_with("HEAD "));
}

#[tokio::test]
async fn test_error_status_counts_as_reachable() {
    let (server, prober, _) = setup().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let head = prober
        .probe(&ProbeTarget::head(url(&server, "/missing")), Duration::from_secs(2))
        .await;
    let get = prober
        .probe(&ProbeTarget::get(url(&server, "/down")), Duration::from_secs(2))
        .await;

    assert!(head.succeeded);
    assert!(get.succeeded);
}

#[tokio::test]
async fn test_probe_timeout_reports_timeout_kind() {
    let (server, prober, _) = setup().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let outcome = prober
        .probe(&ProbeTarget::head(url(&server, "/slow")), Duration::from_millis(100))
        .await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.error_kind, Some(ProbeErrorKind::Timeout));
    assert!(outcome.elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn test_tcp_probe_open_and_closed_port() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap();

    let closed = {
        let tmp = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        tmp.local_addr().unwrap()
    };

    let prober = NetProber::new(&TransportConfig::default()).unwrap();

    let ok = prober
        .probe(&ProbeTarget::tcp(open), Duration::from_secs(2))
        .await;
    assert!(ok.succeeded, "expected open port to succeed: {ok:?}");

    let refused = prober
        .probe(&ProbeTarget::tcp(closed), Duration::from_secs(2))
        .await;
    assert!(!refused.succeeded);
    assert_eq!(refused.error_kind, Some(ProbeErrorKind::Refused));
}

// ── Transfers ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_download_streams_whole_body() {
    let (server, _, client) = setup().await;
    let body = vec![7u8; 256 * 1024];

    Mock::given(method("GET"))
        .and(path("/payload"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let mut download = client.open_download(&url(&server, "/payload")).await.unwrap();
    assert_eq!(download.content_length(), Some(body.len() as u64));

    let mut total = 0usize;
    while let Some(chunk) = download.next_chunk().await.unwrap() {
        total += chunk.len();
    }
    assert_eq!(total, body.len());
}

#[tokio::test]
async fn test_download_rejects_error_status() {
    let (server, _, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.open_download(&url(&server, "/payload")).await;
    assert!(
        matches!(result, Err(Error::Status { status: 500, .. })),
        "expected Status 500, got: {result:?}"
    );
}

#[tokio::test]
async fn test_upload_posts_payload() {
    let (server, _, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let status = client
        .upload(&url(&server, "/upload"), Bytes::from(vec![0u8; 1024]))
        .await
        .unwrap();
    assert_eq!(status, 200);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body.len(), 1024);
}

#[tokio::test]
async fn test_banner_captures_headers_and_truncates_body() {
    let (server, _, client) = setup().await;
    let html = format!("<html><head><title>RT-AX88U</title></head>{}</html>", "x".repeat(4096));

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("Server", "httpd/2.0")
                .set_body_string(html),
        )
        .mount(&server)
        .await;

    let banner = client.fetch_banner(&url(&server, "/"), 64).await.unwrap();
    assert_eq!(banner.status, 401);
    assert_eq!(banner.header("SERVER"), Some("httpd/2.0"));
    assert_eq!(banner.body.len(), 64);
    assert!(banner.body.contains("<title>RT-AX88U</title>"));
}
