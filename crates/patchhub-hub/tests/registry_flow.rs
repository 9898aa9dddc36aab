//! Search through the real registry client against a local HTTP server.

use std::sync::Arc;
use std::time::Duration;

use patchhub_hub::registry::DEFAULT_USER_AGENT;
use patchhub_hub::{
    ArtifactKind, GithubRegistryClient, Hub, HubError, HubSettings, SearchPayload, UrlValidator,
};
use patchhub_test::{
    MemoryCredentialStore, MockFetcher, MockFinalizer, RecordingMover, TEST_ORG,
    rate_limited_response_json, search_response_json, setup_test_logging,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });
    (format!("http://{addr}"), handle)
}

fn hub(base: &str, token: Option<&str>) -> Hub {
    let store = match token {
        Some(t) => MemoryCredentialStore::with_token(t),
        None => MemoryCredentialStore::new(),
    };
    let client = GithubRegistryClient::with_options(base, DEFAULT_USER_AGENT, Duration::from_secs(5))
        .unwrap()
        .with_credentials(Arc::new(store));
    Hub::builder(
        Arc::new(client),
        Arc::new(MockFetcher::new()),
        Arc::new(RecordingMover::new()),
        Arc::new(MockFinalizer::new()),
    )
    .settings(HubSettings {
        publisher_org: TEST_ORG.into(),
        ..HubSettings::default()
    })
    .build()
}

#[tokio::test]
async fn search_renders_cards_and_sends_token() {
    setup_test_logging("patchhub_hub=debug");
    let (base, server) = serve_once("200 OK", search_response_json(&["guard", "shield"])).await;

    let payload = hub(&base, Some("ghp_fixture"))
        .search("admin", "guard", ArtifactKind::Theme)
        .await
        .unwrap();
    let payload: SearchPayload = serde_json::from_str(&payload).unwrap();

    let ids: Vec<&str> = payload.cards.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(ids, ["guard", "shield"]);
    assert_eq!(payload.kind, ArtifactKind::Theme);
    let validator = UrlValidator::new(TEST_ORG);
    for card in &payload.cards {
        assert!(validator.validate(&card.install_url, &card.identifier));
        assert_eq!(card.updated, "2024-05-01");
    }

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.contains("authorization: bearer ghp_fixture"));
    assert!(request.contains("user-agent: patchhub/"));
}

#[tokio::test]
async fn anonymous_search_sends_no_authorization() {
    let (base, server) = serve_once("200 OK", search_response_json(&[])).await;
    let payload = hub(&base, None)
        .search("admin", "nothing", ArtifactKind::Plugin)
        .await
        .unwrap();
    let payload: SearchPayload = serde_json::from_str(&payload).unwrap();
    assert!(payload.cards.is_empty());
    assert!(payload.message.is_some());

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(!request.contains("authorization:"));
}

#[tokio::test]
async fn upstream_rate_limit_surfaces_as_error() {
    let (base, _server) = serve_once("403 Forbidden", rate_limited_response_json()).await;
    let err = hub(&base, None)
        .search("admin", "guard", ArtifactKind::Plugin)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::RateLimitedByUpstream));
}
