//! End-to-end install through the hub and service layers.

use std::sync::Arc;
use std::time::Duration;

use patchhub_hub::{
    AllowList, ArtifactKind, DirectoryFinalizer, FinalizeOutcome, FsMover, Hub, HubError,
    HubService, HubSettings, InstallRequest, ManualClock,
};
use patchhub_test::{
    MockFetcher, MockFinalizer, MockRegistry, RecordingMover, TEST_ORG, archive_url,
};

struct Fixture {
    fetcher: MockFetcher,
    mover: RecordingMover,
    finalizer: MockFinalizer,
    clock: Arc<ManualClock>,
    hub: Hub,
}

fn fixture(fetcher: MockFetcher, mover: RecordingMover, finalizer: MockFinalizer) -> Fixture {
    let clock = Arc::new(ManualClock::default());
    let hub = Hub::builder(
        Arc::new(MockRegistry::new()),
        Arc::new(fetcher.clone()),
        Arc::new(mover.clone()),
        Arc::new(finalizer.clone()),
    )
    .clock(clock.clone())
    .settings(HubSettings {
        publisher_org: TEST_ORG.into(),
        ..HubSettings::default()
    })
    .build();
    Fixture {
        fetcher,
        mover,
        finalizer,
        clock,
        hub,
    }
}

fn default_fixture() -> Fixture {
    fixture(MockFetcher::new(), RecordingMover::new(), MockFinalizer::new())
}

#[tokio::test]
async fn install_succeeds_with_plugin_hint() {
    let f = default_fixture();
    let outcome = f
        .hub
        .install("admin", &archive_url("widget", "main"), "widget", ArtifactKind::Plugin)
        .await
        .unwrap();

    assert_eq!(outcome.identifier.as_str(), "widget");
    assert_eq!(outcome.kind, ArtifactKind::Plugin);
    assert_eq!(outcome.activation_hint, "plugins");
    assert_eq!(f.fetcher.urls(), [archive_url("widget", "main")]);

    let moves = f.mover.moves();
    assert_eq!(moves.len(), 1);
    assert!(moves[0].0.ends_with("widget-main"));
    assert!(moves[0].1.ends_with("widget"));

    let calls = f.finalizer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].folder_name, "widget");
    assert_eq!(calls[0].marker.as_deref(), Some("widget"));
}

#[tokio::test]
async fn evil_host_is_rejected_without_side_effects() {
    let f = default_fixture();
    let err = f
        .hub
        .install(
            "admin",
            "https://evil.com/Sudo-WP/widget/archive/refs/heads/main.zip",
            "widget",
            ArtifactKind::Plugin,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HubError::InvalidSource(_)));
    assert_eq!(f.fetcher.call_count(), 0);
    assert_eq!(f.mover.call_count(), 0);
    assert_eq!(f.finalizer.call_count(), 0);
}

#[tokio::test]
async fn traversal_identifier_is_rejected_without_side_effects() {
    let f = default_fixture();
    let err = f
        .hub
        .install("admin", &archive_url("widget", "main"), "../widget", ArtifactKind::Plugin)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::InvalidSource(_)));
    assert_eq!(f.fetcher.call_count(), 0);
}

#[tokio::test]
async fn already_canonical_folder_is_not_moved() {
    let f = fixture(
        MockFetcher::new().with_folder("widget"),
        RecordingMover::new(),
        MockFinalizer::new(),
    );
    f.hub
        .install("admin", &archive_url("widget", "main"), "widget", ArtifactKind::Plugin)
        .await
        .unwrap();
    assert_eq!(f.mover.call_count(), 0);
    assert_eq!(f.finalizer.calls()[0].folder_name, "widget");
}

#[tokio::test]
async fn rename_failure_is_reported_and_not_finalized() {
    let f = fixture(
        MockFetcher::new(),
        RecordingMover::new().failing(),
        MockFinalizer::new(),
    );
    let err = f
        .hub
        .install("admin", &archive_url("widget", "main"), "widget", ArtifactKind::Plugin)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::RenameFailed));
    assert_eq!(f.finalizer.call_count(), 0);
}

#[tokio::test]
async fn fetch_failure_is_reported() {
    let f = fixture(
        MockFetcher::new().failing("connection reset"),
        RecordingMover::new(),
        MockFinalizer::new(),
    );
    let err = f
        .hub
        .install("admin", &archive_url("widget", "main"), "widget", ArtifactKind::Plugin)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::FetchFailed(_)));
    assert_eq!(f.mover.call_count(), 0);
}

#[tokio::test]
async fn already_installed_is_reported() {
    let f = fixture(
        MockFetcher::new(),
        RecordingMover::new(),
        MockFinalizer::new().with_outcome(FinalizeOutcome::AlreadyInstalled),
    );
    let err = f
        .hub
        .install("admin", &archive_url("widget", "main"), "widget", ArtifactKind::Plugin)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::AlreadyInstalled(ref id) if id == "widget"));
}

#[tokio::test]
async fn install_window_is_independent_of_search() {
    let f = default_fixture();
    let url = archive_url("widget", "main");

    f.hub.search("admin", "widget", ArtifactKind::Plugin).await.unwrap();
    f.hub
        .install("admin", &url, "widget", ArtifactKind::Plugin)
        .await
        .unwrap();
    let err = f
        .hub
        .install("admin", &url, "widget", ArtifactKind::Plugin)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::TooManyRequests));
    assert_eq!(f.fetcher.call_count(), 1);

    f.clock.advance_secs(10);
    f.hub
        .install("admin", &url, "widget", ArtifactKind::Plugin)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_installs_never_swap_identifiers() {
    let f = fixture(
        MockFetcher::new().with_delay(Duration::from_millis(20)),
        RecordingMover::new(),
        MockFinalizer::new(),
    );
    let hub = Arc::new(f.hub);

    let mut handles = Vec::new();
    for round in 0..5 {
        for name in ["alpha", "beta"] {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                let identity = format!("{name}-{round}");
                hub.install(&identity, &archive_url(name, "main"), name, ArtifactKind::Plugin)
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let calls = f.finalizer.calls();
    assert_eq!(calls.len(), 10);
    for call in calls {
        assert_eq!(call.folder_name, call.identifier);
        assert_eq!(call.marker.as_deref(), Some(call.identifier.as_str()));
    }
}

#[tokio::test]
async fn real_filesystem_install_lands_under_kind_folder() {
    let root = tempfile::tempdir().unwrap();
    let hub = Hub::builder(
        Arc::new(MockRegistry::new()),
        Arc::new(MockFetcher::new()),
        Arc::new(FsMover),
        Arc::new(DirectoryFinalizer::new(root.path())),
    )
    .settings(HubSettings {
        publisher_org: TEST_ORG.into(),
        ..HubSettings::default()
    })
    .build();

    hub.install("admin", &archive_url("skin", "main"), "skin", ArtifactKind::Theme)
        .await
        .unwrap();
    assert!(root.path().join("themes/skin").is_dir());

    let err = hub
        .install("other", &archive_url("skin", "main"), "skin", ArtifactKind::Theme)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::AlreadyInstalled(_)));
}

#[tokio::test]
async fn service_install_returns_tagged_response() {
    let f = default_fixture();
    let service = HubService::new(Arc::new(f.hub), Arc::new(AllowList::new(["admin"])));

    let denied = service
        .install(InstallRequest {
            identity: "guest".into(),
            url: archive_url("widget", "main"),
            identifier: "widget".into(),
            kind: ArtifactKind::Plugin,
        })
        .await;
    assert_eq!(denied.code(), Some("permission_denied"));
    assert_eq!(f.fetcher.call_count(), 0);

    let ok = service
        .install(InstallRequest {
            identity: "admin".into(),
            url: archive_url("widget", "main"),
            identifier: "widget".into(),
            kind: ArtifactKind::Theme,
        })
        .await;
    assert!(ok.success);
    assert_eq!(ok.data["identifier"], "widget");
    assert_eq!(ok.data["activation_hint"], "themes");
}
