use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use converge::client::{ClientError, PackageStatus, RulesClient, PENDING_COUNTERS};
use converge::config::ApiConfig;
use converge::notify::{ChannelNotifier, NotificationKind};
use converge::poller::{ConvergencePoller, ConvergenceRequest, FailureStage, PollPhase, PollPolicy};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Fake server: the install drains `remaining` by one per status read.
struct MockApi {
    fail_install: bool,
    installed: AtomicBool,
    remaining: AtomicU64,
    status_reads: AtomicU64,
}

impl MockApi {
    fn new(remaining: u64) -> Arc<Self> {
        Arc::new(Self {
            fail_install: false,
            installed: AtomicBool::new(false),
            remaining: AtomicU64::new(remaining),
            status_reads: AtomicU64::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_install: true,
            installed: AtomicBool::new(false),
            remaining: AtomicU64::new(3),
            status_reads: AtomicU64::new(0),
        })
    }
}

async fn install(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !headers.contains_key("kbn-xsrf") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "missing kbn-xsrf header"})),
        );
    }
    if api.fail_install {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "install failed"})),
        );
    }

    api.installed.store(true, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({"rules_installed": 3, "rules_updated": 0, "timelines_installed": 0, "timelines_updated": 0})),
    )
}

async fn status(State(api): State<Arc<MockApi>>) -> Json<Value> {
    api.status_reads.fetch_add(1, Ordering::SeqCst);

    let remaining = if api.installed.load(Ordering::SeqCst) {
        let current = api.remaining.load(Ordering::SeqCst);
        api.remaining.store(current.saturating_sub(1), Ordering::SeqCst);
        current
    } else {
        api.remaining.load(Ordering::SeqCst)
    };

    Json(json!({
        "rules_custom_installed": 0,
        "rules_installed": 100,
        "rules_not_installed": remaining,
        "rules_not_updated": 0,
        "timelines_installed": 10,
        "timelines_not_installed": 0,
        "timelines_not_updated": 0
    }))
}

async fn spawn_api(api: Arc<MockApi>) -> ApiConfig {
    let app = Router::new()
        .route("/api/detection_engine/rules/prepackaged", put(install))
        .route("/api/detection_engine/rules/prepackaged/_status", get(status))
        .with_state(api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = ApiConfig::new(format!("http://{}", addr));
    config.timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_get_status_parses_counters() {
    let api = MockApi::new(4);
    let client = RulesClient::new(&spawn_api(api.clone()).await).unwrap();

    let status = client.get_status(&CancellationToken::new()).await.unwrap();

    assert_eq!(status.rules_installed, Some(100));
    assert_eq!(status.rules_not_installed, Some(4));
    assert_eq!(status.classify(), PackageStatus::SomeNotInstalled);
    assert_eq!(api.status_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_install_then_poll_converges() {
    let api = MockApi::new(2);
    let client = Arc::new(RulesClient::new(&spawn_api(api.clone()).await).unwrap());
    let (notifier, mut notifications) = ChannelNotifier::new();

    let poller = ConvergencePoller::new(PollPolicy::new(10, Duration::from_millis(10)).unwrap())
        .with_notifier(Arc::new(notifier));
    let outcome = poller
        .start(client, ConvergenceRequest::counters_zero(PENDING_COUNTERS))
        .wait()
        .await;

    assert_eq!(outcome.phase, PollPhase::Converged);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(api.status_reads.load(Ordering::SeqCst), 3);
    assert!(api.installed.load(Ordering::SeqCst));

    let snapshot = outcome.last_snapshot.unwrap();
    assert_eq!(snapshot.get("rules_not_installed"), Some(0));
    assert_eq!(snapshot.get("rules_installed"), Some(100));

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.kind, NotificationKind::Success);
}

#[tokio::test]
async fn test_install_error_fails_session() {
    let api = MockApi::failing();
    let client = Arc::new(RulesClient::new(&spawn_api(api.clone()).await).unwrap());
    let (notifier, mut notifications) = ChannelNotifier::new();

    let poller = ConvergencePoller::new(PollPolicy::new(10, Duration::ZERO).unwrap())
        .with_notifier(Arc::new(notifier));
    let outcome = poller
        .start(client, ConvergenceRequest::counters_zero(PENDING_COUNTERS))
        .wait()
        .await;

    let failure = outcome.failure().expect("install should fail");
    assert_eq!(failure.stage, FailureStage::Trigger);
    assert!(failure.message.contains("500"), "message: {}", failure.message);
    assert_eq!(api.status_reads.load(Ordering::SeqCst), 0);

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.kind, NotificationKind::Failure);
}

#[tokio::test]
async fn test_trigger_install_reports_api_error_status() {
    let api = MockApi::failing();
    let client = RulesClient::new(&spawn_api(api).await).unwrap();

    let err = client
        .trigger_install(&CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClientError::ApiError { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("install failed"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_endpoint_is_api_error() {
    let api = MockApi::new(0);
    let mut config = spawn_api(api).await;
    config.status_path = "/does/not/exist".to_string();
    let client = RulesClient::new(&config).unwrap();

    let err = client
        .get_status(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ApiError { status: 404, .. }));
}
