//! BoardClient against a local leaderboard stub.
//!
//! The stub answers `/timestamp` with a token the test controls and
//! `/verify/{id}/{key}` with `"true"` for one known pair.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use board_sync::BoardClient;
use board_sync::ReloadCoordinator;
use board_sync::SortState;
use board_sync::SyncConfig;
use board_sync::backend::StorageBackend;
use board_sync::coordinator::Navigator;
use board_sync::error::TransportError;
use board_sync::identity::CachedIdentity;
use board_sync::identity::LoginLabel;
use board_sync::identity::resolve_login_label;
use board_sync::store::KeyValueStore;
use board_sync::store::MemoryStore;
use board_sync::tracker::SortSource;
use http_body_util::Full;
use hyper::Request;
use hyper::Response;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use url::Url;

struct Stub {
    token: Mutex<String>,
    status: Mutex<StatusCode>,
}

impl Stub {
    fn respond(&self, path: &str) -> (StatusCode, String) {
        let status = *self.status.lock().unwrap();
        if status != StatusCode::OK {
            return (status, "unavailable".into());
        }
        match path {
            "/timestamp" => (StatusCode::OK, self.token.lock().unwrap().clone()),
            "/verify/42/k3y" => (StatusCode::OK, "true".into()),
            p if p.starts_with("/verify/") => (StatusCode::OK, "false".into()),
            "/slow/timestamp" => (StatusCode::OK, "late".into()),
            _ => (StatusCode::NOT_FOUND, "not found".into()),
        }
    }
}

async fn serve() -> (Url, Arc<Stub>) {
    let stub = Arc::new(Stub {
        token: Mutex::new("2024/01/01%2010:00:00".into()),
        status: Mutex::new(StatusCode::OK),
    });

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shared = stub.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let stub = shared.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let stub = stub.clone();
                    async move {
                        if req.uri().path().starts_with("/slow/") {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                        let (status, body) = stub.respond(req.uri().path());
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header("Content-Type", "text/plain")
                                .body(Full::new(Bytes::from(body)))
                                .unwrap(),
                        )
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (Url::parse(&format!("http://{}", addr)).unwrap(), stub)
}

fn client(url: Url) -> BoardClient {
    BoardClient::builder()
        .url(url)
        .timeout(Duration::from_millis(900))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_timestamp_is_decoded() {
    let (url, _stub) = serve().await;
    let token = client(url).timestamp().await.unwrap();
    assert_eq!(token.as_str(), "2024/01/01 10:00:00");
}

#[tokio::test]
async fn test_timestamp_keeps_reserved_escapes() {
    let (url, stub) = serve().await;
    *stub.token.lock().unwrap() = "round%2F3%20final".into();
    let token = client(url).timestamp().await.unwrap();
    assert_eq!(token.as_str(), "round%2F3 final");
}

#[tokio::test]
async fn test_non_200_is_http_error() {
    let (url, stub) = serve().await;
    *stub.status.lock().unwrap() = StatusCode::SERVICE_UNAVAILABLE;

    let err = client(url).timestamp().await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_timeout() {
    let (url, _stub) = serve().await;
    let client = BoardClient::builder()
        .url(url.join("slow/").unwrap())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = client.timestamp().await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout(_)));
}

#[tokio::test]
async fn test_verify() {
    let (url, _stub) = serve().await;
    let client = client(url);
    assert!(client.verify_user("42", "k3y").await.unwrap());
    assert!(!client.verify_user("42", "wrong").await.unwrap());
}

#[tokio::test]
async fn test_login_label_over_http() {
    let (url, _stub) = serve().await;
    let client = client(url);
    let store = MemoryStore::new();

    assert_eq!(resolve_login_label(&store, &client).await, LoginLabel::LoggedOut);

    CachedIdentity::new("42", "k3y", "山田").save(&store).await.unwrap();
    assert_eq!(
        resolve_login_label(&store, &client).await.to_string(),
        "山田 さんのユーザページ"
    );

    CachedIdentity::new("42", "stale", "山田").save(&store).await.unwrap();
    assert_eq!(resolve_login_label(&store, &client).await, LoginLabel::LoggedOut);
}

#[tokio::test]
async fn test_unreachable_server_is_logged_out() {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(Url::parse(&format!("http://{}", addr)).unwrap());
    let store = MemoryStore::new();
    CachedIdentity::new("42", "k3y", "山田").save(&store).await.unwrap();

    assert_eq!(resolve_login_label(&store, &client).await, LoginLabel::LoggedOut);
    assert!(client.timestamp().await.is_err());
}

struct Unsorted;

impl SortSource for Unsorted {
    fn active_sort(&self) -> Option<SortState> {
        None
    }
}

struct Recorder(Mutex<Vec<Url>>, Url);

impl Navigator for Recorder {
    fn location(&self) -> Url {
        self.1.clone()
    }

    fn navigate(&self, target: Url) {
        self.0.lock().unwrap().push(target);
    }
}

#[tokio::test]
async fn test_poller_reloads_on_server_change() {
    let (url, stub) = serve().await;
    let navigator = Arc::new(Recorder(Mutex::new(Vec::new()), url.join("board").unwrap()));

    let store = Arc::new(MemoryStore::new());
    store.set("autoreload", "1").await.unwrap();

    let config = SyncConfig::new(5)
        .with_poll_interval(Duration::from_millis(200))
        .with_request_timeout(Duration::from_millis(180));
    let coordinator = Arc::new(ReloadCoordinator::new(
        config.clone(),
        Arc::new(StorageBackend::new(store, config.storage_keys.clone())),
        Arc::new(Unsorted),
        navigator.clone(),
    ));
    assert!(coordinator.restore_on_load().await.auto_reload);
    let poll = tokio::spawn(coordinator.clone().run_poller(Arc::new(client(url))));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(navigator.0.lock().unwrap().is_empty());
    assert!(coordinator.poll_state().has_baseline());

    *stub.token.lock().unwrap() = "2024/01/01%2010:05:00".into();
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .expect("poller should stop after reloading")
        .unwrap();

    assert_eq!(navigator.0.lock().unwrap().len(), 1);
    assert!(coordinator.is_reloading());
}
