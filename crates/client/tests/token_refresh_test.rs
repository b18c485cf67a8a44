use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parkwatch_client::{
    AuthClient, AuthState, ClientError, HttpRequest, HttpResponse, HttpTransport,
    MemorySessionStore, Method, Session, SessionStore,
};
use serde_json::{json, Value};

/// Backend double: accepts exactly one access token and mints `fresh` on refresh.
struct ScriptedBackend {
    valid_token: Mutex<String>,
    refresh_succeeds: bool,
    /// Reject even the refreshed token.
    always_unauthorized: bool,
    refresh_calls: AtomicUsize,
    requests: AtomicUsize,
    accepted_tokens: Mutex<Vec<String>>,
    refresh_cookies: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(refresh_succeeds: bool) -> Self {
        Self {
            valid_token: Mutex::new("fresh".to_string()),
            refresh_succeeds,
            always_unauthorized: false,
            refresh_calls: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            accepted_tokens: Mutex::new(Vec::new()),
            refresh_cookies: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedBackend {
    async fn send(&self, request: HttpRequest) -> parkwatch_client::Result<HttpResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match request.url.path() {
            "/api/auth/refresh" => {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                if let Some((_, value)) = request.cookies.iter().find(|(k, _)| k == "refreshToken") {
                    self.refresh_cookies.lock().unwrap().push(value.clone());
                }
                // Keep the refresh in flight long enough for every caller to pile up.
                tokio::time::sleep(Duration::from_millis(50)).await;
                if self.refresh_succeeds {
                    Ok(HttpResponse::json_body(
                        200,
                        &json!({ "message": "Token refreshed", "accessToken": "fresh" }),
                    )
                    .with_set_cookie("refreshToken=rotated; Path=/; HttpOnly"))
                } else {
                    Ok(HttpResponse::json_body(
                        401,
                        &json!({ "message": "Refresh token expired" }),
                    ))
                }
            }
            "/api/auth/logout" => Err(ClientError::Network("connection reset".to_string())),
            _ => {
                let valid = self.valid_token.lock().unwrap().clone();
                match request.bearer {
                    Some(token) if token == valid && !self.always_unauthorized => {
                        self.accepted_tokens.lock().unwrap().push(token);
                        Ok(HttpResponse::json_body(200, &json!([{ "_id": "a1", "name": "Lot A" }])))
                    }
                    _ => Ok(HttpResponse::json_body(401, &json!({ "message": "Token expired" }))),
                }
            }
        }
    }
}

fn client_with(
    backend: Arc<ScriptedBackend>,
    session: Session,
) -> (AuthClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::with_session(session));
    let client = AuthClient::new("http://localhost:1313/api/", backend, store.clone()).unwrap();
    (client, store)
}

fn stale_session() -> Session {
    Session::new("stale", Some("refresh-1".to_string()))
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let backend = Arc::new(ScriptedBackend::new(true));
    let (client, store) = client_with(backend.clone(), stale_session());

    let calls = (0..5).map(|_| {
        let client = client.clone();
        async move { client.get::<Value>("parking/area", &[]).await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()), "{:?}", results);
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*backend.refresh_cookies.lock().unwrap(), vec!["refresh-1"]);

    let accepted = backend.accepted_tokens.lock().unwrap().clone();
    assert_eq!(accepted.len(), 5);
    assert!(accepted.iter().all(|t| t == "fresh"));

    assert_eq!(client.access_token().as_deref(), Some("fresh"));
    assert_eq!(
        store.load().unwrap(),
        Session::new("fresh", Some("rotated".to_string()))
    );
    assert_eq!(client.auth_state(), AuthState::LoggedIn);
}

#[tokio::test]
async fn late_unauthorized_uses_already_refreshed_token() {
    let backend = Arc::new(ScriptedBackend::new(true));
    let (client, _) = client_with(backend.clone(), stale_session());

    client.get::<Value>("parking/area", &[]).await.unwrap();
    client.get::<Value>("parking/area", &[]).await.unwrap();

    // The second call went out with the fresh token directly.
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn failed_refresh_rejects_everyone_and_clears_session() {
    let backend = Arc::new(ScriptedBackend::new(false));
    let (client, store) = client_with(backend.clone(), stale_session());
    let mut state = client.subscribe_state();

    let calls = (0..4).map(|_| {
        let client = client.clone();
        async move { client.get::<Value>("parking/area", &[]).await }
    });
    let results = join_all(calls).await;

    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    for result in &results {
        assert!(
            matches!(result, Err(ClientError::SessionExpired(_))),
            "{:?}",
            result
        );
    }
    assert!(client.access_token().is_none());
    assert!(store.load().unwrap().is_empty());
    state.changed().await.unwrap();
    assert_eq!(*state.borrow(), AuthState::LoggedOut);

    // Next call fails fast without touching the network.
    let sent_before = backend.requests.load(Ordering::SeqCst);
    let next = client.get::<Value>("parking/area", &[]).await;
    assert_eq!(next, Err(ClientError::NotAuthenticated));
    assert_eq!(backend.requests.load(Ordering::SeqCst), sent_before);
}

#[tokio::test]
async fn unauthorized_retry_is_not_refreshed_again() {
    let mut backend = ScriptedBackend::new(true);
    backend.always_unauthorized = true;
    let backend = Arc::new(backend);
    let (client, _) = client_with(backend.clone(), stale_session());

    let result = client.get::<Value>("parking/area", &[]).await;
    assert!(matches!(result, Err(ClientError::Unauthorized(_))));
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    // Original request, refresh, one replay.
    assert_eq!(backend.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn refresh_without_cookie_expires_session_without_network_call() {
    let backend = Arc::new(ScriptedBackend::new(true));
    let (client, _) = client_with(backend.clone(), Session::new("stale", None));

    let result = client.get::<Value>("parking/area", &[]).await;
    assert!(matches!(result, Err(ClientError::SessionExpired(_))));
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(client.auth_state(), AuthState::LoggedOut);
}

#[tokio::test]
async fn logout_swallows_server_failure() {
    let backend = Arc::new(ScriptedBackend::new(true));
    let (client, store) = client_with(backend.clone(), Session::new("fresh", Some("r".into())));
    assert!(client.is_authenticated());

    client.logout().await;

    assert!(!client.is_authenticated());
    assert!(store.load().unwrap().is_empty());
    assert_eq!(client.auth_state(), AuthState::LoggedOut);
    let result = client
        .send(Method::Get, "parking/area", &[], None)
        .await;
    assert_eq!(result, Err(ClientError::NotAuthenticated));
}

#[tokio::test]
async fn logout_during_refresh_keeps_session_ended() {
    let backend = Arc::new(ScriptedBackend::new(true));
    let (client, store) = client_with(backend.clone(), stale_session());

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get::<Value>("parking/area", &[]).await }
    });
    // The refresh takes 50ms; log out while it is still running.
    tokio::time::sleep(Duration::from_millis(15)).await;
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    client.logout().await;

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(ClientError::SessionExpired(_))), "{:?}", result);
    assert!(client.access_token().is_none());
    assert!(store.load().unwrap().is_empty());
    assert_eq!(client.auth_state(), AuthState::LoggedOut);
    assert!(backend.accepted_tokens.lock().unwrap().is_empty());
}
