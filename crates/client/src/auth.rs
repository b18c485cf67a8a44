//! Authenticated requests with single-flight token refresh.
//!
//! Every authenticated call goes through [`AuthClient::send`]. A 401 reply
//! triggers a refresh against `auth/refresh`; concurrent callers that hit a
//! 401 while that refresh runs attach to the same shared future instead of
//! starting their own, and each replays its request once with the new token.
//! A failed refresh tears the session down for everyone.

use futures::future::{BoxFuture, FutureExt, Shared};
use parkwatch_core::config::BackendConfig;
use parkwatch_core::constants::REFRESH_COOKIE_NAME;
use parkwatch_core::types::{QaItem, Registration, TokenResponse, User};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::sync::{watch, Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::session::{Session, SessionStore};
use crate::transport::{base_url, join_url, HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

type RefreshFuture = Shared<BoxFuture<'static, Result<String>>>;

/// Whether the client currently holds credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    LoggedIn,
    LoggedOut,
}

/// Reply of `auth/register`. Some deployments log the new user in directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// HTTP client for the parking backend.
///
/// Cheap to clone; clones share the session and the refresh slot.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

struct Inner {
    base: Url,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn SessionStore>,
    session: RwLock<Session>,
    /// Bumped on every login and logout, under the session write lock.
    epoch: AtomicU64,
    refresh: Mutex<Option<RefreshFuture>>,
    state: watch::Sender<AuthState>,
    qa_catalogue: OnceCell<Arc<Vec<QaItem>>>,
}

impl AuthClient {
    /// Create a client over `transport`, resuming whatever session `store` holds.
    pub fn new(
        api_base_url: &str,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let base = base_url(api_base_url)?;
        let session = store.load()?;
        let initial = if session.access_token.is_some() {
            AuthState::LoggedIn
        } else {
            AuthState::LoggedOut
        };
        let (state, _) = watch::channel(initial);

        Ok(Self {
            inner: Arc::new(Inner {
                base,
                transport,
                store,
                session: RwLock::new(session),
                epoch: AtomicU64::new(0),
                refresh: Mutex::new(None),
                state,
                qa_catalogue: OnceCell::new(),
            }),
        })
    }

    /// Create a client with a `reqwest` transport built from `config`.
    pub fn from_config(config: &BackendConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Self::new(&config.api_base_url, transport, store)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Access token currently held.
    pub fn access_token(&self) -> Option<String> {
        self.inner.current_session().access_token
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    /// Watch login / logout transitions, including the forced logout after a
    /// failed refresh.
    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Log in with username and password; stores the access token and the
    /// refresh cookie.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        let url = self.url("auth/login", &[])?;
        let request = HttpRequest::new(Method::Post, url)
            .json(json!({ "username": username, "password": password }));
        let response = self.inner.transport.send(request).await?.error_for_status()?;
        let tokens: TokenResponse = response.json()?;

        let refresh = response
            .cookie(REFRESH_COOKIE_NAME)
            .filter(|cookie| !cookie.is_empty());
        if refresh.is_none() {
            warn!("login reply carried no refresh cookie; the session cannot be refreshed");
        }
        self.inner
            .establish(Session::new(tokens.access_token.clone(), refresh))?;
        info!(username, "logged in");
        Ok(tokens)
    }

    /// Register a new account. Logs in when the reply carries a token.
    pub async fn register(&self, registration: &Registration) -> Result<RegisterResponse> {
        let url = self.url("auth/register", &[])?;
        let request = HttpRequest::new(Method::Post, url).json(serde_json::to_value(registration)?);
        let response = self.inner.transport.send(request).await?.error_for_status()?;
        let reply: RegisterResponse = response.json()?;

        if let Some(token) = &reply.access_token {
            let refresh = response
                .cookie(REFRESH_COOKIE_NAME)
                .filter(|cookie| !cookie.is_empty());
            self.inner.establish(Session::new(token.clone(), refresh))?;
            info!(username = %registration.username, "registered and logged in");
        } else {
            info!(username = %registration.username, "registered");
        }
        Ok(reply)
    }

    /// Log out. The server-side invalidation is best effort: its failure is
    /// logged and the local session is cleared regardless.
    pub async fn logout(&self) {
        let session = self.inner.current_session();
        match self.url("auth/logout", &[]) {
            Ok(url) => {
                let mut request = HttpRequest::new(Method::Post, url);
                if let Some(token) = session.access_token {
                    request = request.bearer(token);
                }
                if let Some(refresh) = session.refresh_token {
                    request = request.cookie(REFRESH_COOKIE_NAME, refresh);
                }
                match self.inner.transport.send(request).await {
                    Ok(response) if response.is_success() => debug!("server session invalidated"),
                    Ok(response) => warn!(
                        status = response.status,
                        "server-side logout failed: {}",
                        response.error_message()
                    ),
                    Err(e) => warn!("server-side logout failed: {}", e),
                }
            }
            Err(e) => warn!("server-side logout skipped: {}", e),
        }

        self.inner.clear_session();
        info!("logged out");
    }

    /// Current user. Accepts the user bare or wrapped in `user` / `data`.
    pub async fn me(&self) -> Result<User> {
        let reply: Value = self.get("auth/me", &[]).await?;
        crate::api::unwrap_key(reply, "user")
    }

    /// Authenticated call. Fails fast with [`ClientError::NotAuthenticated`]
    /// when no token is held. A 401 is answered by one (shared) token refresh
    /// and one replay; the replayed response is returned as is unless it is
    /// another 401.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        let url = self.url(path, query)?;
        let token = self.access_token().ok_or(ClientError::NotAuthenticated)?;

        let response = self.dispatch(method, &url, &token, body.clone()).await?;
        if response.status != 401 {
            return Ok(response);
        }

        debug!(%method, %url, "access token rejected, refreshing");
        let fresh = self.refreshed_token(&token).await?;
        let retried = self.dispatch(method, &url, &fresh, body).await?;
        if retried.status == 401 {
            return Err(ClientError::Unauthorized(retried.error_message()));
        }
        Ok(retried)
    }

    /// Authenticated call decoding a 2xx JSON body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T> {
        self.send(method, path, query, body)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.request(Method::Get, path, query, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        self.request(Method::Post, path, &[], Some(body)).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::Post, path, &[], None).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        self.request(Method::Put, path, &[], Some(body)).await
    }

    /// PUT without a body.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::Put, path, &[], None).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.request(Method::Delete, path, query, None).await
    }

    /// QA catalogue, fetched on first use and kept for the client's lifetime.
    /// A failed fetch is not cached.
    pub(crate) async fn qa_catalogue(&self) -> Result<Arc<Vec<QaItem>>> {
        self.inner
            .qa_catalogue
            .get_or_try_init(|| async {
                let items: Vec<QaItem> = crate::api::unwrap_data(self.get::<Value>("qa", &[]).await?)?;
                debug!(count = items.len(), "loaded QA catalogue");
                Ok(Arc::new(items))
            })
            .await
            .map(Arc::clone)
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        join_url(&self.inner.base, path, query)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(method, url.clone()).bearer(token);
        request.body = body;
        debug!(%method, %url, "request");
        let response = self.inner.transport.send(request).await?;
        debug!(%method, %url, status = response.status, "response");
        Ok(response)
    }

    /// Token to replay with after `stale` was rejected.
    ///
    /// Joins the in-flight refresh if there is one. If another caller already
    /// finished a refresh since `stale` was sent, the current token is used
    /// without refreshing again.
    async fn refreshed_token(&self, stale: &str) -> Result<String> {
        let mut slot = self.inner.refresh.lock().await;
        let refresh = match slot.as_ref() {
            Some(in_flight) => {
                debug!("joining in-flight token refresh");
                in_flight.clone()
            }
            None => {
                match self.access_token() {
                    Some(current) if current != stale => return Ok(current),
                    Some(_) => {}
                    None => {
                        return Err(ClientError::SessionExpired(
                            "session was cleared".to_string(),
                        ))
                    }
                }
                let refresh = run_refresh(Arc::clone(&self.inner));
                *slot = Some(refresh.clone());
                refresh
            }
        };
        drop(slot);
        refresh.await
    }
}

/// One refresh, shared by every caller that joins while it runs. Clears the
/// slot when done so the next 401 may start a new one.
///
/// A login or logout that lands while the refresh is in flight wins: the
/// refreshed token is dropped and the newer session is left alone.
fn run_refresh(inner: Arc<Inner>) -> RefreshFuture {
    async move {
        let epoch = inner.epoch.load(Ordering::SeqCst);
        let result = match inner.call_refresh(epoch).await {
            Ok(token) => {
                info!("access token refreshed");
                Ok(token)
            }
            Err(ClientError::SessionExpired(reason)) if inner.epoch.load(Ordering::SeqCst) != epoch => {
                debug!("discarding token refresh: {}", reason);
                Err(ClientError::SessionExpired(reason))
            }
            Err(e) => {
                warn!("token refresh failed, clearing session: {}", e);
                inner.clear_session_from(epoch);
                Err(ClientError::SessionExpired(e.to_string()))
            }
        };
        inner.refresh.lock().await.take();
        result
    }
    .boxed()
    .shared()
}

impl Inner {
    fn current_session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist a freshly issued session, then install it. A store failure
    /// leaves the previous session in place.
    fn establish(&self, session: Session) -> Result<()> {
        let mut current = self.write_session();
        self.store.save(&session)?;
        *current = session;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(AuthState::LoggedIn);
        Ok(())
    }

    fn clear_session(&self) {
        let mut current = self.write_session();
        self.clear_locked(&mut current);
    }

    /// Clear the session only if no login or logout happened since `epoch`.
    fn clear_session_from(&self, epoch: u64) {
        let mut current = self.write_session();
        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.clear_locked(&mut current);
        }
    }

    fn clear_locked(&self, current: &mut Session) {
        *current = Session::default();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.clear() {
            warn!("failed to clear stored session: {}", e);
        }
        self.state.send_replace(AuthState::LoggedOut);
    }

    async fn call_refresh(&self, epoch: u64) -> Result<String> {
        let refresh_token = self
            .current_session()
            .refresh_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ClientError::SessionExpired("no refresh credential held".to_string()))?;

        let url = join_url(&self.base, "auth/refresh", &[])?;
        let request =
            HttpRequest::new(Method::Post, url).cookie(REFRESH_COOKIE_NAME, refresh_token);
        let response = self.transport.send(request).await?.error_for_status()?;
        let tokens: TokenResponse = response.json()?;

        let mut session = self.write_session();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return Err(ClientError::SessionExpired(
                "session changed during token refresh".to_string(),
            ));
        }
        session.access_token = Some(tokens.access_token.clone());
        if let Some(rotated) = response.cookie(REFRESH_COOKIE_NAME) {
            session.refresh_token = (!rotated.is_empty()).then_some(rotated);
        }
        if let Err(e) = self.store.save(&session) {
            warn!("failed to persist refreshed session: {}", e);
        }
        self.state.send_replace(AuthState::LoggedIn);
        Ok(tokens.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        reply: HttpResponse,
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn request_without_token_is_not_sent() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            reply: HttpResponse::json_body(200, &json!([])),
        });
        let client = AuthClient::new(
            "http://localhost:1313/api/",
            transport.clone(),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();

        assert_eq!(client.auth_state(), AuthState::LoggedOut);
        let result: Result<Value> = client.get("parking/area", &[]).await;
        assert_eq!(result, Err(ClientError::NotAuthenticated));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_stores_token_and_refresh_cookie() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            reply: HttpResponse::json_body(
                200,
                &json!({ "message": "Login successful", "accessToken": "acc-1" }),
            )
            .with_set_cookie("refreshToken=ref-1; Path=/; HttpOnly"),
        });
        let store = Arc::new(MemorySessionStore::new());
        let client =
            AuthClient::new("http://localhost:1313/api", transport, store.clone()).unwrap();
        let mut state = client.subscribe_state();

        let tokens = client.login("kim", "secret").await.unwrap();
        assert_eq!(tokens.access_token, "acc-1");
        assert_eq!(client.access_token().as_deref(), Some("acc-1"));
        assert_eq!(
            store.load().unwrap(),
            Session::new("acc-1", Some("ref-1".to_string()))
        );
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), AuthState::LoggedIn);
    }

    struct ReadOnlyStore;

    impl SessionStore for ReadOnlyStore {
        fn load(&self) -> Result<Session> {
            Ok(Session::default())
        }

        fn save(&self, _session: &Session) -> Result<()> {
            Err(ClientError::Storage("read-only file system".to_string()))
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn login_is_rolled_back_when_session_cannot_be_saved() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            reply: HttpResponse::json_body(
                200,
                &json!({ "message": "Login successful", "accessToken": "acc-1" }),
            )
            .with_set_cookie("refreshToken=ref-1; Path=/; HttpOnly"),
        });
        let client =
            AuthClient::new("http://localhost:1313/api", transport, Arc::new(ReadOnlyStore)).unwrap();

        let err = client.login("kim", "secret").await.unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
        assert!(!client.is_authenticated());
        assert_eq!(client.auth_state(), AuthState::LoggedOut);
    }

    #[tokio::test]
    async fn failed_login_surfaces_server_message() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            reply: HttpResponse::json_body(400, &json!({ "message": "Invalid credentials" })),
        });
        let client = AuthClient::new(
            "http://localhost:1313/api",
            transport,
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();

        let err = client.login("kim", "wrong").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Validation {
                status: 400,
                message: "Invalid credentials".to_string()
            }
        );
        assert!(!client.is_authenticated());
    }
}
