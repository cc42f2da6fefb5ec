//! Background snippet service.
//!
//! Owns the authenticated relationship with the remote store from the
//! extension's always-running side: a TTL-bounded shortcut-list cache,
//! live single-snippet lookups, and the session fields in shared storage.
//! Runs as its own task and serves requests from content contexts over a
//! channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::api::{ApiOutcome, SnippetApi};
use super::protocol::{Request, Response};
use super::storage::{self, StorageArea};
use crate::error::{SnipflowError, SnipflowResult};

/// Configuration for the snippet service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Freshness window for the cached shortcut list.
    pub shortcut_ttl: Duration,

    /// Base URL used when storage has none recorded.
    pub default_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            shortcut_ttl: Duration::from_secs(5 * 60),
            default_base_url: "https://api.snipflow.app".to_string(),
        }
    }
}

/// A cached shortcut list and when it was fetched.
#[derive(Debug, Clone)]
struct ShortcutListCache {
    shortcuts: Vec<String>,
    fetched_at: Instant,
}

impl ShortcutListCache {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.fetched_at) <= ttl
    }
}

enum ServiceMessage {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Login {
        token: String,
        email: Option<String>,
        ack: oneshot::Sender<()>,
    },
    Logout {
        ack: oneshot::Sender<()>,
    },
    Refresh {
        ack: oneshot::Sender<Vec<String>>,
    },
}

/// Cloneable handle content contexts use to reach the service.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<ServiceMessage>,
}

impl ServiceHandle {
    /// Whether the owning service is gone. Advisory: the service can shut
    /// down between this check and a send.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Send one protocol request and await its reply.
    pub async fn request(&self, request: Request) -> SnipflowResult<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ServiceMessage::Request {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service is gone".to_string()))?;
        reply_rx
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service dropped the reply".to_string()))
    }

    /// Store a fresh session and warm the caches immediately.
    pub async fn login(&self, token: String, email: Option<String>) -> SnipflowResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(ServiceMessage::Login {
                token,
                email,
                ack: ack_tx,
            })
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service is gone".to_string()))?;
        ack_rx
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service dropped the reply".to_string()))
    }

    /// Clear the session and every cached shortcut.
    pub async fn logout(&self) -> SnipflowResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(ServiceMessage::Logout { ack: ack_tx })
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service is gone".to_string()))?;
        ack_rx
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service dropped the reply".to_string()))
    }

    /// Explicit refresh: refetch the shortcut and variable lists, persist
    /// them, and broadcast. Returns the fresh list (empty on failure).
    pub async fn refresh(&self) -> SnipflowResult<Vec<String>> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(ServiceMessage::Refresh { ack: ack_tx })
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service is gone".to_string()))?;
        ack_rx
            .await
            .map_err(|_| SnipflowError::Messaging("snippet service dropped the reply".to_string()))
    }
}

/// The background snippet service.
pub struct SnippetService {
    api: Arc<dyn SnippetApi>,
    storage: Arc<StorageArea>,
    config: ServiceConfig,
    shortcut_cache: Option<ShortcutListCache>,
}

impl SnippetService {
    pub fn new(api: Arc<dyn SnippetApi>, storage: Arc<StorageArea>, config: ServiceConfig) -> Self {
        Self {
            api,
            storage,
            config,
            shortcut_cache: None,
        }
    }

    /// Spawn the service loop; requests arrive through the returned
    /// handle. The loop exits when every handle is dropped.
    pub fn spawn(mut self) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ServiceMessage>(32);
        let task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    ServiceMessage::Request { request, reply } => {
                        let response = self.handle(request).await;
                        // The requesting context may be gone mid-flight.
                        let _ = reply.send(response);
                    }
                    ServiceMessage::Login { token, email, ack } => {
                        self.login(token, email).await;
                        let _ = ack.send(());
                    }
                    ServiceMessage::Logout { ack } => {
                        self.end_session();
                        let _ = ack.send(());
                    }
                    ServiceMessage::Refresh { ack } => {
                        let shortcuts = self.refresh_lists().await.unwrap_or_default();
                        let _ = ack.send(shortcuts);
                    }
                }
            }
        });
        (ServiceHandle { tx }, task)
    }

    async fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::ExpandShortcut { shortcut } => self.expand_shortcut(&shortcut).await,
            Request::GetShortcuts => Response::Shortcuts {
                shortcuts: self.get_shortcuts().await,
            },
            Request::GetStatus => self.status(),
        }
    }

    fn base_url(&self) -> String {
        self.storage
            .api_base_url()
            .unwrap_or_else(|| self.config.default_base_url.clone())
    }

    /// Single-snippet lookup. Always live, never served from the list
    /// cache; "not found" and every other non-success look the same to
    /// the caller.
    async fn expand_shortcut(&mut self, key: &str) -> Response {
        let Some(token) = self.storage.auth_token() else {
            return Response::NotLoggedIn;
        };
        match self.api.fetch_snippet(&self.base_url(), &token, key).await {
            Ok(ApiOutcome::Ok(snippet)) => Response::Snippet {
                name: snippet.name,
                content: snippet.content,
                html_content: snippet.html_content,
            },
            Ok(ApiOutcome::Unauthorized) => {
                self.end_session();
                Response::NotLoggedIn
            }
            Ok(ApiOutcome::NotFound) => Response::NotFound,
            Err(err) => {
                debug!("snippet fetch for {key} failed: {err}");
                Response::NotFound
            }
        }
    }

    /// Shortcut list, served from cache while it is inside the freshness
    /// window, refetched otherwise. Any failure yields the empty list.
    async fn get_shortcuts(&mut self) -> Vec<String> {
        if let Some(cache) = &self.shortcut_cache {
            if cache.is_fresh(self.config.shortcut_ttl, Instant::now()) {
                return cache.shortcuts.clone();
            }
        }
        self.refresh_lists().await.unwrap_or_default()
    }

    /// Refetch the shortcut and variable lists, cache the shortcuts, and
    /// persist everything as one atomic storage snapshot (which also
    /// broadcasts to open tabs).
    async fn refresh_lists(&mut self) -> Option<Vec<String>> {
        let token = self.storage.auth_token()?;
        let base = self.base_url();

        let shortcuts = match self.api.fetch_shortcuts(&base, &token).await {
            Ok(ApiOutcome::Ok(list)) => list,
            Ok(ApiOutcome::Unauthorized) => {
                self.end_session();
                return None;
            }
            Ok(ApiOutcome::NotFound) => return None,
            Err(err) => {
                warn!("shortcut list fetch failed: {err}");
                return None;
            }
        };
        let variables = match self.api.fetch_variables(&base, &token).await {
            Ok(ApiOutcome::Ok(list)) => list,
            Ok(ApiOutcome::Unauthorized) => {
                self.end_session();
                return None;
            }
            Ok(ApiOutcome::NotFound) => Vec::new(),
            Err(err) => {
                warn!("variable list fetch failed: {err}");
                Vec::new()
            }
        };

        self.shortcut_cache = Some(ShortcutListCache {
            shortcuts: shortcuts.clone(),
            fetched_at: Instant::now(),
        });
        let entries = vec![
            (storage::KEY_SHORTCUTS.to_string(), json!(shortcuts)),
            (
                storage::KEY_VARIABLES.to_string(),
                serde_json::to_value(&variables).unwrap_or(Value::Null),
            ),
            (
                storage::KEY_LAST_FETCH.to_string(),
                json!(chrono::Utc::now().timestamp_millis()),
            ),
        ];
        if let Err(err) = self.storage.set_many(entries) {
            warn!("failed to persist shortcut snapshot: {err}");
        }
        Some(shortcuts)
    }

    async fn login(&mut self, token: String, email: Option<String>) {
        let mut entries = vec![(storage::KEY_AUTH_TOKEN.to_string(), json!(token))];
        if let Some(email) = email {
            entries.push((storage::KEY_USER_EMAIL.to_string(), json!(email)));
        }
        if let Err(err) = self.storage.set_many(entries) {
            warn!("failed to store session: {err}");
        }
        self.shortcut_cache = None;
        self.refresh_lists().await;
    }

    /// A 401 anywhere means the session is over: clear the auth state and
    /// every cached shortcut so no caller sees stale data.
    fn end_session(&mut self) {
        self.shortcut_cache = None;
        if let Err(err) = self.storage.remove(&[
            storage::KEY_AUTH_TOKEN,
            storage::KEY_USER_EMAIL,
            storage::KEY_SHORTCUTS,
            storage::KEY_VARIABLES,
        ]) {
            warn!("failed to clear session state: {err}");
        }
    }

    fn status(&self) -> Response {
        Response::Status {
            logged_in: self.storage.auth_token().is_some(),
            shortcut_count: self.storage.shortcuts().len(),
            user_email: self.storage.user_email(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::{StaticVariable, VariableScope};
    use crate::service::api::RemoteSnippet;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeApi {
        shortcut_calls: AtomicUsize,
        snippet_calls: AtomicUsize,
        unauthorized: AtomicBool,
    }

    #[async_trait]
    impl SnippetApi for FakeApi {
        async fn fetch_snippet(
            &self,
            _base_url: &str,
            _token: &str,
            key: &str,
        ) -> SnipflowResult<ApiOutcome<RemoteSnippet>> {
            self.snippet_calls.fetch_add(1, Ordering::SeqCst);
            if self.unauthorized.load(Ordering::SeqCst) {
                return Ok(ApiOutcome::Unauthorized);
            }
            if key == "/sig" {
                Ok(ApiOutcome::Ok(RemoteSnippet {
                    name: "Signature".to_string(),
                    content: Some("Best, Jane".to_string()),
                    html_content: None,
                    shortcut: Some("/sig".to_string()),
                }))
            } else {
                Ok(ApiOutcome::NotFound)
            }
        }

        async fn fetch_shortcuts(
            &self,
            _base_url: &str,
            _token: &str,
        ) -> SnipflowResult<ApiOutcome<Vec<String>>> {
            self.shortcut_calls.fetch_add(1, Ordering::SeqCst);
            if self.unauthorized.load(Ordering::SeqCst) {
                return Ok(ApiOutcome::Unauthorized);
            }
            Ok(ApiOutcome::Ok(vec!["/sig".to_string(), "/addr".to_string()]))
        }

        async fn fetch_variables(
            &self,
            _base_url: &str,
            _token: &str,
        ) -> SnipflowResult<ApiOutcome<Vec<StaticVariable>>> {
            if self.unauthorized.load(Ordering::SeqCst) {
                return Ok(ApiOutcome::Unauthorized);
            }
            Ok(ApiOutcome::Ok(vec![StaticVariable {
                name: "team".to_string(),
                value: "Platform".to_string(),
                scope: VariableScope::Workspace,
                workspace_id: Some("ws-1".to_string()),
            }]))
        }
    }

    fn service_with(
        api: Arc<FakeApi>,
        ttl: Duration,
    ) -> (SnippetService, Arc<StorageArea>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageArea::open(dir.path().to_path_buf()));
        storage
            .set(storage::KEY_AUTH_TOKEN, json!("token-1"))
            .unwrap();
        let config = ServiceConfig {
            shortcut_ttl: ttl,
            ..ServiceConfig::default()
        };
        let service = SnippetService::new(api, storage.clone(), config);
        (service, storage, dir)
    }

    #[test]
    fn test_cache_freshness_window() {
        let ttl = Duration::from_secs(300);
        let fetched_at = Instant::now();
        let cache = ShortcutListCache {
            shortcuts: vec!["/sig".to_string()],
            fetched_at,
        };
        assert!(cache.is_fresh(ttl, fetched_at + ttl - Duration::from_secs(1)));
        assert!(!cache.is_fresh(ttl, fetched_at + ttl + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_fresh_cache_serves_without_refetch() {
        let api = Arc::new(FakeApi::default());
        let (mut service, _storage, _dir) = service_with(api.clone(), Duration::from_secs(3600));

        let first = service.get_shortcuts().await;
        let second = service.get_shortcuts().await;
        assert_eq!(first, second);
        assert_eq!(api.shortcut_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_refetch() {
        let api = Arc::new(FakeApi::default());
        let (mut service, _storage, _dir) = service_with(api.clone(), Duration::ZERO);

        service.get_shortcuts().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        service.get_shortcuts().await;
        assert_eq!(api.shortcut_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let api = Arc::new(FakeApi::default());
        let (service, storage, _dir) = service_with(api.clone(), Duration::from_secs(3600));
        let (handle, _task) = service.spawn();

        // Warm the cache while logged in.
        let response = handle.request(Request::GetShortcuts).await.unwrap();
        assert_eq!(
            response,
            Response::Shortcuts {
                shortcuts: vec!["/sig".to_string(), "/addr".to_string()]
            }
        );

        // Session expires server-side; the next live fetch sees a 401.
        api.unauthorized.store(true, Ordering::SeqCst);
        let response = handle
            .request(Request::ExpandShortcut {
                shortcut: "/sig".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response, Response::NotLoggedIn);

        let status = handle.request(Request::GetStatus).await.unwrap();
        assert_eq!(
            status,
            Response::Status {
                logged_in: false,
                shortcut_count: 0,
                user_email: None,
            }
        );
        assert_eq!(storage.auth_token(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_shortcut_fetch_clears_session() {
        let api = Arc::new(FakeApi::default());
        let (service, storage, _dir) = service_with(api.clone(), Duration::ZERO);
        let (handle, _task) = service.spawn();

        api.unauthorized.store(true, Ordering::SeqCst);
        let response = handle.request(Request::GetShortcuts).await.unwrap();
        assert_eq!(
            response,
            Response::Shortcuts {
                shortcuts: Vec::new()
            }
        );

        let status = handle.request(Request::GetStatus).await.unwrap();
        assert_eq!(
            status,
            Response::Status {
                logged_in: false,
                shortcut_count: 0,
                user_email: None,
            }
        );
        assert_eq!(storage.auth_token(), None);
    }

    #[tokio::test]
    async fn test_expand_maps_absent_snippet_to_not_found() {
        let api = Arc::new(FakeApi::default());
        let (service, _storage, _dir) = service_with(api, Duration::from_secs(3600));
        let (handle, _task) = service.spawn();

        let response = handle
            .request(Request::ExpandShortcut {
                shortcut: "/nope".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response, Response::NotFound);
    }

    #[tokio::test]
    async fn test_expand_without_session_is_not_logged_in() {
        let api = Arc::new(FakeApi::default());
        let (service, storage, _dir) = service_with(api.clone(), Duration::from_secs(3600));
        storage.remove(&[storage::KEY_AUTH_TOKEN]).unwrap();
        let (handle, _task) = service.spawn();

        let response = handle
            .request(Request::ExpandShortcut {
                shortcut: "/sig".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response, Response::NotLoggedIn);
        // Never hit the network without a token.
        assert_eq!(api.snippet_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_warms_caches_and_broadcasts() {
        let api = Arc::new(FakeApi::default());
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageArea::open(dir.path().to_path_buf()));
        let mut changes = storage.subscribe();
        let service = SnippetService::new(api, storage.clone(), ServiceConfig::default());
        let (handle, _task) = service.spawn();

        handle
            .login("token-2".to_string(), Some("jane@example.com".to_string()))
            .await
            .unwrap();

        // Session write, then the list snapshot.
        let first = changes.recv().await.unwrap();
        assert!(first.keys.contains(&storage::KEY_AUTH_TOKEN.to_string()));
        let second = changes.recv().await.unwrap();
        assert!(second.keys.contains(&storage::KEY_SHORTCUTS.to_string()));

        assert_eq!(storage.shortcuts().len(), 2);
        assert_eq!(storage.variables().len(), 1);

        let status = handle.request(Request::GetStatus).await.unwrap();
        assert_eq!(
            status,
            Response::Status {
                logged_in: true,
                shortcut_count: 2,
                user_email: Some("jane@example.com".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_returns_fresh_list() {
        let api = Arc::new(FakeApi::default());
        let (service, _storage, _dir) = service_with(api.clone(), Duration::from_secs(3600));
        let (handle, _task) = service.spawn();

        let shortcuts = handle.refresh().await.unwrap();
        assert_eq!(shortcuts, vec!["/sig".to_string(), "/addr".to_string()]);

        handle.logout().await.unwrap();
        let shortcuts = handle.refresh().await.unwrap();
        assert!(shortcuts.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_reply_is_a_messaging_error() {
        // A service that dies mid-request drops the reply channel; the
        // caller sees a messaging error, not a hang.
        let (tx, mut rx) = mpsc::channel::<ServiceMessage>(4);
        let handle = ServiceHandle { tx };
        tokio::spawn(async move {
            // Receive and drop the envelope without replying.
            let _ = rx.recv().await;
        });

        let result = handle.request(Request::GetStatus).await;
        assert!(matches!(result, Err(SnipflowError::Messaging(_))));
    }
}
