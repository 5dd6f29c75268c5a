//! Shared client state of one terminal
//!
//! Every screen holds a clone of [`ClientContext`]: the API, the query
//! cache, the notification channel and the session. Error reporting lives
//! here so that a 401 is handled the same way no matter which screen hit it.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast;

use crate::api::PosApi;
use crate::cache::{QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::http::NetworkHttpClient;
use crate::notify::{ClientEvent, Notifier};
use crate::polling::{PollHandle, PollSpec, Poller, RefreshFn};
use crate::session::Session;
use crate::{ClientError, ClientResult};

/// Shown once when a request comes back 401
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Session expired or authorization failed. Please log in again.";

#[derive(Debug, Clone)]
pub struct ClientContext {
    api: Arc<PosApi>,
    cache: Arc<QueryCache>,
    notifier: Notifier,
    session: Arc<Session>,
    focus: broadcast::Sender<()>,
    config: Arc<ClientConfig>,
}

impl ClientContext {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let session = Arc::new(Session::new(config.token.clone()));
        let http = NetworkHttpClient::new(&config, session.clone())?;
        let (focus, _) = broadcast::channel(8);

        tracing::info!(
            base_url = http.base_url(),
            authenticated = session.is_authenticated(),
            "Client context ready"
        );

        Ok(Self {
            api: Arc::new(PosApi::new(http)),
            cache: Arc::new(QueryCache::new()),
            notifier: Notifier::default(),
            session,
            focus,
            config: Arc::new(config),
        })
    }

    pub fn api(&self) -> &Arc<PosApi> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.notifier.subscribe()
    }

    /// The terminal window regained focus
    pub fn window_focused(&self) {
        let _ = self.focus.send(());
    }

    // ==================== Session ====================

    pub fn login(&self, token: impl Into<String>) {
        self.session.set_token(token);
        tracing::info!("Session token installed");
    }

    /// Drop the token and every cached query
    pub fn logout(&self) {
        self.session.clear();
        self.cache.remove_all();
        self.notifier.info("Logged out");
        self.notifier.auth_required();
    }

    /// Check for a token when a screen opens
    ///
    /// Without one the cache is cleared and the operator is sent to login.
    pub fn require_login(&self) -> bool {
        if self.session.is_authenticated() {
            return true;
        }
        self.cache.remove_all();
        self.notifier.info("Please log in");
        self.notifier.auth_required();
        false
    }

    /// Fail fast when no token is present
    pub fn ensure_session(&self) -> ClientResult<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::Unauthorized)
        }
    }

    /// Session loss: clear the token and caches and ask for a new login
    ///
    /// Only the call that actually removed the token does anything, so a
    /// burst of 401s from parallel polls produces a single notice.
    pub fn handle_auth_failure(&self) -> bool {
        if !self.session.clear() {
            tracing::debug!("Suppressed repeated authorization failure");
            return false;
        }
        self.cache.remove_all();
        self.notifier.error(SESSION_EXPIRED_MESSAGE);
        self.notifier.auth_required();
        true
    }

    /// Surface a failure to the operator as `"{context}: {message}"`
    pub fn report(&self, err: &ClientError, context: &str) {
        if err.is_unauthorized() {
            self.handle_auth_failure();
            return;
        }
        let code = err.code();
        tracing::error!(
            context,
            code = code.code(),
            category = code.category().name(),
            error = %err,
            "Request failed"
        );
        self.notifier
            .error(format!("{}: {}", context, err.user_message()));
    }

    // ==================== Queries ====================

    /// Fetch into the cache, reporting failures
    pub async fn refresh<T, F, Fut>(
        &self,
        key: &QueryKey,
        context: &str,
        fetch: F,
    ) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        match self.cache.fetch(key, fetch).await {
            Ok(value) => value,
            Err(e) => {
                self.report(&e, context);
                None
            }
        }
    }

    /// Spawn a poller that stores `fetch` results under `spec.key`
    ///
    /// Polling pauses while no session token is present.
    pub fn spawn_poller<T, F, Fut>(
        &self,
        spec: PollSpec,
        context: &'static str,
        fetch: F,
    ) -> PollHandle
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<PosApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        self.spawn_poller_with(spec, context, true, fetch)
    }

    /// Like [`spawn_poller`](Self::spawn_poller) but failures other than a
    /// lost session are only logged
    pub fn spawn_silent_poller<T, F, Fut>(
        &self,
        spec: PollSpec,
        context: &'static str,
        fetch: F,
    ) -> PollHandle
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<PosApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        self.spawn_poller_with(spec, context, false, fetch)
    }

    fn spawn_poller_with<T, F, Fut>(
        &self,
        spec: PollSpec,
        context: &'static str,
        notify: bool,
        fetch: F,
    ) -> PollHandle
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<PosApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        let ctx = self.clone();
        let key = spec.key.clone();
        let fetch = Arc::new(fetch);
        let refresh: RefreshFn = Arc::new(move || {
            let ctx = ctx.clone();
            let key = key.clone();
            let fetch = fetch.clone();
            async move {
                if !ctx.session.is_authenticated() {
                    return;
                }
                let api = ctx.api.clone();
                if notify {
                    ctx.refresh(&key, context, || fetch(api)).await;
                    return;
                }
                if let Err(e) = ctx.cache.fetch(&key, || fetch(api)).await {
                    if e.is_unauthorized() {
                        ctx.handle_auth_failure();
                    } else {
                        tracing::warn!(context, error = %e, "Background refresh failed");
                    }
                }
            }
            .boxed()
        });
        self.spawn_refresher(spec, refresh)
    }

    /// Spawn a poller around a refresh routine that stores its own results
    ///
    /// Used by sources whose cache key depends on screen state.
    pub fn spawn_refresher(&self, spec: PollSpec, refresh: RefreshFn) -> PollHandle {
        Poller::spawn(spec, self.cache.clone(), self.focus.subscribe(), refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeLevel;

    fn context(token: Option<&str>) -> ClientContext {
        let mut config = ClientConfig::new("http://127.0.0.1:9/api");
        config.token = token.map(str::to_string);
        ClientContext::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_auth_failure_clears_everything_once() {
        let ctx = context(Some("abc"));
        let mut rx = ctx.subscribe();
        let key = QueryKey::new(["orders", "ready"]);
        ctx.cache().set(&key, 1u8);

        ctx.report(&ClientError::Unauthorized, "Loading orders");
        ctx.report(&ClientError::Unauthorized, "Loading history");

        assert!(!ctx.session().is_authenticated());
        assert!(ctx.cache().get::<u8>(&key).is_none());

        match rx.try_recv().unwrap() {
            ClientEvent::Notice(n) => {
                assert_eq!(n.level, NoticeLevel::Error);
                assert_eq!(n.message, SESSION_EXPIRED_MESSAGE);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(rx.try_recv().unwrap(), ClientEvent::AuthRequired);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_report_prefixes_context() {
        let ctx = context(Some("abc"));
        let mut rx = ctx.subscribe();
        let err = ClientError::from_status(
            reqwest::StatusCode::CONFLICT,
            serde_json::json!({"detail": "Already paid"}),
        );
        ctx.report(&err, "Order #5");
        match rx.try_recv().unwrap() {
            ClientEvent::Notice(n) => assert_eq!(n.message, "Order #5: Already paid"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(ctx.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_require_login_without_token() {
        let ctx = context(None);
        let mut rx = ctx.subscribe();
        assert!(!ctx.require_login());
        assert!(ctx.ensure_session().unwrap_err().is_unauthorized());
        assert!(matches!(rx.try_recv().unwrap(), ClientEvent::Notice(_)));
        assert_eq!(rx.try_recv().unwrap(), ClientEvent::AuthRequired);

        ctx.login("fresh");
        assert!(ctx.require_login());
    }
}
