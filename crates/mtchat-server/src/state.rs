//! Shared server state.

use std::sync::Arc;

use mtchat_application::StatsCache;
use mtchat_core::Result;
use mtchat_core::api::EntityApi;
use mtchat_core::chat::ChatLinks;
use mtchat_core::config::ClientConfig;
use mtchat_core::notice::{Notifier, SessionExpiryHandler, Toast};
use mtchat_core::session::TokenStore;
use mtchat_infrastructure::storage::{CookiePolicy, MemoryTokenStore};
use mtchat_infrastructure::{ApiGateway, RemoteEntityApi};

/// Upstream rejected a browser session; the gateway already queued the
/// cookie clear, so there is nothing left to do but record it.
struct LogExpiry;

impl SessionExpiryHandler for LogExpiry {
    fn on_session_expired(&self) {
        tracing::info!("[Session] Upstream rejected session, clearing cookie");
    }
}

/// Notices produced by flows running inside a request go to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        tracing::debug!("[Session] {}", toast);
    }
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<ClientConfig>,
    gateway: ApiGateway,
    cookie_policy: CookiePolicy,
    links: ChatLinks,
    stats: StatsCache,
}

impl AppState {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let gateway = ApiGateway::new(
            &config,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(LogExpiry),
        )?;
        let cookie_policy = CookiePolicy {
            secure: config.environment.is_production(),
        };
        let links = ChatLinks::new(config.chat_base_url.clone());
        tracing::info!(
            "[Server] Proxying to {} ({})",
            gateway.base_url(),
            config.environment
        );
        Ok(Self {
            config: Arc::new(config),
            gateway,
            cookie_policy,
            links,
            stats: StatsCache::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        self.cookie_policy
    }

    pub fn links(&self) -> &ChatLinks {
        &self.links
    }

    /// Statistics cache shared by every request.
    pub fn stats_cache(&self) -> &StatsCache {
        &self.stats
    }

    pub fn api_base_url(&self) -> &str {
        self.gateway.base_url()
    }

    /// Remote API bound to one request's session.
    pub fn api_for(&self, tokens: Arc<dyn TokenStore>) -> Arc<dyn EntityApi> {
        Arc::new(RemoteEntityApi::new(
            self.gateway.for_session(tokens, Arc::new(LogExpiry)),
            self.config.tenant_id.clone(),
        ))
    }
}
