use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mtchat_core::api::{EntityApi, EventLog, HistoryQuery};
use mtchat_core::entity::{Entity, SearchParams};
use mtchat_core::related::TIER_LIMIT;
use mtchat_core::stats::{event_type, parse_log_feed};
use mtchat_core::{MtchatError, Result};
use tokio::task::JoinHandle;

use super::tab::{TabData, TabKey, TabState};
use crate::best_effort::BestEffort;
use crate::related::RelatedEntitiesFinder;
use crate::stats_service::StatsService;

/// Retries allowed for a failed primary load before a load succeeds again.
pub const RETRY_ATTEMPTS: u32 = 3;
/// Pause before each retry.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// State of the primary entity.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryState {
    Loading,
    Ready(Entity),
    /// Renders the "entity not found" screen.
    NotFound,
    /// Renders the generic error screen with this message.
    Failed(String),
}

/// Outcome of [`EntityDetail::activate_tab`].
#[derive(Debug)]
pub enum Activation {
    /// A fetch was started; awaiting the handle waits for it to settle.
    Started(JoinHandle<()>),
    AlreadyLoaded,
    /// A fetch for this tab is still pending; nothing was queued.
    InFlight,
    /// Preconditions not met (viewer signed out, primary not loaded, view
    /// closed). The tab stays unfetched.
    Skipped,
}

impl Activation {
    pub fn is_started(&self) -> bool {
        matches!(self, Activation::Started(_))
    }

    /// Waits for a started fetch; no-op for the other outcomes.
    pub async fn settled(self) {
        if let Activation::Started(handle) = self {
            if let Err(e) = handle.await {
                tracing::error!("[EntityDetail] Tab task panicked: {}", e);
            }
        }
    }
}

#[derive(Debug)]
struct DetailState {
    primary: PrimaryState,
    viewer_authenticated: bool,
    tabs: HashMap<TabKey, TabState>,
    /// Bumped on invalidation so results of superseded fetches are ignored.
    generations: HashMap<TabKey, u64>,
    retries: u32,
}

/// Entity detail view: primary entity plus lazily loaded tabs.
///
/// Each tab is fetched at most once per view unless invalidated, with at
/// most one fetch in flight. After [`EntityDetail::close`] late results are
/// discarded.
pub struct EntityDetail {
    entity_id: String,
    api: Arc<dyn EntityApi>,
    related: RelatedEntitiesFinder,
    stats: StatsService,
    best_effort: BestEffort,
    state: Mutex<DetailState>,
    alive: AtomicBool,
}

impl EntityDetail {
    pub fn new(entity_id: impl Into<String>, api: Arc<dyn EntityApi>) -> Self {
        Self {
            entity_id: entity_id.into(),
            related: RelatedEntitiesFinder::new(Arc::clone(&api)),
            stats: StatsService::new(Arc::clone(&api)),
            api,
            best_effort: BestEffort::new(),
            state: Mutex::new(DetailState {
                primary: PrimaryState::Loading,
                viewer_authenticated: false,
                tabs: HashMap::new(),
                generations: HashMap::new(),
                retries: 0,
            }),
            alive: AtomicBool::new(true),
        }
    }

    /// Shares a statistics cache with other views.
    pub fn with_stats(mut self, stats: StatsService) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_best_effort(mut self, best_effort: BestEffort) -> Self {
        self.best_effort = best_effort;
        self
    }

    pub fn with_viewer_authenticated(self, authenticated: bool) -> Self {
        self.lock().viewer_authenticated = authenticated;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn primary(&self) -> PrimaryState {
        self.lock().primary.clone()
    }

    pub fn tab(&self, tab: TabKey) -> TabState {
        self.lock().tabs.get(&tab).cloned().unwrap_or_default()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn best_effort(&self) -> &BestEffort {
        &self.best_effort
    }

    /// Fetches the primary entity and its images.
    ///
    /// Image failures leave the image list empty. A best-effort
    /// `entity_view` event is logged once the entity is known.
    pub async fn load(&self) -> Result<Entity> {
        self.lock().primary = PrimaryState::Loading;

        let mut entity = match self.api.get_entity(&self.entity_id).await {
            Ok(entity) => entity,
            Err(e) => {
                tracing::warn!("[EntityDetail] Failed to load {}: {}", self.entity_id, e);
                if self.is_alive() {
                    self.lock().primary = if e.is_not_found_or_missing() {
                        PrimaryState::NotFound
                    } else {
                        PrimaryState::Failed(e.to_string())
                    };
                }
                return Err(e);
            }
        };
        entity.images = self
            .api
            .entity_images(&self.entity_id)
            .await
            .unwrap_or_default();

        if !self.is_alive() {
            return Err(MtchatError::internal("entity view closed"));
        }
        {
            let mut state = self.lock();
            state.primary = PrimaryState::Ready(entity.clone());
            state.retries = 0;
        }

        let event = EventLog::new(
            event_type::ENTITY_VIEW,
            format!("Viewed entity: {}", entity.title()),
        )
        .link(format!("/entities/{}", entity.id))
        .payload("entityId", entity.id.as_str());
        let api = Arc::clone(&self.api);
        self.best_effort.spawn("entity_view log", async move {
            api.log_interaction(&event).await
        });

        Ok(entity)
    }

    pub fn can_retry(&self) -> bool {
        self.lock().retries < RETRY_ATTEMPTS
    }

    /// Loads the primary entity again after [`RETRY_DELAY`].
    ///
    /// Fails with a validation error, without touching the network, once
    /// [`RETRY_ATTEMPTS`] retries were used. A successful load restores the
    /// allowance.
    pub async fn retry(&self) -> Result<Entity> {
        {
            let mut state = self.lock();
            if state.retries >= RETRY_ATTEMPTS {
                return Err(MtchatError::validation(format!(
                    "Gave up after {RETRY_ATTEMPTS} retries"
                )));
            }
            state.retries += 1;
            tracing::info!(
                "[EntityDetail] Retrying {} ({}/{})",
                self.entity_id,
                state.retries,
                RETRY_ATTEMPTS
            );
        }
        tokio::time::sleep(RETRY_DELAY).await;
        self.load().await
    }

    /// Starts the tab's fetch unless it already ran or is running.
    pub fn activate_tab(self: &Arc<Self>, tab: TabKey) -> Activation {
        let mut state = self.lock();
        if !self.is_alive() {
            return Activation::Skipped;
        }
        if tab.requires_auth() && !state.viewer_authenticated {
            tracing::debug!("[EntityDetail] {} needs a signed-in viewer", tab);
            return Activation::Skipped;
        }
        let primary = match &state.primary {
            PrimaryState::Ready(entity) => Some(entity.clone()),
            _ => None,
        };
        if tab.needs_primary() && primary.is_none() {
            return Activation::Skipped;
        }

        let generation = state.generations.get(&tab).copied().unwrap_or(0);
        let entry = state.tabs.entry(tab).or_default();
        if entry.loading {
            return Activation::InFlight;
        }
        if entry.fetched_once {
            return Activation::AlreadyLoaded;
        }
        entry.loading = true;
        drop(state);

        let this = Arc::clone(self);
        Activation::Started(tokio::spawn(async move {
            let data = this.fetch(tab, primary).await;
            this.complete(tab, generation, data);
        }))
    }

    fn complete(&self, tab: TabKey, generation: u64, data: TabData) {
        let mut state = self.lock();
        if state.generations.get(&tab).copied().unwrap_or(0) != generation {
            tracing::debug!("[EntityDetail] Dropping superseded {} result", tab);
            return;
        }
        let entry = state.tabs.entry(tab).or_default();
        entry.loading = false;
        if !self.is_alive() {
            tracing::debug!("[EntityDetail] Dropping {} result after close", tab);
            return;
        }
        entry.data = Some(data);
        entry.fetched_once = true;
    }

    async fn fetch(&self, tab: TabKey, primary: Option<Entity>) -> TabData {
        match tab {
            TabKey::OtherEntities => {
                let Some(owner_id) = primary.as_ref().and_then(|e| e.owner_id.clone()) else {
                    return TabData::Entities(Vec::new());
                };
                let params = SearchParams::new()
                    .owner_id(owner_id)
                    .exclude_id(&self.entity_id)
                    .limit(TIER_LIMIT);
                match self.api.search(&params).await {
                    Ok(list) => TabData::Entities(list.entities),
                    Err(e) => {
                        tracing::warn!("[EntityDetail] Owner entities failed: {}", e);
                        TabData::Entities(Vec::new())
                    }
                }
            }
            TabKey::RelatedEntities => match primary {
                Some(entity) => TabData::Entities(self.related.find(&entity).await),
                None => TabData::Entities(Vec::new()),
            },
            TabKey::Statistics => TabData::Stats(self.stats.load(&self.entity_id).await),
            TabKey::Announcements => {
                match self
                    .api
                    .notification_history(&HistoryQuery::for_entity(&self.entity_id))
                    .await
                {
                    Ok(page) => TabData::Announcements(parse_log_feed(page)),
                    Err(e) => {
                        tracing::warn!("[EntityDetail] Announcements failed: {}", e);
                        TabData::Announcements(Vec::new())
                    }
                }
            }
        }
    }

    /// Marks the viewer signed in, invalidates the viewer-only tabs and
    /// refetches statistics.
    pub fn on_login(self: &Arc<Self>) -> Activation {
        {
            let mut state = self.lock();
            state.viewer_authenticated = true;
            for tab in TabKey::all().filter(|t| t.requires_auth()) {
                state.tabs.remove(&tab);
                *state.generations.entry(tab).or_insert(0) += 1;
            }
        }
        self.activate_tab(TabKey::Statistics)
    }

    /// Ends the view; pending results are discarded when they arrive.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
