//! In-memory [`EntityApi`] for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mtchat_core::api::{
    ChatRequestNotice, CurrentUser, EmailMessage, EntityApi, EventLog, HistoryQuery,
    VerifyOtpResponse,
};
use mtchat_core::auth::OtpCode;
use mtchat_core::entity::{
    CategoryList, CreateEntityRequest, Entity, EntityImage, EntityList, SearchParams,
};
use mtchat_core::notice::{Notifier, Toast};
use mtchat_core::session::TokenStore;
use mtchat_core::stats::InteractionLogEntry;
use mtchat_core::{MtchatError, Result};
use serde_json::{Value, json};
use tokio::sync::Semaphore;

type SearchFn = Box<dyn Fn(&SearchParams) -> Result<EntityList> + Send + Sync>;

pub struct MockApi {
    pub entities: Mutex<HashMap<String, Entity>>,
    pub images: Mutex<HashMap<String, Vec<EntityImage>>>,
    pub logs: Mutex<Result<Vec<InteractionLogEntry>>>,
    pub history: Mutex<Result<Value>>,
    pub user: Mutex<Result<CurrentUser>>,
    pub token: Mutex<Result<VerifyOtpResponse>>,
    pub fail_notify: AtomicBool,
    pub fail_event_log: AtomicBool,
    search: Mutex<SearchFn>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
    searches: Mutex<Vec<SearchParams>>,
    events: Mutex<Vec<EventLog>>,
    notices: Mutex<Vec<ChatRequestNotice>>,
    emails: Mutex<Vec<EmailMessage>>,
    created: Mutex<Vec<CreateEntityRequest>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            entities: Mutex::default(),
            images: Mutex::default(),
            logs: Mutex::new(Ok(Vec::new())),
            history: Mutex::new(Ok(json!({"notifications": []}))),
            user: Mutex::new(Ok(CurrentUser {
                id: "u1".into(),
                email: Some("viewer@example.com".into()),
                name: Some("Viewer".into()),
            })),
            token: Mutex::new(Ok(VerifyOtpResponse {
                success: Some(true),
                token: Some("tok-1".into()),
                message: None,
            })),
            fail_notify: AtomicBool::new(false),
            fail_event_log: AtomicBool::new(false),
            search: Mutex::new(Box::new(|_| Ok(EntityList::default()))),
            gate: Mutex::new(None),
            calls: Mutex::default(),
            searches: Mutex::default(),
            events: Mutex::default(),
            notices: Mutex::default(),
            emails: Mutex::default(),
            created: Mutex::default(),
        }
    }
}

pub fn entity(value: Value) -> Entity {
    serde_json::from_value(value).unwrap()
}

pub fn list(entities: Vec<Entity>) -> EntityList {
    EntityList { entities }
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_entity(self: Arc<Self>, entity: Entity) -> Arc<Self> {
        self.entities
            .lock()
            .unwrap()
            .insert(entity.id.clone(), entity);
        self
    }

    pub fn on_search(&self, f: impl Fn(&SearchParams) -> Result<EntityList> + Send + Sync + 'static) {
        *self.search.lock().unwrap() = Box::new(f);
    }

    /// Blocks search and log calls until [`MockApi::open_gate`].
    pub fn close_gate(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn open_gate(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn searches(&self) -> Vec<SearchParams> {
        self.searches.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<EventLog> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<ChatRequestNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreateEntityRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityApi for MockApi {
    async fn send_otp(&self, _email: &str) -> Result<Value> {
        self.record("send_otp");
        Ok(json!({"success": true}))
    }

    async fn verify_otp(&self, _email: &str, _otp: &OtpCode) -> Result<VerifyOtpResponse> {
        self.record("verify_otp");
        self.token.lock().unwrap().clone()
    }

    async fn current_user(&self) -> Result<CurrentUser> {
        self.record("current_user");
        self.user.lock().unwrap().clone()
    }

    async fn my_entities(&self) -> Result<EntityList> {
        self.record("my_entities");
        let mut entities: Vec<Entity> = self.entities.lock().unwrap().values().cloned().collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list(entities))
    }

    async fn list_entities(&self) -> Result<EntityList> {
        self.record("list_entities");
        self.my_entities().await
    }

    async fn get_entity(&self, id: &str) -> Result<Entity> {
        self.record("get_entity");
        self.entities
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MtchatError::not_found("Entity", id))
    }

    async fn entity_images(&self, id: &str) -> Result<Vec<EntityImage>> {
        self.record("entity_images");
        self.images
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MtchatError::http(500, "Internal Server Error", "images down"))
    }

    async fn search(&self, params: &SearchParams) -> Result<EntityList> {
        self.record("search");
        self.searches.lock().unwrap().push(params.clone());
        self.wait_gate().await;
        (self.search.lock().unwrap())(params)
    }

    async fn create_entity(&self, request: &CreateEntityRequest) -> Result<Entity> {
        self.record("create_entity");
        self.created.lock().unwrap().push(request.clone());
        Ok(entity(json!({"id": "new-1", "name": request.name})))
    }

    async fn categories(&self) -> Result<CategoryList> {
        self.record("categories");
        Ok(CategoryList::default())
    }

    async fn interaction_logs(
        &self,
        _entity_id: Option<&str>,
        _limit: u32,
    ) -> Result<Vec<InteractionLogEntry>> {
        self.record("interaction_logs");
        self.wait_gate().await;
        self.logs.lock().unwrap().clone()
    }

    async fn log_interaction(&self, event: &EventLog) -> Result<Value> {
        self.record("log_interaction");
        self.events.lock().unwrap().push(event.clone());
        Ok(json!({"success": true}))
    }

    async fn notify_chat_request(&self, notice: &ChatRequestNotice) -> Result<Value> {
        self.record("notify_chat_request");
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(MtchatError::network("owner notification failed"));
        }
        self.notices.lock().unwrap().push(notice.clone());
        Ok(json!({"success": true}))
    }

    async fn send_notification(&self, event: &EventLog) -> Result<Value> {
        self.record("send_notification");
        if self.fail_event_log.load(Ordering::SeqCst) {
            return Err(MtchatError::http(500, "Internal Server Error", "log down"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(json!({"success": true}))
    }

    async fn notification_history(&self, _query: &HistoryQuery) -> Result<Value> {
        self.record("notification_history");
        self.history.lock().unwrap().clone()
    }

    async fn shared_entity(&self, token: &str) -> Result<Entity> {
        self.record("shared_entity");
        self.entities
            .lock()
            .unwrap()
            .values()
            .find(|e| e.share_token.as_deref() == Some(token))
            .cloned()
            .ok_or_else(|| MtchatError::not_found("Entity", token))
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<Value> {
        self.record("send_email");
        self.emails.lock().unwrap().push(email.clone());
        Ok(json!({"success": true}))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<Toast>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

#[derive(Default)]
pub struct MemoryTokens {
    token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokens {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn set_token(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self.token.lock().unwrap() = None;
    }
}
