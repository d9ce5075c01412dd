//! One terminal conversation: sign-in flow, catalog and the open entity.

use std::collections::BTreeMap;
use std::sync::Arc;

use colored::Colorize;
use mtchat_application::{
    AttributeRequest, AuthFlow, BestEffort, ChatHandoff, ContactOwner, DismissTimer,
    EntityCatalog, EntityDetail, PrimaryState, RETRY_DELAY, StatsService, TabKey,
};
use mtchat_core::api::EntityApi;
use mtchat_core::auth::AuthState;
use mtchat_core::chat::ChatLinks;
use mtchat_core::config::ClientConfig;
use mtchat_core::conversation::{MessageIdGenerator, StatusLog};
use mtchat_core::entity::{CreateEntityRequest, DynamicField, Entity, FieldType, SearchParams};
use mtchat_core::notice::{Notifier, Toast};
use mtchat_core::session::TokenStore;
use mtchat_core::{MtchatError, Result};
use mtchat_infrastructure::telemetry::{ACTIVITY_TARGET, ActivityEvent};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use crate::command::{COMMANDS, Command};
use crate::helper::CliHelper;
use crate::render;

pub type Repl = Editor<CliHelper, DefaultHistory>;

/// Prints toasts and records them as activity.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: Toast) {
        render::toast(&toast);
        tracing::info!(target: ACTIVITY_TARGET, "{}", toast);
    }
}

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    config: ClientConfig,
    api: Arc<dyn EntityApi>,
    auth: AuthFlow,
    catalog: EntityCatalog,
    handoff: ChatHandoff,
    stats: StatsService,
    best_effort: BestEffort,
    detail: Option<Arc<EntityDetail>>,
    banner: Option<DismissTimer>,
    status: StatusLog,
    ids: MessageIdGenerator,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn EntityApi>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let best_effort = BestEffort::new();
        let handoff = ChatHandoff::new(
            Arc::clone(&api),
            ChatLinks::new(config.chat_base_url.clone()),
            config.public_link(""),
        )
        .with_best_effort(best_effort.clone());
        Self {
            auth: AuthFlow::new(Arc::clone(&api), tokens, notifier),
            catalog: EntityCatalog::new(Arc::clone(&api), config.tenant_id.clone()),
            stats: StatsService::new(Arc::clone(&api)),
            handoff,
            best_effort,
            api,
            config,
            detail: None,
            banner: None,
            status: StatusLog::new(),
            ids: MessageIdGenerator::new(),
        }
    }

    /// Prompt reflecting the flow step.
    pub fn prompt(&self) -> String {
        match self.auth.state() {
            AuthState::EmailForm => "email> ".to_string(),
            AuthState::OtpForm => "code> ".to_string(),
            _ => match &self.detail {
                Some(detail) => format!("{}> ", detail.entity_id()),
                None => ">> ".to_string(),
            },
        }
    }

    pub async fn restore(&mut self) {
        let state = self.auth.restore().await;
        if state.is_signed_in() {
            let who = self.auth.user().and_then(|u| u.email.clone()).unwrap_or_default();
            render::info(format!("Signed in as {who}"));
        }
    }

    pub fn record_activity(&mut self, event: ActivityEvent) {
        self.status.push(event.message);
    }

    /// The gateway saw a 401: drop the session and reflect it in the open view.
    pub async fn on_session_expired(&mut self) {
        self.auth.handle_session_expired();
        self.restore().await;
        if let Some(detail) = self.detail.take() {
            detail.close();
            let id = detail.entity_id().to_string();
            self.open(&id).await;
        }
        render::info("Type /login to sign in again.");
    }

    fn require_signed_in(&self) -> Result<()> {
        if self.auth.state().is_signed_in() {
            Ok(())
        } else {
            Err(MtchatError::validation("Please /login first"))
        }
    }

    fn open_entity(&self) -> Result<Entity> {
        let detail = self
            .detail
            .as_ref()
            .ok_or_else(|| MtchatError::validation("Open an entity with /show <id> first"))?;
        match detail.primary() {
            PrimaryState::Ready(entity) => Ok(entity),
            _ => Err(MtchatError::validation("The open entity is not loaded")),
        }
    }

    pub async fn handle(&mut self, line: &str, rl: &mut Repl) -> Flow {
        let command = Command::parse(line);
        let id = self.ids.next_id();
        tracing::debug!("[Repl] {} {:?}", id, command);

        let result = match command {
            Command::Quit => return Flow::Quit,
            Command::Help => {
                for (name, about) in COMMANDS {
                    println!("  {:<12} {}", name.bright_cyan(), about.bright_black());
                }
                Ok(())
            }
            Command::Status => {
                render::status(&self.status);
                Ok(())
            }
            Command::Invalid(reason) => {
                render::info(reason);
                Ok(())
            }
            Command::Login => self.auth.start_sign_in().map(|_| {
                render::info("Enter your email address.");
            }),
            Command::Back => self.auth.back_to_email().map(|_| {
                render::info("Enter your email address.");
            }),
            Command::Cancel => {
                if !self.auth.state().is_signed_in() {
                    self.auth.cancel();
                }
                Ok(())
            }
            Command::Logout => self.logout().await,
            Command::Text(text) => self.text(&text).await,
            Command::List => self.list().await,
            Command::Create => self.create(rl).await,
            Command::Categories => self.categories().await,
            Command::Search(q) => self.search(q).await,
            Command::Show(id) => {
                self.open(&id).await;
                Ok(())
            }
            Command::Retry => self.retry().await,
            Command::Shared(token) => self.shared(&token).await,
            Command::Tab(tab) => self.tab(tab).await,
            Command::Contact => self.contact().await,
            Command::Request(attribute) => self.request(&attribute).await,
        };
        if let Err(e) = result {
            render::error(e);
        }
        Flow::Continue
    }

    // ========================================================================
    // Sign-in
    // ========================================================================

    async fn text(&mut self, text: &str) -> Result<()> {
        match self.auth.state() {
            AuthState::EmailForm => {
                // Failures were already shown as toasts.
                if self.auth.submit_email(text).await.is_ok() {
                    render::info("Enter the 6-digit code, or /back to change the email.");
                }
                Ok(())
            }
            AuthState::OtpForm => {
                if self.auth.submit_otp(text).await.is_ok() {
                    self.after_login().await;
                }
                Ok(())
            }
            _ => {
                render::info("Type /help for commands.");
                Ok(())
            }
        }
    }

    async fn after_login(&mut self) {
        tracing::info!(target: ACTIVITY_TARGET, "Signed in");
        if let Some(detail) = &self.detail {
            detail.on_login().settled().await;
            render::tab(TabKey::Statistics, &detail.tab(TabKey::Statistics));
        }
    }

    async fn logout(&mut self) -> Result<()> {
        self.auth.logout()?;
        if let Some(detail) = self.detail.take() {
            detail.close();
        }
        self.stats.clear().await;
        tracing::info!(target: ACTIVITY_TARGET, "Signed out");
        render::info("Signed out.");
        Ok(())
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    async fn list(&mut self) -> Result<()> {
        self.require_signed_in()?;
        if self.auth.state() == AuthState::Authenticated {
            self.auth.open_listing()?;
        }
        let result = self.catalog.list_with_images().await;
        if self.auth.state() == AuthState::Listing {
            self.auth.finish()?;
        }
        render::entities("Your entities", &result?);
        Ok(())
    }

    async fn categories(&self) -> Result<()> {
        render::categories(&self.catalog.categories().await?);
        Ok(())
    }

    async fn search(&self, q: String) -> Result<()> {
        let params = SearchParams {
            q: Some(q).filter(|q| !q.is_empty()),
            ..SearchParams::default()
        };
        render::entities("Results", &self.catalog.search(&params).await?);
        Ok(())
    }

    async fn shared(&self, token: &str) -> Result<()> {
        render::entity(&self.catalog.shared(token).await?);
        Ok(())
    }

    async fn create(&mut self, rl: &mut Repl) -> Result<()> {
        self.require_signed_in()?;
        if self.auth.state() != AuthState::Authenticated {
            return Err(MtchatError::validation("Finish the current step first"));
        }
        self.auth.open_creating()?;
        let result = self.create_form(rl).await;
        self.auth.finish()?;
        match result? {
            Some(entity) => {
                tracing::info!(target: ACTIVITY_TARGET, "Created {}", entity.title());
                render::entity(&entity);
            }
            None => render::info("Creation cancelled."),
        }
        Ok(())
    }

    /// Prompts for every field; `None` when the user interrupts.
    async fn create_form(&self, rl: &mut Repl) -> Result<Option<Entity>> {
        let categories = self.catalog.categories().await?;
        if categories.is_empty() {
            return Err(MtchatError::validation("No categories available"));
        }
        render::categories(&categories);

        let Some(choice) = ask(rl, "category #> ") else {
            return Ok(None);
        };
        let category = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| categories.get(i))
            .ok_or_else(|| MtchatError::validation("Please pick a listed category"))?;

        let Some(name) = ask(rl, "name> ") else {
            return Ok(None);
        };
        let Some(description) = ask(rl, "description> ") else {
            return Ok(None);
        };

        let mut inputs = BTreeMap::new();
        for field in DynamicField::for_category(category) {
            let Some(value) = ask(rl, &field_prompt(&field)) else {
                return Ok(None);
            };
            inputs.insert(field.key.clone(), value);
        }
        let public = ask(rl, "share publicly? [y/N]> ")
            .is_some_and(|a| matches!(a.trim(), "y" | "Y" | "yes"));

        let request = CreateEntityRequest {
            name,
            entity_type: category.name.clone(),
            description,
            attributes: BTreeMap::new(),
            public_shareable: public,
            tenant_id: None,
        };
        self.catalog
            .create_in_category(request, category, &inputs)
            .await
            .map(Some)
    }

    // ========================================================================
    // Entity detail
    // ========================================================================

    async fn open(&mut self, id: &str) {
        if let Some(previous) = self.detail.take() {
            previous.close();
        }
        let detail = Arc::new(
            EntityDetail::new(id, Arc::clone(&self.api))
                .with_stats(self.stats.clone())
                .with_best_effort(self.best_effort.clone())
                .with_viewer_authenticated(self.auth.state().is_signed_in()),
        );
        self.detail = Some(Arc::clone(&detail));

        let loaded = detail.load().await;
        Self::show_loaded(&detail, loaded).await;
    }

    async fn show_loaded(detail: &Arc<EntityDetail>, loaded: Result<Entity>) {
        match loaded {
            Ok(entity) => {
                render::entity(&entity);
                detail.activate_tab(TabKey::OtherEntities).settled().await;
                render::tab(TabKey::OtherEntities, &detail.tab(TabKey::OtherEntities));
            }
            Err(e) if e.is_not_found_or_missing() => render::error("Entity not found"),
            Err(e) => {
                render::error(e);
                if detail.can_retry() {
                    render::info("Type /retry to try again.");
                }
            }
        }
    }

    async fn retry(&mut self) -> Result<()> {
        let detail = self
            .detail
            .clone()
            .ok_or_else(|| MtchatError::validation("Open an entity with /show <id> first"))?;
        if matches!(detail.primary(), PrimaryState::Ready(_)) {
            render::info("The entity is already loaded.");
            return Ok(());
        }
        render::info(format!("Retrying in {}s...", RETRY_DELAY.as_secs()));
        let loaded = detail.retry().await;
        if let Err(e) = &loaded {
            if e.is_validation() {
                return loaded.map(|_| ());
            }
        }
        Self::show_loaded(&detail, loaded).await;
        Ok(())
    }

    async fn tab(&self, tab: TabKey) -> Result<()> {
        let detail = self
            .detail
            .as_ref()
            .ok_or_else(|| MtchatError::validation("Open an entity with /show <id> first"))?;
        detail.activate_tab(tab).settled().await;
        render::tab(tab, &detail.tab(tab));
        Ok(())
    }

    fn requester_name(&self) -> Option<String> {
        self.auth
            .user()
            .and_then(|u| u.name.clone().or_else(|| u.email.clone()))
            .or_else(|| self.auth.email().map(str::to_string))
    }

    async fn contact(&mut self) -> Result<()> {
        self.require_signed_in()?;
        let entity = self.open_entity()?;
        let request = ContactOwner {
            entity_name: entity.title(),
            owner_id: entity.owner_id.clone().unwrap_or_default(),
            entity_id: entity.id,
        };
        let handoff = self
            .handoff
            .contact_owner(&request, self.requester_name().as_deref())
            .await?;

        println!("{}", "The owner has been notified.".bright_green());
        println!("  {} {}", "chat:".bright_black(), handoff.chat_url.underline());
        println!(
            "  {} {}",
            "loader:".bright_black(),
            self.config.public_link(&handoff.loader_path).underline()
        );
        if let Some(banner) = self.banner.take() {
            banner.dismiss();
        }
        self.banner = Some(DismissTimer::banner(|| {
            tracing::info!(target: ACTIVITY_TARGET, "Chat banner closed");
        }));
        Ok(())
    }

    async fn request(&self, attribute: &str) -> Result<()> {
        self.require_signed_in()?;
        let entity = self.open_entity()?;
        if !entity.requestable_attributes().contains(&attribute) {
            return Err(MtchatError::validation(format!(
                "'{attribute}' is not a missing attribute of this entity"
            )));
        }
        let request = AttributeRequest {
            entity_id: entity.id.clone(),
            attribute_name: attribute.to_string(),
            owner_email: entity.owner_id.clone().unwrap_or_default(),
            entity_name: entity.title(),
        };
        self.handoff.request_attribute(&request).await?;
        println!("{}", "Request sent to the owner.".bright_green());
        Ok(())
    }
}

fn field_prompt(field: &DynamicField) -> String {
    let required = if field.required { "*" } else { "" };
    match field.field_type {
        FieldType::Select if !field.options.is_empty() => {
            format!("{}{} ({})> ", field.label, required, field.options.join("/"))
        }
        FieldType::Boolean => format!("{}{} [y/n]> ", field.label, required),
        _ => format!("{}{}> ", field.label, required),
    }
}

/// One prompt of a form; `None` on Ctrl-C or Ctrl-D.
fn ask(rl: &mut Repl, prompt: &str) -> Option<String> {
    match rl.readline(prompt) {
        Ok(line) => Some(line.trim().to_string()),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => None,
        Err(e) => {
            render::error(e);
            None
        }
    }
}
