//! The chat widget session.
//!
//! A [`ChatWidget`] is the handle a host gets back from initialization. It
//! owns the resolved configuration, the conversation state and the
//! persisted-state store, and drives the backend:
//!
//! - `init` resolves configuration (defaults < remote < overrides) and
//!   restores the previous visit unless it timed out
//! - `send` logs the visitor's message, streams the reply into a placeholder
//!   assistant message and splits off follow-up suggestions
//! - `reset` ends the conversation on the backend and starts over
//!
//! Every state change is broadcast as a [`WidgetEvent`] so the host can
//! re-render with [`ChatWidget::view`].

use crate::client::{ChatBackend, ChatClient};
use crate::config::resolve;
use crate::storage::KeyValueStore;
use crate::stream::{AssistantAccumulator, StreamDecoder, StreamRecord};
use crate::view::{self, CallbackForm, EmailForm, UiAction, WidgetView};
use crate::visitor_store::{Clock, PersistedState, SystemClock, VisitorStore};
use crate::{Result, WidgetError};
use futures::StreamExt;
use pristine_types::{
    CallbackRequest, ChatRequest, ConfigOverlay, Message, RegisterVisitorRequest, Role,
    StatusResponse, Visitor, WidgetConfig,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 256;
const AUTO_POPUP_DELAY: Duration = Duration::from_secs(4);

const SEND_FAILED: &str = "Failed to send message.";
const REGISTRATION_FAILED: &str = "Visitor registration failed";
const CALLBACK_FAILED: &str = "Error: Please try again later";
const RESET_FAILED: &str = "Error: Failed to reset chat. Try again later";
const RESET_REFUSED: &str = "Unable to end the conversation right now.";
const CALLBACK_CONFIRMED: &str =
    "Thanks your call back request is registered our team will call you. Thanks";

/// Which panel fills the body once a visitor exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelView {
    #[default]
    Chat,
    Support,
}

/// Everything the view renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetState {
    pub is_open: bool,
    pub messages: Vec<Message>,
    /// A reply is pending.
    pub is_typing: bool,
    pub visitor: Option<Visitor>,
    pub show_auto_popup: bool,
    pub panel: PanelView,
    /// Registration in flight.
    pub loading: bool,
    pub callback_form_open: bool,
    pub support_info_open: bool,
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// Re-render from [`ChatWidget::view`].
    StateChanged,
    /// Streaming progress on one message.
    MessageUpdated { index: usize, content: String },
    /// A user-facing error or status text.
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOpenAction {
    Open,
    ShowPopup,
}

/// A pending auto-open, to be fired after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoOpen {
    pub delay: Duration,
    pub action: AutoOpenAction,
}

/// Chat session handle owned by the embedding host.
pub struct ChatWidget {
    config: WidgetConfig,
    backend: Arc<dyn ChatBackend>,
    store: VisitorStore,
    state: WidgetState,
    events: broadcast::Sender<WidgetEvent>,
}

impl ChatWidget {
    /// Initialize against an HTTP backend, using the system clock.
    ///
    /// The client is rebuilt if the remote configuration moves the API base URL.
    pub async fn connect(overrides: ConfigOverlay, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let defaults = WidgetConfig::default();
        let initial = resolve(&defaults, &ConfigOverlay::default(), &overrides);
        let client = ChatClient::new(&initial.api_base_url)?;

        let remote = client.fetch_config(initial.tenant_id.as_deref()).await;
        let config = resolve(&defaults, &remote, &overrides);
        let client = if config.api_base_url == initial.api_base_url {
            client
        } else {
            info!(target: "pristine::widget", "Remote config moved API to {}", config.api_base_url);
            ChatClient::new(&config.api_base_url)?
        };

        Ok(Self::start(config, Arc::new(client), store, Arc::new(SystemClock)).await)
    }

    /// Initialize against any backend.
    pub async fn init(
        overrides: ConfigOverlay,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let defaults = WidgetConfig::default();
        let initial = resolve(&defaults, &ConfigOverlay::default(), &overrides);
        let remote = backend.fetch_config(initial.tenant_id.as_deref()).await;
        let config = resolve(&defaults, &remote, &overrides);
        Self::start(config, backend, store, clock).await
    }

    async fn start(
        config: WidgetConfig,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = VisitorStore::new(store, clock);
        let persisted = store.load(backend.as_ref(), config.session_timeout()).await;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let mut widget = Self {
            config,
            backend,
            store,
            state: WidgetState::default(),
            events,
        };
        widget.restore(persisted);
        info!(
            target: "pristine::widget",
            "Widget ready (visitor: {}, messages: {})",
            widget.state.visitor.is_some(),
            widget.state.messages.len()
        );
        widget
    }

    fn restore(&mut self, persisted: PersistedState) {
        if let Some(visitor) = persisted.visitor {
            if visitor.is_registered() {
                self.state.messages = persisted.messages;
                self.state.is_open = true;
            }
            self.state.visitor = Some(visitor);
        }
        if self.state.messages.is_empty() && !self.config.welcome_message.is_empty() {
            self.state
                .messages
                .push(Message::assistant(self.config.welcome_message.clone()));
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    pub fn view(&self) -> WidgetView {
        view::render(&self.state, &self.config)
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn notice(&self, text: impl Into<String>) {
        self.emit(WidgetEvent::Notice(text.into()));
    }

    fn save(&self) {
        self.store
            .save(self.state.visitor.as_ref(), &self.state.messages);
    }

    pub fn open(&mut self) {
        self.state.is_open = true;
        self.state.show_auto_popup = false;
        self.store.mark_interacted();
        self.emit(WidgetEvent::StateChanged);
    }

    pub fn close(&mut self) {
        self.state.is_open = false;
        self.emit(WidgetEvent::StateChanged);
    }

    pub fn toggle(&mut self) {
        if self.state.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Tear the widget down. Subscribers see their channel close.
    pub fn destroy(self) {
        debug!(target: "pristine::widget", "Widget destroyed");
    }

    /// The auto-open the host should schedule, if any.
    ///
    /// A configured delay opens the widget; otherwise a visitor who never
    /// interacted gets the launcher popup after a few seconds.
    pub fn auto_open(&self) -> Option<AutoOpen> {
        if let Some(delay) = self.config.auto_open_delay() {
            return Some(AutoOpen {
                delay,
                action: AutoOpenAction::Open,
            });
        }
        if !self.state.is_open && !self.store.interacted() {
            return Some(AutoOpen {
                delay: AUTO_POPUP_DELAY,
                action: AutoOpenAction::ShowPopup,
            });
        }
        None
    }

    /// Apply a scheduled auto-open unless the widget was opened meanwhile.
    pub fn fire_auto_open(&mut self, plan: AutoOpen) {
        if self.state.is_open {
            return;
        }
        match plan.action {
            AutoOpenAction::Open => self.open(),
            AutoOpenAction::ShowPopup => {
                self.state.show_auto_popup = true;
                self.emit(WidgetEvent::StateChanged);
            }
        }
    }

    /// Wait out the auto-open delay and fire it.
    pub async fn run_auto_open(&mut self) {
        if let Some(plan) = self.auto_open() {
            tokio::time::sleep(plan.delay).await;
            self.fire_auto_open(plan);
        }
    }

    /// Register the visitor from the email form.
    pub async fn register(&mut self, form: EmailForm) -> Result<()> {
        form.validate()
            .map_err(|msg| WidgetError::InvalidInput(msg.to_string()))?;

        self.state.loading = true;
        self.emit(WidgetEvent::StateChanged);

        let request = RegisterVisitorRequest {
            email: form.email.trim().to_string(),
            name: Some(form.name.trim().to_string()).filter(|n| !n.is_empty()),
        };
        let result = self.backend.register_visitor(&request).await;
        self.state.loading = false;

        match result {
            Ok(visitor) => {
                info!(target: "pristine::widget", "Registered visitor {}", visitor.id);
                self.state.visitor = Some(visitor);
                self.save();
                self.emit(WidgetEvent::StateChanged);
                Ok(())
            }
            Err(e) => {
                error!(target: "pristine::widget", "Visitor registration failed: {}", e);
                self.emit(WidgetEvent::StateChanged);
                self.notice(REGISTRATION_FAILED);
                Err(e)
            }
        }
    }

    /// Send a visitor message and stream the reply.
    ///
    /// Blank input is ignored. A failed reply is reported inline as a system
    /// message and also returned.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let visitor = self.state.visitor.clone().ok_or(WidgetError::NoVisitor)?;

        self.store.touch();
        self.backend
            .store_conversation_message(&visitor.id, Role::User, text)
            .await;
        self.state.messages.push(Message::user(text));
        self.save();
        self.state.is_typing = true;
        self.emit(WidgetEvent::StateChanged);

        let result = self.stream_reply(text, &visitor).await;
        if let Err(e) = &result {
            error!(target: "pristine::widget", "Reply stream failed: {}", e);
            self.state.messages.push(Message::system(SEND_FAILED));
        }

        self.state.is_typing = false;
        self.save();
        self.emit(WidgetEvent::StateChanged);
        result
    }

    async fn stream_reply(&mut self, text: &str, visitor: &Visitor) -> Result<()> {
        let request = ChatRequest {
            message: text.to_string(),
            email: visitor.email.clone(),
            visitor_id: visitor.id.clone(),
        };
        let mut body = self.backend.open_chat_stream(&request).await?;

        self.state.messages.push(Message::assistant(""));
        let index = self.state.messages.len() - 1;
        self.emit(WidgetEvent::StateChanged);

        let mut decoder = StreamDecoder::new();
        let mut acc = AssistantAccumulator::new();
        let mut done = false;

        while !done {
            let Some(chunk) = body.next().await else {
                break;
            };
            for line in decoder.push(&chunk?) {
                if self.apply_line(&line, index, &mut acc) {
                    done = true;
                    break;
                }
            }
        }
        if !done {
            if let Some(line) = decoder.finish() {
                self.apply_line(&line, index, &mut acc);
            }
        }

        let reply = acc.finish();
        debug!(
            target: "pristine::stream",
            "Reply complete ({} chars, {} follow-ups)",
            reply.message.len(),
            reply.followups.len()
        );
        let message = &mut self.state.messages[index];
        message.content = reply.message;
        message.followups = reply.followups;
        self.emit(WidgetEvent::MessageUpdated {
            index,
            content: self.state.messages[index].content.clone(),
        });

        self.backend
            .store_conversation_message(&visitor.id, Role::Assistant, acc.text())
            .await;
        self.save();
        Ok(())
    }

    /// Apply one stream line to the message at `index`. Returns true on `[DONE]`.
    fn apply_line(&mut self, line: &str, index: usize, acc: &mut AssistantAccumulator) -> bool {
        match StreamRecord::parse(line) {
            Some(StreamRecord::Done) => true,
            Some(StreamRecord::Delta(delta)) => {
                if let Some(display) = acc.push(&delta) {
                    self.state.messages[index].content = display.clone();
                    self.emit(WidgetEvent::MessageUpdated {
                        index,
                        content: display,
                    });
                }
                false
            }
            None => false,
        }
    }

    pub async fn select_followup(&mut self, followup: &str) -> Result<()> {
        self.send(followup).await
    }

    /// Ask the support team to call the visitor back.
    pub async fn request_callback(&mut self, form: CallbackForm) -> Result<()> {
        let visitor = self.state.visitor.clone().ok_or(WidgetError::NoVisitor)?;
        form.validate()
            .map_err(|msg| WidgetError::InvalidInput(msg.to_string()))?;

        let request = CallbackRequest {
            visitor_id: visitor.id,
            name: form.name.filter(|n| !n.trim().is_empty()),
            phone: form.phone.trim().to_string(),
            message: Some(form.message).filter(|m| !m.trim().is_empty()),
        };

        match self.backend.request_callback(&request).await {
            Ok(resp) => {
                let confirmation =
                    Message::assistant(resp.message.unwrap_or_else(|| CALLBACK_CONFIRMED.to_string()));
                match self.state.messages.last_mut() {
                    Some(last) => *last = confirmation,
                    None => self.state.messages.push(confirmation),
                }
                self.state.callback_form_open = false;
                self.save();
                self.emit(WidgetEvent::StateChanged);
                Ok(())
            }
            Err(e) => {
                error!(target: "pristine::widget", "Callback request failed: {}", e);
                self.notice(CALLBACK_FAILED);
                Err(e)
            }
        }
    }

    /// End the conversation and start over with a fresh, open widget.
    ///
    /// Without a visitor there is nothing to end. If the backend declines,
    /// its message is surfaced and the conversation is kept.
    pub async fn reset(&mut self) -> Result<()> {
        let Some(visitor_id) = self.state.visitor.as_ref().map(|v| v.id.clone()) else {
            return Ok(());
        };

        match self.backend.reset_conversation(&visitor_id).await {
            Ok(resp) if resp.status => {
                info!(target: "pristine::widget", "Conversation reset for {}", visitor_id);
                self.store.clear();
                self.state = WidgetState::default();
                self.restore(PersistedState::default());
                self.state.is_open = true;
                self.emit(WidgetEvent::StateChanged);
                Ok(())
            }
            Ok(resp) => {
                warn!(target: "pristine::widget", "Backend declined reset for {}", visitor_id);
                self.notice(resp.message.unwrap_or_else(|| RESET_REFUSED.to_string()));
                Ok(())
            }
            Err(e) => {
                error!(target: "pristine::widget", "Reset failed: {}", e);
                self.notice(RESET_FAILED);
                Err(e)
            }
        }
    }

    /// Conversation status for the current visitor.
    pub async fn status(&self) -> Result<StatusResponse> {
        let visitor = self.state.visitor.as_ref().ok_or(WidgetError::NoVisitor)?;
        self.backend.check_status(&visitor.id).await
    }

    /// Server-side message history of a conversation.
    pub async fn remote_history(&self, conversation_id: &str) -> Result<Vec<Value>> {
        self.backend.get_messages(conversation_id).await
    }

    /// Route a view action to the matching operation.
    pub async fn dispatch(&mut self, action: UiAction) -> Result<()> {
        match action {
            UiAction::Send(text) => return self.send(&text).await,
            UiAction::SelectFollowup(text) => return self.select_followup(&text).await,
            UiAction::Reset => return self.reset().await,
            UiAction::SubmitCallback(form) => return self.request_callback(form).await,
            UiAction::SubmitEmail(form) => return self.register(form).await,
            UiAction::Toggle => self.toggle(),
            UiAction::Open => self.open(),
            UiAction::Close => self.close(),
            UiAction::ToggleSupportPanel => {
                self.state.panel = match self.state.panel {
                    PanelView::Chat => PanelView::Support,
                    PanelView::Support => PanelView::Chat,
                };
                self.emit(WidgetEvent::StateChanged);
            }
            UiAction::ToggleCallbackForm => {
                self.state.callback_form_open = !self.state.callback_form_open;
                self.state.support_info_open = false;
                self.emit(WidgetEvent::StateChanged);
            }
            UiAction::ToggleSupportInfo => {
                self.state.support_info_open = !self.state.support_info_open;
                self.state.callback_form_open = false;
                self.emit(WidgetEvent::StateChanged);
            }
        }
        Ok(())
    }
}
