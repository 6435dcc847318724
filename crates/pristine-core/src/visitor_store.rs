//! Persistence of the visitor identity and conversation history.

use crate::{ChatBackend, KeyValueStore};
use pristine_types::{Message, Visitor};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Epoch milliseconds of the last message the visitor sent.
pub const LAST_CONVERSATION_KEY: &str = "lastConversationTime";
pub const HISTORY_KEY: &str = "pristine-chat-history";
pub const VISITOR_KEY: &str = "pristine-chat-visitor";
/// Set once the visitor has opened or used the widget.
pub const INTERACTED_KEY: &str = "pristine-chat-interacted";

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// What survived from a previous visit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub visitor: Option<Visitor>,
    pub messages: Vec<Message>,
    pub interacted: bool,
}

/// Reads and writes the widget's persisted keys.
///
/// Storage failures and corrupt values are logged and treated as absent state;
/// nothing here returns an error to the widget.
#[derive(Clone)]
pub struct VisitorStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl VisitorStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record now as the time of last activity.
    pub fn touch(&self) {
        self.write(LAST_CONVERSATION_KEY, &self.clock.now_ms().to_string());
    }

    pub fn last_activity(&self) -> Option<i64> {
        self.store
            .get(LAST_CONVERSATION_KEY)
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// True when the last activity is older than `timeout`.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        let Some(last) = self.last_activity() else {
            return false;
        };
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        self.clock.now_ms().saturating_sub(last) > timeout_ms
    }

    /// Load persisted state, discarding it if the session timed out.
    ///
    /// On expiry a persisted visitor's conversation is reset on the backend
    /// (best-effort) and every key is cleared.
    pub async fn load(&self, backend: &dyn ChatBackend, timeout: Duration) -> PersistedState {
        if self.is_expired(timeout) {
            info!(target: "pristine::store", "Session expired, clearing persisted state");
            if let Some(visitor) = self.read_visitor() {
                match backend.reset_conversation(&visitor.id).await {
                    Ok(resp) => {
                        debug!(target: "pristine::store", "Expired session reset (status: {})", resp.status);
                    }
                    Err(e) => {
                        warn!(target: "pristine::store", "Failed to reset expired session: {}", e);
                    }
                }
            }
            self.clear();
            return PersistedState::default();
        }

        let visitor = self.read_visitor();
        let messages = match &visitor {
            Some(v) if v.is_registered() => self.read_json::<Vec<Message>>(HISTORY_KEY).unwrap_or_default(),
            _ => Vec::new(),
        };

        PersistedState {
            visitor,
            messages,
            interacted: self.interacted(),
        }
    }

    /// Persist history, the interacted flag, and the visitor if there is one.
    pub fn save(&self, visitor: Option<&Visitor>, messages: &[Message]) {
        match serde_json::to_string(messages) {
            Ok(json) => self.write(HISTORY_KEY, &json),
            Err(e) => warn!(target: "pristine::store", "Failed to encode history: {}", e),
        }
        self.mark_interacted();
        if let Some(visitor) = visitor {
            match serde_json::to_string(visitor) {
                Ok(json) => self.write(VISITOR_KEY, &json),
                Err(e) => warn!(target: "pristine::store", "Failed to encode visitor: {}", e),
            }
        }
    }

    pub fn mark_interacted(&self) {
        self.write(INTERACTED_KEY, "true");
    }

    pub fn interacted(&self) -> bool {
        self.store.get(INTERACTED_KEY).is_some()
    }

    /// Remove every persisted key.
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!(target: "pristine::store", "Failed to clear storage: {}", e);
        }
    }

    fn read_visitor(&self) -> Option<Visitor> {
        self.read_json(VISITOR_KEY)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(target: "pristine::store", "Ignoring malformed '{}': {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(target: "pristine::store", "Failed to write '{}': {}", key, e);
        }
    }
}
