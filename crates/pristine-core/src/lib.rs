//! Chat-session orchestration for the Pristine support widget.

mod client;
mod config;
mod error;
mod followups;
mod storage;
mod stream;
mod visitor_store;
pub mod view;
mod widget;

#[cfg(test)]
mod test_support;

pub use client::{ByteStream, ChatBackend, ChatClient, ClientOptions};
pub use config::{resolve, resolve_features};
pub use error::WidgetError;
pub use followups::{split_followups, AssistantReply};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use stream::{AssistantAccumulator, Phase, StreamDecoder, StreamRecord};
pub use visitor_store::{
    Clock, PersistedState, SystemClock, VisitorStore, HISTORY_KEY, INTERACTED_KEY,
    LAST_CONVERSATION_KEY, VISITOR_KEY,
};
pub use widget::{AutoOpen, AutoOpenAction, ChatWidget, PanelView, WidgetEvent, WidgetState};

/// Result type for widget operations.
pub type Result<T> = std::result::Result<T, WidgetError>;
