//! In-memory fakes shared by unit tests.

use crate::{ByteStream, ChatBackend, Clock, Result, WidgetError};
use async_trait::async_trait;
use futures::StreamExt;
use pristine_types::{
    CallbackRequest, CallbackResponse, ChatRequest, ConfigOverlay, RegisterVisitorRequest,
    ResetResponse, Role, StatusResponse, Visitor,
};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Clock that only moves when told to.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scripted backend that records every call.
pub struct FakeBackend {
    pub remote_config: Mutex<ConfigOverlay>,
    pub register_result: Mutex<std::result::Result<Visitor, u16>>,
    pub callback_result: Mutex<std::result::Result<CallbackResponse, u16>>,
    pub reset_result: Mutex<std::result::Result<ResetResponse, u16>>,
    /// Chunks of the next reply; `None` entries fail the stream at that point.
    pub stream_chunks: Mutex<Vec<Option<Vec<u8>>>>,
    pub stream_status: Mutex<Option<u16>>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            remote_config: Mutex::new(ConfigOverlay::default()),
            register_result: Mutex::new(Ok(test_visitor())),
            callback_result: Mutex::new(Ok(CallbackResponse::default())),
            reset_result: Mutex::new(Ok(ResetResponse {
                status: true,
                ..Default::default()
            })),
            stream_chunks: Mutex::new(Vec::new()),
            stream_status: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next reply as `data:` records, one chunk per record.
    pub fn reply_with(&self, deltas: &[&str]) {
        let mut chunks: Vec<Option<Vec<u8>>> = deltas
            .iter()
            .map(|d| {
                let payload = serde_json::json!({ "content": d });
                Some(format!("data: {payload}\n").into_bytes())
            })
            .collect();
        chunks.push(Some(b"data: [DONE]\n".to_vec()));
        *self.stream_chunks.lock().unwrap() = chunks;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn test_visitor() -> Visitor {
    Visitor {
        id: "v-1".to_string(),
        email: "ada@example.com".to_string(),
        name: Some("Ada".to_string()),
    }
}

fn status_error(endpoint: &'static str, status: u16) -> WidgetError {
    WidgetError::Status { endpoint, status }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn fetch_config(&self, tenant_id: Option<&str>) -> ConfigOverlay {
        self.record(format!("config:{}", tenant_id.unwrap_or("-")));
        self.remote_config.lock().unwrap().clone()
    }

    async fn register_visitor(&self, request: &RegisterVisitorRequest) -> Result<Visitor> {
        self.record(format!("register:{}", request.email));
        self.register_result
            .lock()
            .unwrap()
            .clone()
            .map_err(|s| status_error("visitor", s))
    }

    async fn request_callback(&self, request: &CallbackRequest) -> Result<CallbackResponse> {
        self.record(format!("callback:{}:{}", request.visitor_id, request.phone));
        self.callback_result
            .lock()
            .unwrap()
            .clone()
            .map_err(|s| status_error("visitor/callback", s))
    }

    async fn store_conversation_message(&self, visitor_id: &str, sender: Role, message: &str) {
        self.record(format!("store:{}:{}:{}", visitor_id, sender.as_str(), message));
    }

    async fn reset_conversation(&self, visitor_id: &str) -> Result<ResetResponse> {
        self.record(format!("reset:{visitor_id}"));
        self.reset_result
            .lock()
            .unwrap()
            .clone()
            .map_err(|s| status_error("chat/reset", s))
    }

    async fn check_status(&self, visitor_id: &str) -> Result<StatusResponse> {
        self.record(format!("status:{visitor_id}"));
        Ok(StatusResponse {
            active: true,
            ..Default::default()
        })
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Value>> {
        self.record(format!("messages:{conversation_id}"));
        Ok(vec![serde_json::json!({ "role": "user", "content": "earlier" })])
    }

    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.record(format!("chat:{}:{}", request.visitor_id, request.message));
        if let Some(status) = *self.stream_status.lock().unwrap() {
            return Err(status_error("chat/message", status));
        }
        let chunks = std::mem::take(&mut *self.stream_chunks.lock().unwrap());
        let items = chunks.into_iter().map(|chunk| {
            chunk.ok_or_else(|| WidgetError::StreamIdle(Duration::from_secs(1)))
        });
        Ok(futures::stream::iter(items).boxed())
    }
}
