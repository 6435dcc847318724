//! REST client for the chat backend.

use crate::{Result, WidgetError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use pristine_types::{
    CallbackRequest, CallbackResponse, ChatRequest, ConfigOverlay, RegisterVisitorRequest,
    ResetRequest, ResetResponse, Role, StatusResponse, StoreMessageRequest, Visitor,
};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Raw body chunks of a streaming response.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Operations the widget needs from its backend.
///
/// Non-success statuses map to a conservative default where one exists;
/// transport failures surface as errors except where noted.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Tenant configuration. Never fails: any problem yields an empty overlay.
    async fn fetch_config(&self, tenant_id: Option<&str>) -> ConfigOverlay;

    async fn register_visitor(&self, request: &RegisterVisitorRequest) -> Result<Visitor>;

    async fn request_callback(&self, request: &CallbackRequest) -> Result<CallbackResponse>;

    /// Conversation logging. Failures are logged and swallowed.
    async fn store_conversation_message(&self, visitor_id: &str, sender: Role, message: &str);

    async fn reset_conversation(&self, visitor_id: &str) -> Result<ResetResponse>;

    async fn check_status(&self, visitor_id: &str) -> Result<StatusResponse>;

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Value>>;

    /// Send a chat message and return the reply body as it arrives.
    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// Tuning knobs for [`ChatClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Longest gap allowed between two chunks of a chat stream. `None` waits forever.
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            stream_idle_timeout: None,
        }
    }
}

/// [`ChatBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: Url,
    options: ClientOptions,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, ClientOptions::default())
    }

    pub fn with_options(base_url: &str, options: ClientOptions) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WidgetError::InvalidInput(format!("bad api base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(WidgetError::InvalidInput(format!(
                "api base url '{base_url}' cannot carry a path"
            )));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            options,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<B: serde::Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<Response> {
        let url = self.endpoint(segments);
        debug!(target: "pristine::client", "POST {}", url);
        Ok(self.http.post(url).json(body).send().await?)
    }

    async fn get(&self, segments: &[&str]) -> Result<Response> {
        let url = self.endpoint(segments);
        debug!(target: "pristine::client", "GET {}", url);
        Ok(self.http.get(url).send().await?)
    }
}

/// Parse a success body, or fall back to `default` on a non-success status.
async fn json_or<T: DeserializeOwned>(resp: Response, endpoint: &'static str, default: T) -> Result<T> {
    if !resp.status().is_success() {
        debug!(target: "pristine::client", "{} returned {}, using default", endpoint, resp.status());
        return Ok(default);
    }
    Ok(resp.json::<T>().await?)
}

/// Parse a success body, or fail on a non-success status.
async fn json_required<T: DeserializeOwned>(resp: Response, endpoint: &'static str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(WidgetError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }
    Ok(resp.json::<T>().await?)
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn fetch_config(&self, tenant_id: Option<&str>) -> ConfigOverlay {
        let mut request = self.http.get(self.endpoint(&["widget", "config"]));
        if let Some(tenant_id) = tenant_id {
            request = request.query(&[("tenantId", tenant_id)]);
        }

        let result = async {
            let resp = request.send().await?;
            json_required::<ConfigOverlay>(resp, "widget/config").await
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!(target: "pristine::config", "Failed to load remote config: {}", e);
            ConfigOverlay::default()
        })
    }

    async fn register_visitor(&self, request: &RegisterVisitorRequest) -> Result<Visitor> {
        let resp = self.post_json(&["visitor"], request).await?;
        json_required(resp, "visitor").await
    }

    async fn request_callback(&self, request: &CallbackRequest) -> Result<CallbackResponse> {
        let resp = self.post_json(&["visitor", "callback"], request).await?;
        json_required(resp, "visitor/callback").await
    }

    async fn store_conversation_message(&self, visitor_id: &str, sender: Role, message: &str) {
        let body = StoreMessageRequest {
            visitor_id: visitor_id.to_string(),
            sender,
            message: message.to_string(),
        };
        match self.post_json(&["chat", "store-conversation-message"], &body).await {
            Ok(resp) if !resp.status().is_success() => {
                warn!(
                    target: "pristine::client",
                    "Storing {} message returned {}",
                    sender.as_str(),
                    resp.status()
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(target: "pristine::client", "Failed to store conversation message: {}", e);
            }
        }
    }

    async fn reset_conversation(&self, visitor_id: &str) -> Result<ResetResponse> {
        let body = ResetRequest {
            visitor_id: visitor_id.to_string(),
        };
        let resp = self.post_json(&["chat", "reset"], &body).await?;
        json_or(resp, "chat/reset", ResetResponse::inactive()).await
    }

    async fn check_status(&self, visitor_id: &str) -> Result<StatusResponse> {
        let resp = self.get(&["chat", "status", visitor_id]).await?;
        json_or(resp, "chat/status", StatusResponse::inactive()).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Value>> {
        let resp = self.get(&["conversations", conversation_id, "messages"]).await?;
        json_or(resp, "conversations/messages", Vec::new()).await
    }

    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let resp = self.post_json(&["chat", "message"], request).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WidgetError::Status {
                endpoint: "chat/message",
                status: status.as_u16(),
            });
        }

        let body = Box::pin(resp.bytes_stream());
        let stream = match self.options.stream_idle_timeout {
            None => body
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(WidgetError::from))
                .boxed(),
            Some(idle) => futures::stream::unfold((body, false), move |(mut body, stalled)| async move {
                if stalled {
                    return None;
                }
                match tokio::time::timeout(idle, body.next()).await {
                    Ok(Some(chunk)) => Some((chunk.map(|b| b.to_vec()).map_err(WidgetError::from), (body, false))),
                    Ok(None) => None,
                    Err(_) => Some((Err(WidgetError::StreamIdle(idle)), (body, true))),
                }
            })
            .boxed(),
        };
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let client = ChatClient::new("https://example.com/api/agent/").unwrap();
        assert_eq!(
            client.endpoint(&["chat", "status", "v 1"]).as_str(),
            "https://example.com/api/agent/chat/status/v%201"
        );

        let client = ChatClient::new("https://example.com/api").unwrap();
        assert_eq!(
            client.endpoint(&["visitor"]).as_str(),
            "https://example.com/api/visitor"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            ChatClient::new("not a url"),
            Err(WidgetError::InvalidInput(_))
        ));
        assert!(matches!(
            ChatClient::new("mailto:support@example.com"),
            Err(WidgetError::InvalidInput(_))
        ));
    }
}
