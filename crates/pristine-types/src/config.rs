//! Widget configuration.
//!
//! `WidgetConfig` is the fully-resolved configuration a widget runs with.
//! `ConfigOverlay` is a partial configuration (remote tenant config or
//! caller overrides) where every field is optional.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const DEFAULT_LAUNCHER_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="white" stroke-width="2"><path d="M21 15a2 2 0 0 1-2 2H7l-4 4V5a2 2 0 0 1 2-2h14a2 2 0 0 1 2 2z"></path></svg>"#;

/// Session timeout used when none is configured.
pub const DEFAULT_SESSION_TIMEOUT_HOURS: f64 = 1.0;

/// Color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Any theme name this build does not know about.
    #[serde(other)]
    Custom,
}

/// Screen corner the widget is anchored to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
}

impl Position {
    /// CSS class suffix used by the container and launcher.
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
        }
    }
}

/// Feature flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub enable_file_upload: bool,
    pub allowed_file_types: Vec<String>,
    #[serde(rename = "maxFileSizeMB")]
    pub max_file_size_mb: u32,
    pub enable_emoji: bool,
    pub enable_markdown: bool,
    pub enable_streaming: bool,
    pub enable_feedback: bool,
    pub enable_conversation_reset: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            enable_file_upload: false,
            allowed_file_types: vec!["jpg".into(), "png".into(), "pdf".into()],
            max_file_size_mb: 5,
            enable_emoji: true,
            enable_markdown: true,
            enable_streaming: true,
            enable_feedback: false,
            enable_conversation_reset: true,
        }
    }
}

/// Partial feature flags; absent keys fall through to the next source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturesOverlay {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enable_file_upload: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub allowed_file_types: Option<Vec<String>>,
    #[serde(rename = "maxFileSizeMB", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_file_size_mb: Option<u32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enable_emoji: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enable_markdown: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enable_streaming: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enable_feedback: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enable_conversation_reset: Option<bool>,
}

/// Fully-resolved widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub theme: Theme,
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub border_radius: String,
    pub font_family: String,
    pub position: Position,
    pub z_index: String,
    /// Inline SVG markup or an image URL.
    pub launcher_icon: String,
    pub launcher_text: String,
    pub header_title: String,
    pub header_subtitle: String,
    /// Seeded as the first assistant message of an empty conversation.
    pub welcome_message: String,
    pub typing_indicator: bool,
    pub typing_text: String,
    pub features: Features,
    /// Milliseconds before the widget opens itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_open_delay: Option<u64>,
    /// Hours of inactivity after which persisted state is discarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<f64>,
    /// Container width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_phone: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            tenant_id: None,
            theme: Theme::Light,
            primary_color: "#007bff".to_string(),
            secondary_color: "#6c757d".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#000000".to_string(),
            border_radius: "12px".to_string(),
            font_family: "Inter, system-ui, sans-serif".to_string(),
            position: Position::BottomRight,
            z_index: "9999".to_string(),
            launcher_icon: DEFAULT_LAUNCHER_ICON.to_string(),
            launcher_text: "Need assistance?".to_string(),
            header_title: "Support".to_string(),
            header_subtitle: "We are online".to_string(),
            welcome_message: "Hello! How can I help you?".to_string(),
            typing_indicator: true,
            typing_text: "Agent is typing...".to_string(),
            features: Features::default(),
            auto_open_delay: None,
            session_timeout: None,
            width: None,
            support_phone: None,
        }
    }
}

/// Overlay field parser that drops a malformed value instead of failing the
/// whole overlay.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!(target: "pristine::config", "Ignoring config value {}: {}", value, e);
            Ok(None)
        }
    }
}

/// Like [`lenient`], but also accepts numbers for CSS values such as `zIndex`.
fn lenient_css<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => {
            warn!(target: "pristine::config", "Ignoring config value {}: expected a string or number", other);
            Ok(None)
        }
    }
}

fn lenient_features<'de, D>(deserializer: D) -> Result<FeaturesOverlay, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

impl WidgetConfig {
    /// Inactivity window after which persisted state is stale.
    ///
    /// Unset, zero, negative or non-finite values fall back to one hour.
    pub fn session_timeout(&self) -> Duration {
        let hours = match self.session_timeout {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => DEFAULT_SESSION_TIMEOUT_HOURS,
        };
        Duration::try_from_secs_f64(hours * 60.0 * 60.0).unwrap_or_else(|_| {
            warn!(target: "pristine::config", "Session timeout of {} hours is out of range, never expiring", hours);
            Duration::MAX
        })
    }

    /// Delay before auto-opening, if one is configured.
    pub fn auto_open_delay(&self) -> Option<Duration> {
        self.auto_open_delay
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Partial widget configuration, as sent by the backend or supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverlay {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(deserialize_with = "lenient_css", skip_serializing_if = "Option::is_none")]
    pub z_index: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub launcher_icon: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub launcher_text: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_title: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_subtitle: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub typing_indicator: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub typing_text: Option<String>,
    #[serde(deserialize_with = "lenient_features")]
    pub features: FeaturesOverlay,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub auto_open_delay: Option<u64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<f64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub support_phone: Option<String>,
}
