//! Presentation layer.
//!
//! [`render`] turns widget state into a typed view tree; the host draws it
//! however it likes and reports user input back as [`UiAction`]s. Message
//! text is turned into sanitized HTML here so no host ever inserts raw
//! backend text.

use crate::widget::{PanelView, WidgetState};
use once_cell::sync::Lazy;
use pristine_types::{Role, WidgetConfig};
use pulldown_cmark::{Event, Options, Parser};
use regex::Regex;

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9+\-\s]{7,15}$").unwrap());
static SVG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<svg.*?>").unwrap());

pub const INVALID_EMAIL: &str = "Please enter a valid business email address.";
pub const INVALID_PHONE: &str = "Please enter a valid phone number.";

/// Events emitted by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Send(String),
    /// End the conversation. The host asks for confirmation first.
    Reset,
    Toggle,
    Open,
    Close,
    SelectFollowup(String),
    SubmitCallback(CallbackForm),
    SubmitEmail(EmailForm),
    /// Header button switching between chat and support options.
    ToggleSupportPanel,
    ToggleCallbackForm,
    ToggleSupportInfo,
}

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailForm {
    pub email: String,
    pub name: String,
}

impl EmailForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(INVALID_EMAIL);
        }
        Ok(())
    }
}

/// Callback request form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackForm {
    pub phone: String,
    pub message: String,
    pub name: Option<String>,
}

impl CallbackForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !PHONE_REGEX.is_match(&self.phone) {
            return Err(INVALID_PHONE);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub container: ContainerView,
    pub header: HeaderView,
    pub body: BodyView,
    pub launcher: LauncherView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerView {
    pub open: bool,
    /// e.g. `pos-bottom-right`
    pub position_class: String,
    /// Inline CSS custom properties for theming.
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub title: String,
    pub subtitle: String,
    pub background: String,
    pub show_reset: bool,
    pub support_panel_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyView {
    /// No visitor yet.
    EmailForm { loading: bool },
    SupportOptions { support_phone: Option<String> },
    Conversation(ConversationView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub messages: Vec<MessageView>,
    /// Typing indicator text while a reply is pending.
    pub typing: Option<String>,
    /// "Request Callback" / "Contact Customer" buttons.
    pub show_contact_actions: bool,
    pub callback_form_open: bool,
    pub support_info_open: bool,
    pub support_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub role: Role,
    /// Sanitized HTML.
    pub html: String,
    pub followups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconView {
    InlineSvg(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherView {
    pub icon: Option<IconView>,
    pub text: String,
    pub color: String,
    pub position_class: String,
    pub show_popup: bool,
}

/// Render message text to sanitized HTML.
pub fn render_message_html(content: &str, markdown: bool) -> String {
    let html = if markdown {
        let parser = Parser::new_ext(content, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES)
            .map(|event| match event {
                Event::SoftBreak => Event::HardBreak,
                other => other,
            });
        let mut out = String::with_capacity(content.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut out, parser);
        out
    } else {
        content.replace('\n', "<br>")
    };
    ammonia::clean(&html)
}

fn icon_view(icon: &str) -> Option<IconView> {
    let icon = icon.trim();
    if icon.is_empty() {
        None
    } else if SVG_REGEX.is_match(icon) {
        Some(IconView::InlineSvg(icon.to_string()))
    } else {
        Some(IconView::Image(icon.to_string()))
    }
}

fn container_style(config: &WidgetConfig) -> String {
    let mut style = format!(
        "--pc-primary: {}; --pc-bg: {}; --pc-text: {}; --pc-radius: {}; --pc-font: {}; --pc-z-index: {};",
        config.primary_color,
        config.background_color,
        config.text_color,
        config.border_radius,
        config.font_family,
        config.z_index,
    );
    if let Some(width) = config.width {
        style.push_str(&format!(" width: {width}px;"));
    }
    style
}

/// Render the whole widget.
pub fn render(state: &WidgetState, config: &WidgetConfig) -> WidgetView {
    let position_class = format!("pos-{}", config.position.as_str());

    let body = match (&state.visitor, state.panel) {
        (None, _) => BodyView::EmailForm {
            loading: state.loading,
        },
        (Some(_), PanelView::Support) => BodyView::SupportOptions {
            support_phone: config.support_phone.clone(),
        },
        (Some(_), PanelView::Chat) => {
            let markdown = config.features.enable_markdown;
            let messages = state
                .messages
                .iter()
                .map(|m| MessageView {
                    role: m.role,
                    html: render_message_html(&m.content, markdown),
                    followups: if m.role == Role::Assistant {
                        m.followups.clone()
                    } else {
                        Vec::new()
                    },
                })
                .collect();
            BodyView::Conversation(ConversationView {
                messages,
                typing: (state.is_typing && config.typing_indicator).then(|| config.typing_text.clone()),
                show_contact_actions: state.messages.iter().any(|m| m.role == Role::Assistant),
                callback_form_open: state.callback_form_open,
                support_info_open: state.support_info_open,
                support_phone: config.support_phone.clone(),
            })
        }
    };

    WidgetView {
        container: ContainerView {
            open: state.is_open,
            position_class: position_class.clone(),
            style: container_style(config),
        },
        header: HeaderView {
            title: config.header_title.clone(),
            subtitle: config.header_subtitle.clone(),
            background: config.primary_color.clone(),
            show_reset: config.features.enable_conversation_reset && state.visitor.is_some(),
            support_panel_open: state.panel == PanelView::Support,
        },
        body,
        launcher: LauncherView {
            icon: icon_view(&config.launcher_icon),
            text: config.launcher_text.clone(),
            color: config.primary_color.clone(),
            position_class,
            show_popup: state.show_auto_popup,
        },
    }
}
