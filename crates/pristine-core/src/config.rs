//! Configuration resolution.
//!
//! Three sources are layered in increasing priority: built-in defaults, the
//! tenant configuration fetched from the backend, and the host's overrides.
//! Top-level fields are taken whole; `features` is merged key by key.

use pristine_types::{ConfigOverlay, Features, FeaturesOverlay, WidgetConfig};

fn pick<T: Clone>(overrides: &Option<T>, remote: &Option<T>, default: &T) -> T {
    overrides
        .as_ref()
        .or(remote.as_ref())
        .unwrap_or(default)
        .clone()
}

fn pick_opt<T: Clone>(overrides: &Option<T>, remote: &Option<T>, default: &Option<T>) -> Option<T> {
    overrides
        .as_ref()
        .or(remote.as_ref())
        .or(default.as_ref())
        .cloned()
}

/// Merge feature flags key by key: override > remote > default.
pub fn resolve_features(
    defaults: &Features,
    remote: &FeaturesOverlay,
    overrides: &FeaturesOverlay,
) -> Features {
    Features {
        enable_file_upload: pick(
            &overrides.enable_file_upload,
            &remote.enable_file_upload,
            &defaults.enable_file_upload,
        ),
        allowed_file_types: pick(
            &overrides.allowed_file_types,
            &remote.allowed_file_types,
            &defaults.allowed_file_types,
        ),
        max_file_size_mb: pick(
            &overrides.max_file_size_mb,
            &remote.max_file_size_mb,
            &defaults.max_file_size_mb,
        ),
        enable_emoji: pick(&overrides.enable_emoji, &remote.enable_emoji, &defaults.enable_emoji),
        enable_markdown: pick(
            &overrides.enable_markdown,
            &remote.enable_markdown,
            &defaults.enable_markdown,
        ),
        enable_streaming: pick(
            &overrides.enable_streaming,
            &remote.enable_streaming,
            &defaults.enable_streaming,
        ),
        enable_feedback: pick(
            &overrides.enable_feedback,
            &remote.enable_feedback,
            &defaults.enable_feedback,
        ),
        enable_conversation_reset: pick(
            &overrides.enable_conversation_reset,
            &remote.enable_conversation_reset,
            &defaults.enable_conversation_reset,
        ),
    }
}

/// Resolve the effective configuration: override > remote > default.
pub fn resolve(defaults: &WidgetConfig, remote: &ConfigOverlay, overrides: &ConfigOverlay) -> WidgetConfig {
    let (o, r, d) = (overrides, remote, defaults);
    WidgetConfig {
        api_base_url: pick(&o.api_base_url, &r.api_base_url, &d.api_base_url),
        tenant_id: pick_opt(&o.tenant_id, &r.tenant_id, &d.tenant_id),
        theme: pick(&o.theme, &r.theme, &d.theme),
        primary_color: pick(&o.primary_color, &r.primary_color, &d.primary_color),
        secondary_color: pick(&o.secondary_color, &r.secondary_color, &d.secondary_color),
        background_color: pick(&o.background_color, &r.background_color, &d.background_color),
        text_color: pick(&o.text_color, &r.text_color, &d.text_color),
        border_radius: pick(&o.border_radius, &r.border_radius, &d.border_radius),
        font_family: pick(&o.font_family, &r.font_family, &d.font_family),
        position: pick(&o.position, &r.position, &d.position),
        z_index: pick(&o.z_index, &r.z_index, &d.z_index),
        launcher_icon: pick(&o.launcher_icon, &r.launcher_icon, &d.launcher_icon),
        launcher_text: pick(&o.launcher_text, &r.launcher_text, &d.launcher_text),
        header_title: pick(&o.header_title, &r.header_title, &d.header_title),
        header_subtitle: pick(&o.header_subtitle, &r.header_subtitle, &d.header_subtitle),
        welcome_message: pick(&o.welcome_message, &r.welcome_message, &d.welcome_message),
        typing_indicator: pick(&o.typing_indicator, &r.typing_indicator, &d.typing_indicator),
        typing_text: pick(&o.typing_text, &r.typing_text, &d.typing_text),
        features: resolve_features(&d.features, &r.features, &o.features),
        auto_open_delay: pick_opt(&o.auto_open_delay, &r.auto_open_delay, &d.auto_open_delay),
        session_timeout: pick_opt(&o.session_timeout, &r.session_timeout, &d.session_timeout),
        width: pick_opt(&o.width, &r.width, &d.width),
        support_phone: pick_opt(&o.support_phone, &r.support_phone, &d.support_phone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pristine_types::Position;
    use proptest::prelude::*;

    #[test]
    fn test_empty_overlays_yield_defaults() {
        let defaults = WidgetConfig::default();
        let resolved = resolve(&defaults, &ConfigOverlay::default(), &ConfigOverlay::default());
        assert_eq!(resolved, defaults);
    }

    #[test]
    fn test_override_beats_remote_beats_default() {
        let defaults = WidgetConfig::default();
        let remote = ConfigOverlay {
            header_title: Some("Remote".into()),
            primary_color: Some("#111111".into()),
            ..Default::default()
        };
        let overrides = ConfigOverlay {
            header_title: Some("Host".into()),
            ..Default::default()
        };

        let resolved = resolve(&defaults, &remote, &overrides);
        assert_eq!(resolved.header_title, "Host");
        assert_eq!(resolved.primary_color, "#111111");
        assert_eq!(resolved.header_subtitle, defaults.header_subtitle);
    }

    #[test]
    fn test_features_merge_per_key() {
        let defaults = WidgetConfig::default();
        let remote = ConfigOverlay {
            features: FeaturesOverlay {
                enable_markdown: Some(false),
                enable_feedback: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let overrides = ConfigOverlay {
            features: FeaturesOverlay {
                enable_feedback: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        let features = resolve(&defaults, &remote, &overrides).features;
        // remote-only key survives an override that names a different key
        assert!(!features.enable_markdown);
        assert!(!features.enable_feedback);
        assert!(features.enable_emoji);
        assert_eq!(features.allowed_file_types, vec!["jpg", "png", "pdf"]);
    }

    #[test]
    fn test_optional_fields_fall_through() {
        let defaults = WidgetConfig::default();
        let remote = ConfigOverlay {
            session_timeout: Some(4.0),
            position: Some(Position::BottomLeft),
            ..Default::default()
        };
        let resolved = resolve(&defaults, &remote, &ConfigOverlay::default());
        assert_eq!(resolved.session_timeout, Some(4.0));
        assert_eq!(resolved.position, Position::BottomLeft);
        assert_eq!(resolved.width, None);
    }

    fn opt_string() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[a-z#0-9]{1,8}")
    }

    fn opt_bool() -> impl Strategy<Value = Option<bool>> {
        proptest::option::of(any::<bool>())
    }

    proptest! {
        #[test]
        fn prop_scalar_precedence(
            remote_title in opt_string(),
            override_title in opt_string(),
            remote_width in proptest::option::of(1u32..2000),
            override_width in proptest::option::of(1u32..2000),
            remote_md in opt_bool(),
            override_md in opt_bool(),
            remote_reset in opt_bool(),
            override_reset in opt_bool(),
        ) {
            let defaults = WidgetConfig::default();
            let remote = ConfigOverlay {
                header_title: remote_title.clone(),
                width: remote_width,
                features: FeaturesOverlay {
                    enable_markdown: remote_md,
                    enable_conversation_reset: remote_reset,
                    ..Default::default()
                },
                ..Default::default()
            };
            let overrides = ConfigOverlay {
                header_title: override_title.clone(),
                width: override_width,
                features: FeaturesOverlay {
                    enable_markdown: override_md,
                    enable_conversation_reset: override_reset,
                    ..Default::default()
                },
                ..Default::default()
            };

            let resolved = resolve(&defaults, &remote, &overrides);

            let expected_title = override_title.or(remote_title).unwrap_or(defaults.header_title.clone());
            prop_assert_eq!(resolved.header_title, expected_title);
            prop_assert_eq!(resolved.width, override_width.or(remote_width));
            prop_assert_eq!(
                resolved.features.enable_markdown,
                override_md.or(remote_md).unwrap_or(defaults.features.enable_markdown)
            );
            prop_assert_eq!(
                resolved.features.enable_conversation_reset,
                override_reset.or(remote_reset).unwrap_or(defaults.features.enable_conversation_reset)
            );
        }
    }
}
