//! Built-in site profiles and host resolution.
//!
//! A profile captures everything page-specific: where the editor lives,
//! which control submits, how text is filled, and whether the page needs
//! the DOM observer. User-supplied profiles take precedence over the
//! built-in set; matching is a substring test against the page host.

use toolbridge_core_types::{ContainerMarker, FillMethod, SiteAdapter};

pub fn builtin_profiles() -> Vec<SiteAdapter> {
    vec![
        SiteAdapter {
            site: "gemini.google.com".into(),
            editor: vec!["div.ql-editor".into(), "rich-textarea div[contenteditable]".into()],
            send_button: vec!["button.send-button".into(), "button[aria-label*=\"Send\"]".into()],
            stop_button: Some("button.stop-button".into()),
            fill_method: FillMethod::RichText,
            // Responses render client-side; the network carries an opaque
            // batch format the tap cannot scan.
            use_observer: true,
            container_markers: vec![
                ContainerMarker::class("message-content"),
                ContainerMarker::class("model-response-text"),
                ContainerMarker::tag("message-content"),
            ],
        },
        SiteAdapter {
            site: "chatgpt.com".into(),
            editor: vec!["#prompt-textarea".into(), "div[contenteditable=\"true\"]".into()],
            send_button: vec![
                "button[data-testid=\"send-button\"]".into(),
                "button[aria-label*=\"Send\"]".into(),
            ],
            stop_button: Some("button[data-testid=\"stop-button\"]".into()),
            fill_method: FillMethod::Paste,
            use_observer: false,
            container_markers: Vec::new(),
        },
        SiteAdapter {
            site: "claude.ai".into(),
            editor: vec!["div.ProseMirror".into()],
            send_button: vec!["button[aria-label*=\"Send\"]".into()],
            stop_button: Some("button[aria-label*=\"Stop\"]".into()),
            fill_method: FillMethod::Paste,
            use_observer: false,
            container_markers: Vec::new(),
        },
    ]
}

/// Fallback when no profile matches: plain textarea, clipboard paste, no
/// stop control, network tap only.
pub fn generic_profile(host: &str) -> SiteAdapter {
    SiteAdapter {
        site: host.to_string(),
        editor: vec![
            "textarea".into(),
            "div[contenteditable=\"true\"]".into(),
        ],
        send_button: vec![
            "button[type=\"submit\"]".into(),
            "button[aria-label*=\"Send\"]".into(),
        ],
        stop_button: None,
        fill_method: FillMethod::Paste,
        use_observer: false,
        container_markers: Vec::new(),
    }
}

/// Resolve the profile for `host`. User profiles are consulted first, in
/// order; then the built-ins; then the generic fallback.
pub fn resolve(host: &str, user_profiles: &[SiteAdapter]) -> SiteAdapter {
    user_profiles
        .iter()
        .chain(builtin_profiles().iter())
        .find(|p| host.contains(&p.site))
        .cloned()
        .unwrap_or_else(|| generic_profile(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolution_by_host_substring() {
        let profile = resolve("gemini.google.com", &[]);
        assert!(profile.use_observer);
        assert_eq!(profile.fill_method, FillMethod::RichText);
        assert!(!profile.container_markers.is_empty());
    }

    #[test]
    fn user_profile_shadows_builtin() {
        let custom = SiteAdapter {
            site: "chatgpt.com".into(),
            editor: vec!["#custom".into()],
            send_button: vec!["#go".into()],
            stop_button: None,
            fill_method: FillMethod::Value,
            use_observer: false,
            container_markers: Vec::new(),
        };
        let profile = resolve("chatgpt.com", std::slice::from_ref(&custom));
        assert_eq!(profile.editor, vec!["#custom".to_string()]);
        assert_eq!(profile.fill_method, FillMethod::Value);
    }

    #[test]
    fn unknown_host_gets_the_generic_fallback() {
        let profile = resolve("chat.unknown.example", &[]);
        assert_eq!(profile.site, "chat.unknown.example");
        assert_eq!(profile.fill_method, FillMethod::Paste);
        assert!(!profile.use_observer);
    }
}
