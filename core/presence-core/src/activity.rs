//! Activity composition: editor context in, presence payload out.
//!
//! Everything here is pure. The controller calls [`compose_activity`] on every
//! update tick and pushes the result through the live client.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lookup::{image_key_for_language, language_for_extension, DEFAULT_IMAGE_KEY};

pub const NO_WORKSPACE: &str = "No Workspace";
pub const IDLE_STATE: &str = "Not editing a file";
pub const IDLE_SMALL_IMAGE_KEY: &str = "idle";
pub const IDLE_SMALL_IMAGE_TEXT: &str = "Idling";
pub const REPOSITORY_BUTTON_LABEL: &str = "View Repository";

const SSH_GITHUB_PREFIX: &str = "git@github.com:";
const HTTPS_GITHUB_PREFIX: &str = "https://github.com/";

/// Snapshot of the active editor as reported by the host.
///
/// Cursor coordinates are 0-based, exactly as the editor tracks them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContext {
    pub file_name: String,
    pub language_id: String,
    pub cursor_line: u32,
    pub cursor_column: u32,
    pub workspace_folder_name: Option<String>,
    pub repository_url: Option<String>,
}

/// Small-image branding for the editor that hosts the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorBranding {
    pub small_image_key: String,
    pub small_image_text: String,
}

impl Default for EditorBranding {
    fn default() -> Self {
        Self {
            small_image_key: "vscode".to_string(),
            small_image_text: "Visual Studio Code".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub state: String,
    pub start_timestamp: DateTime<Utc>,
    pub large_image_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image_text: Option<String>,
    pub small_image_key: String,
    pub small_image_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<ActivityButton>>,
}

impl ActivityPayload {
    pub fn is_idle(&self) -> bool {
        self.details.is_none() && self.state == IDLE_STATE
    }
}

impl From<&ActivityPayload> for presence_protocol::Activity {
    fn from(payload: &ActivityPayload) -> Self {
        presence_protocol::Activity {
            details: payload.details.clone(),
            state: Some(payload.state.clone()),
            timestamps: Some(presence_protocol::Timestamps {
                start: Some(payload.start_timestamp.timestamp_millis()),
                end: None,
            }),
            assets: Some(presence_protocol::Assets {
                large_image: Some(payload.large_image_key.clone()),
                large_text: payload.large_image_text.clone(),
                small_image: Some(payload.small_image_key.clone()),
                small_text: Some(payload.small_image_text.clone()),
            }),
            buttons: payload.buttons.as_ref().map(|buttons| {
                buttons
                    .iter()
                    .map(|button| presence_protocol::Button {
                        label: button.label.clone(),
                        url: button.url.clone(),
                    })
                    .collect()
            }),
        }
    }
}

pub fn compose_activity(
    context: Option<&EditorContext>,
    started_at: DateTime<Utc>,
    branding: &EditorBranding,
) -> ActivityPayload {
    let context = match context {
        Some(context) => context,
        None => return idle_activity(started_at),
    };

    let file_name = base_name(&context.file_name);
    let language = resolve_language(file_name, &context.language_id);
    let image_key = image_key_for_language(&language).unwrap_or(DEFAULT_IMAGE_KEY);
    let workspace = context
        .workspace_folder_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(NO_WORKSPACE);

    let buttons = context
        .repository_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| {
            vec![ActivityButton {
                label: REPOSITORY_BUTTON_LABEL.to_string(),
                url: normalize_repo_url(url),
            }]
        });

    ActivityPayload {
        details: Some(format!(
            "Editing {} file at {}",
            file_name,
            cursor_position(context.cursor_line, context.cursor_column)
        )),
        state: format!("Workspace: {}", workspace),
        start_timestamp: started_at,
        large_image_key: image_key.to_string(),
        large_image_text: Some(format!("Editing a {} File", language.to_uppercase())),
        small_image_key: branding.small_image_key.clone(),
        small_image_text: branding.small_image_text.clone(),
        buttons,
    }
}

pub fn idle_activity(started_at: DateTime<Utc>) -> ActivityPayload {
    ActivityPayload {
        details: None,
        state: IDLE_STATE.to_string(),
        start_timestamp: started_at,
        large_image_key: DEFAULT_IMAGE_KEY.to_string(),
        large_image_text: None,
        small_image_key: IDLE_SMALL_IMAGE_KEY.to_string(),
        small_image_text: IDLE_SMALL_IMAGE_TEXT.to_string(),
        buttons: None,
    }
}

/// Language for a file: the extension table wins, the editor's own id is the
/// fallback.
pub fn resolve_language(file_name: &str, editor_language_id: &str) -> String {
    let extension = file_extension(file_name);
    language_for_extension(&extension)
        .map(str::to_string)
        .unwrap_or_else(|| editor_language_id.to_string())
}

/// Lowercased text after the last `.`; a name without a dot is used whole.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// `git@github.com:OWNER/REPO.git` → `https://github.com/OWNER/REPO`.
///
/// A trailing `.git` is always stripped; only the GitHub SSH prefix is
/// rewritten.
pub fn normalize_repo_url(url: &str) -> String {
    let trimmed = url.strip_suffix(".git").unwrap_or(url);
    match trimmed.strip_prefix(SSH_GITHUB_PREFIX) {
        Some(path) => format!("{}{}", HTTPS_GITHUB_PREFIX, path),
        None => trimmed.to_string(),
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(&['/', '\\'][..]).next().unwrap_or(path)
}

fn cursor_position(line: u32, column: u32) -> String {
    format!("{}:{}", line.saturating_add(1), column.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::EXTENSION_LANGUAGES;
    use chrono::TimeZone;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 30, 12, 0, 0).unwrap()
    }

    fn context(file_name: &str, language_id: &str) -> EditorContext {
        EditorContext {
            file_name: file_name.to_string(),
            language_id: language_id.to_string(),
            cursor_line: 0,
            cursor_column: 0,
            workspace_folder_name: Some("widget".to_string()),
            repository_url: None,
        }
    }

    #[test]
    fn mapped_extensions_resolve_regardless_of_case() {
        for (ext, language) in EXTENSION_LANGUAGES {
            let lower = format!("file.{}", ext);
            let upper = format!("FILE.{}", ext.to_uppercase());
            assert_eq!(resolve_language(&lower, "editor-id"), *language);
            assert_eq!(resolve_language(&upper, "editor-id"), *language);
        }
    }

    #[test]
    fn unmapped_extension_keeps_editor_language() {
        assert_eq!(resolve_language("main.rs", "rust"), "rust");
        assert_eq!(resolve_language("Makefile", "makefile"), "makefile");
        assert_eq!(resolve_language("notes.Unknown", "Plain-ID"), "Plain-ID");
    }

    #[test]
    fn dotfile_uses_name_after_dot() {
        assert_eq!(file_extension(".gitignore"), "gitignore");
        assert_eq!(resolve_language(".gitignore", "ignore"), "git");
    }

    #[test]
    fn normalizes_ssh_github_remote() {
        assert_eq!(
            normalize_repo_url("git@github.com:acme/widget.git"),
            "https://github.com/acme/widget"
        );
    }

    #[test]
    fn https_remote_only_loses_suffix() {
        assert_eq!(
            normalize_repo_url("https://github.com/acme/widget.git"),
            "https://github.com/acme/widget"
        );
        assert_eq!(
            normalize_repo_url("git@gitlab.com:acme/widget.git"),
            "git@gitlab.com:acme/widget"
        );
        assert_eq!(
            normalize_repo_url("https://example.com/acme/widget"),
            "https://example.com/acme/widget"
        );
    }

    #[test]
    fn idle_payload_without_editor() {
        let payload = compose_activity(None, started(), &EditorBranding::default());

        assert!(payload.is_idle());
        assert_eq!(payload.state, IDLE_STATE);
        assert_eq!(payload.large_image_key, DEFAULT_IMAGE_KEY);
        assert_eq!(payload.small_image_key, IDLE_SMALL_IMAGE_KEY);
        assert_eq!(payload.small_image_text, IDLE_SMALL_IMAGE_TEXT);
        assert_eq!(payload.start_timestamp, started());
        assert!(payload.buttons.is_none());
        assert!(payload.details.is_none());
    }

    #[test]
    fn cursor_origin_renders_one_based() {
        let payload = compose_activity(
            Some(&context("/home/me/widget/src/app.ts", "typescript")),
            started(),
            &EditorBranding::default(),
        );

        assert_eq!(
            payload.details.as_deref(),
            Some("Editing app.ts file at 1:1")
        );
        assert_eq!(payload.state, "Workspace: widget");
        assert_eq!(payload.large_image_key, "ts");
        assert_eq!(
            payload.large_image_text.as_deref(),
            Some("Editing a TYPESCRIPT File")
        );
        assert_eq!(payload.small_image_key, "vscode");
    }

    #[test]
    fn windows_paths_use_last_segment() {
        let mut ctx = context(r"C:\work\widget\main.py", "python");
        ctx.cursor_line = 9;
        ctx.cursor_column = 4;
        let payload = compose_activity(Some(&ctx), started(), &EditorBranding::default());
        assert_eq!(
            payload.details.as_deref(),
            Some("Editing main.py file at 10:5")
        );
    }

    #[test]
    fn unknown_language_falls_back_to_default_image() {
        let payload = compose_activity(
            Some(&context("lib.rs", "rust")),
            started(),
            &EditorBranding::default(),
        );
        assert_eq!(payload.large_image_key, DEFAULT_IMAGE_KEY);
        assert_eq!(
            payload.large_image_text.as_deref(),
            Some("Editing a RUST File")
        );
    }

    #[test]
    fn missing_workspace_uses_sentinel() {
        let mut ctx = context("index.html", "html");
        ctx.workspace_folder_name = None;
        let payload = compose_activity(Some(&ctx), started(), &EditorBranding::default());
        assert_eq!(payload.state, "Workspace: No Workspace");
    }

    #[test]
    fn repository_button_only_when_url_present() {
        let without = compose_activity(
            Some(&context("a.go", "go")),
            started(),
            &EditorBranding::default(),
        );
        assert!(without.buttons.is_none());

        let mut ctx = context("a.go", "go");
        ctx.repository_url = Some("git@github.com:acme/widget.git".to_string());
        let with = compose_activity(Some(&ctx), started(), &EditorBranding::default());
        let buttons = with.buttons.expect("buttons");
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, REPOSITORY_BUTTON_LABEL);
        assert_eq!(buttons[0].url, "https://github.com/acme/widget");
    }

    #[test]
    fn converts_to_wire_activity() {
        let mut ctx = context("a.go", "go");
        ctx.repository_url = Some("https://github.com/acme/widget".to_string());
        let payload = compose_activity(Some(&ctx), started(), &EditorBranding::default());
        let wire = presence_protocol::Activity::from(&payload);

        assert_eq!(
            wire.timestamps.and_then(|t| t.start),
            Some(started().timestamp_millis())
        );
        let assets = wire.assets.expect("assets");
        assert_eq!(assets.large_image.as_deref(), Some("go"));
        assert_eq!(assets.small_text.as_deref(), Some("Visual Studio Code"));
        assert_eq!(wire.buttons.map(|b| b.len()), Some(1));
    }
}
