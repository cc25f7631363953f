//! Host protocol: newline-delimited JSON between the editor and the bridge.
//!
//! Inbound lines (stdin) carry editor events, commands and notice clicks.
//! Outbound lines (stdout) carry status-indicator updates and notices.

use fs_err as fs;
use presence_core::activity::EditorContext;
use presence_core::notices::{Notice, NoticeAction, NoticeLevel, Notifier};
use presence_core::repository::{find_git_config, repository_url_from_config};
use presence_core::{EditorEventKind, HostCommand, IndicatorState, StatusIndicator};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::SystemTime;

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    EditorEvent {
        event: EditorEventKind,
        #[serde(default)]
        editor: Option<EditorSnapshot>,
        #[serde(default)]
        workspace: Option<WorkspaceInfo>,
    },
    Command {
        command: HostCommand,
    },
    NoticeAction {
        notice_id: u64,
        action: NoticeAction,
    },
}

/// Active editor as the host sees it. `line` and `character` are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditorSnapshot {
    pub file_name: String,
    pub language_id: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub character: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub root: Option<PathBuf>,
}

pub fn parse_host_line(line: &str) -> Result<HostMessage, serde_json::Error> {
    serde_json::from_str(line)
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    Status {
        text: String,
        tooltip: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<HostCommand>,
    },
    Notice {
        id: u64,
        level: NoticeLevel,
        message: String,
        actions: Vec<String>,
    },
}

impl BridgeMessage {
    pub fn status(state: IndicatorState) -> Self {
        BridgeMessage::Status {
            text: state.text().to_string(),
            tooltip: state.tooltip().to_string(),
            command: state.command(),
        }
    }
}

/// Line writer shared by the status indicator and the notice board.
pub struct HostOutput<W: Write> {
    writer: Rc<RefCell<W>>,
}

impl<W: Write> Clone for HostOutput<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Rc::clone(&self.writer),
        }
    }
}

impl<W: Write> HostOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Rc::new(RefCell::new(writer)),
        }
    }

    pub fn send(&self, message: &BridgeMessage) {
        let mut writer = self.writer.borrow_mut();
        if let Err(err) = write_line(&mut *writer, message) {
            tracing::warn!(error = %err, "Failed to write host message");
        }
    }

    pub fn with_writer<T>(&self, f: impl FnOnce(&W) -> T) -> T {
        f(&self.writer.borrow())
    }
}

fn write_line<W: Write>(writer: &mut W, message: &BridgeMessage) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

pub struct StatusLine<W: Write> {
    output: HostOutput<W>,
}

impl<W: Write> StatusLine<W> {
    pub fn new(output: HostOutput<W>) -> Self {
        Self { output }
    }
}

impl<W: Write> StatusIndicator for StatusLine<W> {
    fn show(&mut self, state: IndicatorState) {
        self.output.send(&BridgeMessage::status(state));
    }
}

/// Sends notices and remembers which actions each one offered, so a click
/// reported by the host can be checked before it is acted on.
pub struct NoticeBoard<W: Write> {
    output: HostOutput<W>,
    next_id: u64,
    offered: HashMap<u64, Vec<NoticeAction>>,
}

impl<W: Write> NoticeBoard<W> {
    pub fn new(output: HostOutput<W>) -> Self {
        Self {
            output,
            next_id: 0,
            offered: HashMap::new(),
        }
    }

    pub fn offers(&self, notice_id: u64, action: NoticeAction) -> bool {
        self.offered
            .get(&notice_id)
            .is_some_and(|actions| actions.contains(&action))
    }
}

impl<W: Write> Notifier for NoticeBoard<W> {
    fn notify(&mut self, notice: Notice) {
        self.next_id += 1;
        let id = self.next_id;
        if !notice.actions.is_empty() {
            self.offered.insert(id, notice.actions.clone());
        }
        self.output.send(&BridgeMessage::Notice {
            id,
            level: notice.level,
            message: notice.message,
            actions: notice
                .actions
                .iter()
                .map(|action| action.label().to_string())
                .collect(),
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Editor context
// ─────────────────────────────────────────────────────────────────────────────

const MAX_CACHED_ROOTS: usize = 64;

/// Repository URL of one workspace root, valid while its git config file is
/// unchanged.
struct CachedRemote {
    config: Option<PathBuf>,
    modified: Option<SystemTime>,
    url: Option<String>,
}

/// Builds [`EditorContext`] values from host snapshots.
///
/// Repository URLs are cached per workspace root and re-read whenever the
/// root's git config file moves or its modification time changes, so a remote
/// added while the editor runs still shows up.
#[derive(Default)]
pub struct ContextResolver {
    remotes: HashMap<PathBuf, CachedRemote>,
}

impl ContextResolver {
    pub fn resolve(
        &mut self,
        editor: Option<EditorSnapshot>,
        workspace: Option<WorkspaceInfo>,
    ) -> Option<EditorContext> {
        let editor = editor?;
        let (workspace_folder_name, repository_url) = match workspace {
            Some(workspace) => {
                let url = workspace.root.and_then(|root| self.repository_url(root));
                (workspace.name, url)
            }
            None => (None, None),
        };

        Some(EditorContext {
            file_name: editor.file_name,
            language_id: editor.language_id,
            cursor_line: editor.line,
            cursor_column: editor.character,
            workspace_folder_name,
            repository_url,
        })
    }

    fn repository_url(&mut self, root: PathBuf) -> Option<String> {
        let config = find_git_config(&root);
        let modified = config
            .as_deref()
            .and_then(|path| fs::metadata(path).ok())
            .and_then(|meta| meta.modified().ok());

        if let Some(cached) = self.remotes.get(&root) {
            if cached.config == config && cached.modified == modified {
                return cached.url.clone();
            }
        }

        let url = match (&config, modified) {
            (Some(path), Some(_)) => repository_url_from_config(path),
            _ => None,
        };
        tracing::debug!(root = %root.display(), url = ?url, "Resolved repository remote");

        if !self.remotes.contains_key(&root) && self.remotes.len() >= MAX_CACHED_ROOTS {
            self.remotes.clear();
        }
        self.remotes.insert(
            root,
            CachedRemote {
                config,
                modified,
                url: url.clone(),
            },
        );
        url
    }
}
