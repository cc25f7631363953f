//! User-visible notices and the login-failure notice policy.

use serde::{Deserialize, Serialize};

use crate::error::PresenceError;

pub const RELOADING_MESSAGE: &str = "Reloading Discord Rich Presence...";
const FAILURE_PREFIX: &str = "Failed to activate Discord Rich Presence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    /// Runs `reconnect` when chosen.
    Retry,
}

impl NoticeAction {
    pub fn label(self) -> &'static str {
        match self {
            NoticeAction::Retry => "Try Again",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub actions: Vec<NoticeAction>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            actions: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: NoticeAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.actions.contains(&NoticeAction::Retry)
    }
}

pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Only the first login failure of a controller's lifetime offers a retry
/// action; later failures get a plain notice so the user is not nagged.
#[derive(Debug, Default)]
pub struct FailureNotices {
    offered_retry: bool,
}

impl FailureNotices {
    pub fn notice_for(&mut self, error: &PresenceError) -> Notice {
        let notice = Notice::error(format!("{}: {}", FAILURE_PREFIX, error));
        if self.offered_retry {
            return notice;
        }
        self.offered_retry = true;
        notice.with_action(NoticeAction::Retry)
    }
}
