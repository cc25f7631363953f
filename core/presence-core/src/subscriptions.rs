//! Editor-event subscriptions owned by the controller.
//!
//! Registration is explicit: `subscribe_all` drops every prior registration
//! before adding the current set, so repeated connects never stack duplicate
//! handlers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorEventKind {
    ActiveEditorChanged,
    DocumentClosed,
    SelectionChanged,
    NotebookChanged,
}

impl EditorEventKind {
    pub const ALL: [EditorEventKind; 4] = [
        EditorEventKind::ActiveEditorChanged,
        EditorEventKind::DocumentClosed,
        EditorEventKind::SelectionChanged,
        EditorEventKind::NotebookChanged,
    ];
}

#[derive(Debug, Default)]
pub struct Subscriptions {
    active: HashSet<EditorEventKind>,
}

impl Subscriptions {
    pub fn subscribe_all(&mut self) {
        self.unsubscribe_all();
        self.active.extend(EditorEventKind::ALL);
    }

    pub fn unsubscribe_all(&mut self) {
        if !self.active.is_empty() {
            tracing::debug!(count = self.active.len(), "Unsubscribing editor events");
        }
        self.active.clear();
    }

    pub fn is_subscribed(&self, kind: EditorEventKind) -> bool {
        self.active.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
