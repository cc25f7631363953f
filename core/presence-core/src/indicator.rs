//! Status indicator model.
//!
//! The controller decides *which* indicator state applies; the host decides
//! how to draw it. Text uses the editor's codicon syntax (`$(name)`).

use serde::{Deserialize, Serialize};

/// Zero-argument commands the host can bind to the indicator or trigger
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    Reload,
    Disconnect,
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    Connecting,
    Connected,
    /// Icon-only form shown once a connection has stayed up for a while.
    ConnectedCompact,
    Reconnect,
}

impl IndicatorState {
    pub fn text(self) -> &'static str {
        match self {
            IndicatorState::Connecting => "$(sync) Connecting to Discord...",
            IndicatorState::Connected => "$(sparkle) Connected to Discord",
            IndicatorState::ConnectedCompact => "$(rss)",
            IndicatorState::Reconnect => "$(refresh) Reconnect to Discord",
        }
    }

    pub fn tooltip(self) -> &'static str {
        match self {
            IndicatorState::Connecting => "Connecting to Discord...",
            IndicatorState::Connected | IndicatorState::ConnectedCompact => {
                "Click to disconnect from Discord gateway"
            }
            IndicatorState::Reconnect => "Click to reconnect to Discord gateway",
        }
    }

    pub fn command(self) -> Option<HostCommand> {
        match self {
            IndicatorState::Connecting => None,
            IndicatorState::Connected | IndicatorState::ConnectedCompact => {
                Some(HostCommand::Disconnect)
            }
            IndicatorState::Reconnect => Some(HostCommand::Reconnect),
        }
    }
}

pub trait StatusIndicator {
    fn show(&mut self, state: IndicatorState);
}
