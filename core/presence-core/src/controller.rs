//! Connection lifecycle and activity-update controller.
//!
//! One controller per process owns the live client (at most one), the
//! connection state, both timers and the editor subscriptions. Every exit
//! from `Connected` goes through [`PresenceController::teardown`], so no
//! timer or subscription outlives the handle it belonged to.
//!
//! Transport events carry the [`HandleId`] that produced them. Anything not
//! matching the live handle is stale and dropped.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

use crate::activity::{compose_activity, EditorBranding, EditorContext};
use crate::client::{ClientFactory, PresenceClient};
use crate::config::PresenceConfig;
use crate::error::PresenceError;
use crate::events::{HandleId, TransportEvent};
use crate::indicator::{HostCommand, IndicatorState, StatusIndicator};
use crate::notices::{FailureNotices, Notice, NoticeAction, Notifier, RELOADING_MESSAGE};
use crate::subscriptions::{EditorEventKind, Subscriptions};
use crate::timer::PeriodicTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub client_id: String,
    pub update_interval: Duration,
    pub compact_after: Duration,
    pub branding: EditorBranding,
}

impl ControllerSettings {
    pub fn from_config(config: &PresenceConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            update_interval: config.update_interval(),
            compact_after: config.compact_after(),
            branding: config.branding(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&PresenceConfig::default())
    }
}

/// Wall-clock source for the activity start timestamp.
pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

struct LiveClient<C> {
    handle: HandleId,
    client: C,
}

pub struct PresenceController<F: ClientFactory, I: StatusIndicator, N: Notifier> {
    settings: ControllerSettings,
    factory: F,
    indicator: I,
    notifier: N,
    state: ConnectionState,
    live: Option<LiveClient<F::Client>>,
    next_handle: u64,
    clock: Clock,
    started_at: DateTime<Utc>,
    update_timer: Option<PeriodicTimer>,
    compact_at: Option<Instant>,
    subscriptions: Subscriptions,
    context: Option<EditorContext>,
    failures: FailureNotices,
}

impl<F: ClientFactory, I: StatusIndicator, N: Notifier> PresenceController<F, I, N> {
    pub fn new(settings: ControllerSettings, factory: F, indicator: I, notifier: N) -> Self {
        Self::with_clock(settings, factory, indicator, notifier, Box::new(Utc::now))
    }

    pub fn with_clock(
        settings: ControllerSettings,
        factory: F,
        indicator: I,
        notifier: N,
        clock: Clock,
    ) -> Self {
        let started_at = clock();
        Self {
            settings,
            factory,
            indicator,
            notifier,
            state: ConnectionState::Disconnected,
            live: None,
            next_handle: 0,
            clock,
            started_at,
            update_timer: None,
            compact_at: None,
            subscriptions: Subscriptions::default(),
            context: None,
            failures: FailureNotices::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Starts a fresh login, destroying any prior handle first.
    pub fn connect(&mut self) {
        self.teardown();

        self.next_handle += 1;
        let handle = HandleId(self.next_handle);
        self.state = ConnectionState::Connecting;
        self.indicator.show(IndicatorState::Connecting);
        tracing::info!(handle = %handle, "Connecting to Discord gateway");

        match self.factory.login(handle, &self.settings.client_id) {
            Ok(client) => self.live = Some(LiveClient { handle, client }),
            Err(err) => self.fail_login(err),
        }
    }

    pub fn disconnect(&mut self) {
        self.teardown();
        self.state = ConnectionState::Disconnected;
        self.indicator.show(IndicatorState::Reconnect);
        tracing::info!("Disconnected from Discord gateway");
    }

    pub fn reconnect(&mut self) {
        self.indicator.show(IndicatorState::Connecting);
        self.teardown();
        self.state = ConnectionState::Disconnected;
        self.connect();
    }

    pub fn reload(&mut self) {
        self.notifier.notify(Notice::info(RELOADING_MESSAGE));
        self.disconnect();
        self.connect();
    }

    /// Final teardown when the host goes away.
    pub fn shutdown(&mut self) {
        if self.live.is_some() || self.state != ConnectionState::Disconnected {
            self.teardown();
            self.state = ConnectionState::Disconnected;
        }
        tracing::info!("Presence controller shut down");
    }

    pub fn handle_command(&mut self, command: HostCommand) {
        tracing::debug!(?command, "Host command");
        match command {
            HostCommand::Reload => self.reload(),
            HostCommand::Disconnect => self.disconnect(),
            HostCommand::Reconnect => self.reconnect(),
        }
    }

    pub fn on_notice_action(&mut self, action: NoticeAction) {
        match action {
            NoticeAction::Retry => self.reconnect(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transport Events
    // ─────────────────────────────────────────────────────────────────────

    pub fn on_transport_event(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Ready { handle } => self.on_ready(handle, now),
            TransportEvent::LoginFailed { handle, error } => self.on_login_failed(handle, error),
            TransportEvent::Disconnected { handle } => self.on_disconnected(handle),
        }
    }

    pub fn on_ready(&mut self, handle: HandleId, now: Instant) {
        if !self.is_live(handle) || self.state != ConnectionState::Connecting {
            tracing::debug!(handle = %handle, state = ?self.state, "Ignoring stale ready");
            return;
        }

        self.state = ConnectionState::Connected;
        self.started_at = (self.clock)();
        self.subscriptions.subscribe_all();
        self.push_activity();
        self.update_timer = Some(PeriodicTimer::start(now, self.settings.update_interval));
        self.compact_at = Some(now + self.settings.compact_after);
        self.indicator.show(IndicatorState::Connected);
        tracing::info!(handle = %handle, "Connected to Discord gateway");
    }

    pub fn on_login_failed(&mut self, handle: HandleId, error: PresenceError) {
        if !self.is_live(handle) {
            tracing::debug!(handle = %handle, error = %error, "Ignoring stale login failure");
            return;
        }
        self.fail_login(error);
    }

    pub fn on_disconnected(&mut self, handle: HandleId) {
        if !self.is_live(handle) {
            tracing::debug!(handle = %handle, "Ignoring stale disconnect");
            return;
        }
        tracing::warn!(handle = %handle, "Discord gateway connection dropped");
        self.teardown();
        self.state = ConnectionState::Disconnected;
        self.indicator.show(IndicatorState::Reconnect);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Editor Events & Timers
    // ─────────────────────────────────────────────────────────────────────

    /// Records the latest editor snapshot; pushes an update only while
    /// connected and subscribed to `kind`.
    pub fn on_editor_event(&mut self, kind: EditorEventKind, context: Option<EditorContext>) {
        self.context = context;
        if self.state == ConnectionState::Connected && self.subscriptions.is_subscribed(kind) {
            self.push_activity();
        }
    }

    pub fn on_timer(&mut self, now: Instant) {
        let tick = self
            .update_timer
            .as_mut()
            .is_some_and(|timer| timer.fire_if_due(now));
        if tick && self.state == ConnectionState::Connected {
            self.push_activity();
        }

        if self.compact_at.is_some_and(|at| at <= now) {
            self.compact_at = None;
            if self.state == ConnectionState::Connected {
                self.indicator.show(IndicatorState::ConnectedCompact);
            }
        }
    }

    /// Nearest instant at which [`Self::on_timer`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let periodic = self.update_timer.as_ref().map(PeriodicTimer::next_due);
        match (periodic, self.compact_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn live_handle(&self) -> Option<HandleId> {
        self.live.as_ref().map(|live| live.handle)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn context(&self) -> Option<&EditorContext> {
        self.context.as_ref()
    }

    pub fn is_subscribed(&self, kind: EditorEventKind) -> bool {
        self.subscriptions.is_subscribed(kind)
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn is_live(&self, handle: HandleId) -> bool {
        self.live_handle() == Some(handle)
    }

    fn fail_login(&mut self, error: PresenceError) {
        tracing::warn!(error = %error, "Discord login failed");
        self.teardown();
        self.state = ConnectionState::Disconnected;
        let notice = self.failures.notice_for(&error);
        self.notifier.notify(notice);
        self.indicator.show(IndicatorState::Reconnect);
    }

    fn teardown(&mut self) {
        if let Some(mut live) = self.live.take() {
            tracing::debug!(handle = %live.handle, "Destroying gateway client");
            live.client.destroy();
        }
        self.update_timer = None;
        self.compact_at = None;
        self.subscriptions.unsubscribe_all();
    }

    fn push_activity(&mut self) {
        let live = match self.live.as_mut() {
            Some(live) => live,
            None => return,
        };
        let payload = compose_activity(
            self.context.as_ref(),
            self.started_at,
            &self.settings.branding,
        );
        if let Err(err) = live.client.set_activity(&payload) {
            tracing::warn!(handle = %live.handle, error = %err, "Failed to push activity");
        }
    }
}
