//! Sidecar event loop.
//!
//! A single thread owns the controller. The stdin reader and the gateway
//! client threads only post [`BridgeEvent`]s into the channel; timers are
//! serviced by waking at the controller's next deadline.

use presence_core::controller::{ControllerSettings, PresenceController};
use presence_core::{ClientFactory, DiscordConnector, PresenceConfig, TransportEvent, TransportSink};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crate::host::{
    parse_host_line, ContextResolver, HostMessage, HostOutput, NoticeBoard, StatusLine,
};

#[derive(Debug)]
pub enum BridgeEvent {
    Host(HostMessage),
    HostClosed,
    Transport(TransportEvent),
}

pub type BridgeController<F, W> = PresenceController<F, StatusLine<W>, NoticeBoard<W>>;

pub fn run(config: PresenceConfig) -> Result<(), String> {
    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone())?;

    let output = HostOutput::new(io::stdout());
    let mut controller = PresenceController::new(
        ControllerSettings::from_config(&config),
        DiscordConnector::new(&config, transport_sink(tx)),
        StatusLine::new(output.clone()),
        NoticeBoard::new(output),
    );
    let mut contexts = ContextResolver::default();

    tracing::info!(client_id = %config.client_id, "Presence bridge started");
    controller.connect();
    event_loop(&mut controller, &rx, &mut contexts);
    tracing::info!("Presence bridge stopped");
    Ok(())
}

fn transport_sink(tx: Sender<BridgeEvent>) -> TransportSink {
    let tx = Mutex::new(tx);
    Arc::new(move |event| {
        let sender = tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if sender.send(BridgeEvent::Transport(event)).is_err() {
            tracing::debug!("Event loop gone; dropping transport event");
        }
    })
}

fn spawn_stdin_reader(tx: Sender<BridgeEvent>) -> Result<(), String> {
    thread::Builder::new()
        .name("presence-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            read_host_lines(stdin.lock(), &tx);
            let _ = tx.send(BridgeEvent::HostClosed);
        })
        .map(|_| ())
        .map_err(|err| format!("Failed to spawn stdin reader: {}", err))
}

/// Forwards every well-formed line; malformed ones are logged and skipped.
pub fn read_host_lines<R: BufRead>(reader: R, tx: &Sender<BridgeEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read host input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_host_line(&line) {
            Ok(message) => {
                if tx.send(BridgeEvent::Host(message)).is_err() {
                    break;
                }
            }
            Err(err) => tracing::warn!(error = %err, line = %line, "Skipping malformed host line"),
        }
    }
}

/// Runs until the host closes stdin, then shuts the controller down.
pub fn event_loop<F: ClientFactory, W: Write>(
    controller: &mut BridgeController<F, W>,
    rx: &Receiver<BridgeEvent>,
    contexts: &mut ContextResolver,
) {
    loop {
        let event = match controller.next_deadline() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            Some(BridgeEvent::HostClosed) => {
                tracing::info!("Host closed stdin");
                break;
            }
            Some(event) => dispatch(controller, contexts, event),
            None => {}
        }
        controller.on_timer(Instant::now());
    }

    controller.shutdown();
}

fn dispatch<F: ClientFactory, W: Write>(
    controller: &mut BridgeController<F, W>,
    contexts: &mut ContextResolver,
    event: BridgeEvent,
) {
    match event {
        BridgeEvent::Host(HostMessage::EditorEvent {
            event,
            editor,
            workspace,
        }) => {
            let context = contexts.resolve(editor, workspace);
            controller.on_editor_event(event, context);
        }
        BridgeEvent::Host(HostMessage::Command { command }) => controller.handle_command(command),
        BridgeEvent::Host(HostMessage::NoticeAction { notice_id, action }) => {
            if controller.notifier().offers(notice_id, action) {
                controller.on_notice_action(action);
            } else {
                tracing::debug!(notice_id, ?action, "Ignoring action for unknown notice");
            }
        }
        BridgeEvent::Transport(event) => controller.on_transport_event(event, Instant::now()),
        BridgeEvent::HostClosed => {}
    }
}
