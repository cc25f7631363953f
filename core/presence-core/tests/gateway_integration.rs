use presence_core::activity::{idle_activity, IDLE_STATE};
use presence_core::{
    ClientFactory, ConnectionState, ControllerSettings, DiscordConnector, HandleId,
    IndicatorState, Notice, Notifier, PresenceClient, PresenceController, PresenceError,
    StatusIndicator, TransportEvent, TransportSink,
};
use presence_protocol::{
    read_frame, write_frame, Command, ErrorData, Event, Frame, Message, Opcode, SetActivityArgs,
};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const CLIENT_ID: &str = "1331928227782066229";
const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

struct Gateway {
    _dir: TempDir,
    path: PathBuf,
    listener: UnixListener,
}

impl Gateway {
    fn bind() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("discord-ipc-0");
        let listener = UnixListener::bind(&path).expect("Failed to bind fake gateway");
        Self {
            _dir: dir,
            path,
            listener,
        }
    }

    /// Accepts one client and checks its handshake.
    fn accept(&self) -> UnixStream {
        let (mut stream, _) = self.listener.accept().expect("Failed to accept client");
        let handshake = read_frame(&mut stream).expect("Failed to read handshake");
        assert_eq!(handshake.opcode, Opcode::Handshake);
        assert_eq!(handshake.body["v"], 1);
        assert_eq!(handshake.body["client_id"], CLIENT_ID);
        stream
    }
}

fn send_ready(stream: &mut UnixStream) {
    let ready = Message::dispatch(Event::Ready, serde_json::json!({ "v": 1 }));
    let frame = Frame::message(&ready).expect("ready frame");
    write_frame(stream, &frame).expect("Failed to write ready");
}

fn channel_sink() -> (TransportSink, Receiver<TransportEvent>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let sink: TransportSink = Arc::new(move |event| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(event);
        }
    });
    (sink, rx)
}

fn connector(gateway: &Gateway, sink: TransportSink) -> DiscordConnector {
    DiscordConnector::with_candidates(vec![gateway.path.clone()], Duration::from_secs(2), sink)
}

fn next_event(rx: &Receiver<TransportEvent>) -> TransportEvent {
    rx.recv_timeout(EVENT_TIMEOUT)
        .expect("Timed out waiting for transport event")
}

fn spawn_gateway<T: Send + 'static>(
    gateway: Gateway,
    script: impl FnOnce(&Gateway) -> T + Send + 'static,
) -> JoinHandle<T> {
    thread::spawn(move || script(&gateway))
}

#[test]
fn handshake_then_set_activity_then_disconnect() {
    let gateway = Gateway::bind();
    let (sink, rx) = channel_sink();
    let mut connector = connector(&gateway, sink);

    let server = spawn_gateway(gateway, |gateway| {
        let mut stream = gateway.accept();
        send_ready(&mut stream);
        let frame = read_frame(&mut stream).expect("Failed to read activity");
        assert_eq!(frame.opcode, Opcode::Frame);
        frame.parse::<Message>().expect("Failed to parse activity")
    });

    let mut client = connector
        .login(HandleId(1), CLIENT_ID)
        .expect("login should start");
    assert!(matches!(
        next_event(&rx),
        TransportEvent::Ready {
            handle: HandleId(1)
        }
    ));

    client
        .set_activity(&idle_activity(chrono::Utc::now()))
        .expect("set_activity");

    let message = server.join().expect("gateway thread panicked");
    assert_eq!(message.cmd, Command::SetActivity);
    assert!(message.nonce.is_some());
    let args: SetActivityArgs =
        serde_json::from_value(message.args.expect("args")).expect("activity args");
    assert_eq!(args.pid, std::process::id());
    let activity = args.activity.expect("activity");
    assert_eq!(activity.state.as_deref(), Some(IDLE_STATE));
    assert!(activity.buttons.is_none());

    assert!(matches!(
        next_event(&rx),
        TransportEvent::Disconnected {
            handle: HandleId(1)
        }
    ));
}

#[test]
fn close_frame_during_handshake_is_a_login_failure() {
    let gateway = Gateway::bind();
    let (sink, rx) = channel_sink();
    let mut connector = connector(&gateway, sink);

    let server = spawn_gateway(gateway, |gateway| {
        let mut stream = gateway.accept();
        let body = serde_json::to_value(ErrorData {
            code: 4000,
            message: "Invalid Client ID".to_string(),
        })
        .expect("close body");
        write_frame(&mut stream, &Frame::new(Opcode::Close, body)).expect("write close");
    });

    let _client = connector.login(HandleId(7), CLIENT_ID).expect("login");
    server.join().expect("gateway thread panicked");

    match next_event(&rx) {
        TransportEvent::LoginFailed {
            handle,
            error: PresenceError::Handshake { code, message },
        } => {
            assert_eq!(handle, HandleId(7));
            assert_eq!(code, 4000);
            assert_eq!(message, "Invalid Client ID");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn missing_gateway_reports_unavailable() {
    let dir = TempDir::new().expect("temp dir");
    let (sink, rx) = channel_sink();
    let mut connector = DiscordConnector::with_candidates(
        vec![dir.path().join("discord-ipc-0"), dir.path().join("discord-ipc-1")],
        Duration::from_secs(1),
        sink,
    );

    let _client = connector.login(HandleId(1), CLIENT_ID).expect("login");

    assert!(matches!(
        next_event(&rx),
        TransportEvent::LoginFailed {
            error: PresenceError::GatewayUnavailable { tried: 2 },
            ..
        }
    ));
}

#[test]
fn silent_gateway_times_out() {
    let gateway = Gateway::bind();
    let (sink, rx) = channel_sink();
    let mut connector = DiscordConnector::with_candidates(
        vec![gateway.path.clone()],
        Duration::from_millis(200),
        sink,
    );
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let server = spawn_gateway(gateway, move |gateway| {
        let _stream = gateway.accept();
        let _ = release_rx.recv_timeout(EVENT_TIMEOUT);
    });

    let _client = connector.login(HandleId(1), CLIENT_ID).expect("login");
    let event = next_event(&rx);
    let _ = release_tx.send(());
    server.join().expect("gateway thread panicked");

    assert!(matches!(
        event,
        TransportEvent::LoginFailed {
            error: PresenceError::LoginTimeout,
            ..
        }
    ));
}

#[test]
fn ping_is_answered_with_pong() {
    let gateway = Gateway::bind();
    let (sink, rx) = channel_sink();
    let mut connector = connector(&gateway, sink);

    let server = spawn_gateway(gateway, |gateway| {
        let mut stream = gateway.accept();
        send_ready(&mut stream);
        let ping = Frame::new(Opcode::Ping, serde_json::json!({ "nonce": "p-1" }));
        write_frame(&mut stream, &ping).expect("write ping");
        read_frame(&mut stream).expect("read pong")
    });

    let _client = connector.login(HandleId(1), CLIENT_ID).expect("login");
    assert!(matches!(next_event(&rx), TransportEvent::Ready { .. }));

    let pong = server.join().expect("gateway thread panicked");
    assert_eq!(pong.opcode, Opcode::Pong);
    assert_eq!(pong.body["nonce"], "p-1");
}

#[test]
fn destroyed_client_reports_nothing_more() {
    let gateway = Gateway::bind();
    let (sink, rx) = channel_sink();
    let mut connector = connector(&gateway, sink);

    let server = spawn_gateway(gateway, |gateway| {
        let mut stream = gateway.accept();
        send_ready(&mut stream);
        // Blocks until the client shuts its socket down.
        read_frame(&mut stream).is_err()
    });

    let mut client = connector.login(HandleId(3), CLIENT_ID).expect("login");
    assert!(matches!(next_event(&rx), TransportEvent::Ready { .. }));

    client.destroy();
    client.destroy();
    assert!(server.join().expect("gateway thread panicked"));
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert!(client.set_activity(&idle_activity(chrono::Utc::now())).is_err());
}

#[derive(Default)]
struct RecordedIndicator(Vec<IndicatorState>);

impl StatusIndicator for RecordedIndicator {
    fn show(&mut self, state: IndicatorState) {
        self.0.push(state);
    }
}

#[derive(Default)]
struct RecordedNotices(Vec<Notice>);

impl Notifier for RecordedNotices {
    fn notify(&mut self, notice: Notice) {
        self.0.push(notice);
    }
}

#[test]
fn controller_drives_real_client_end_to_end() {
    let gateway = Gateway::bind();
    let (sink, rx) = channel_sink();
    let connector = connector(&gateway, sink);

    let server = spawn_gateway(gateway, |gateway| {
        let mut stream = gateway.accept();
        send_ready(&mut stream);
        let frame = read_frame(&mut stream).expect("Failed to read activity");
        frame.parse::<Message>().expect("parse activity")
    });

    let settings = ControllerSettings {
        client_id: CLIENT_ID.to_string(),
        ..ControllerSettings::default()
    };
    let mut controller = PresenceController::new(
        settings,
        connector,
        RecordedIndicator::default(),
        RecordedNotices::default(),
    );

    controller.connect();
    assert_eq!(controller.state(), ConnectionState::Connecting);
    controller.on_transport_event(next_event(&rx), Instant::now());
    assert_eq!(controller.state(), ConnectionState::Connected);

    let message = server.join().expect("gateway thread panicked");
    assert_eq!(message.cmd, Command::SetActivity);

    controller.on_transport_event(next_event(&rx), Instant::now());
    assert_eq!(controller.state(), ConnectionState::Disconnected);
    assert_eq!(
        controller.indicator().0,
        vec![
            IndicatorState::Connecting,
            IndicatorState::Connected,
            IndicatorState::Reconnect
        ]
    );
    assert!(controller.notifier().0.is_empty());
}
