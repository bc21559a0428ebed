//! Unix domain socket server for IPC
//!
//! Provides request-response communication plus push notifications
//! (controller events and haptic commands) for subscribed clients.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::StateEvent;
use crate::haptics::{HapticCommand, PulseKind};
use crate::state::Command;

use super::protocol::{DaemonStatus, Notification, Request, Response};

/// Largest accepted message body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Shared,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with every client handler
#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<ServerState>>,
    commands: mpsc::Sender<Command>,
    notify_tx: broadcast::Sender<Notification>,
}

struct ServerState {
    status: DaemonStatus,
    start_time: std::time::Instant,
}

impl Server {
    /// Bind the socket and create the server
    pub fn new(socket_path: &Path, commands: mpsc::Sender<Command>, status: DaemonStatus) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let (notify_tx, _) = broadcast::channel(256);

        let state = Arc::new(RwLock::new(ServerState {
            status,
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Shared {
                state,
                commands,
                notify_tx,
            },
            shutdown_tx,
        })
    }

    /// Update the status snapshot from a controller event
    pub async fn apply_event(&self, event: &StateEvent) {
        let mut server_state = self.shared.state.write().await;
        let old_state = server_state.status.state;
        server_state.status.apply(event);

        if old_state != server_state.status.state {
            debug!(
                from = %old_state,
                to = %server_state.status.state,
                "IPC server: state updated"
            );
        }
    }

    /// Push a notification to every subscribed client
    pub fn notify(&self, notification: Notification) {
        // No subscribers is the normal case
        let _ = self.shared.notify_tx.send(notification);
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = self.shared.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Serve one client until it disconnects.
///
/// Reading runs as its own future so a half-read frame is never dropped
/// while a notification is being written. The writer only stops once the
/// reader has hung up and every request read before that is answered.
async fn handle_client<T>(stream: T, shared: Shared) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (request_tx, mut request_rx) = mpsc::channel::<Request>(8);

    let read_loop = async move {
        while let Some(request) = read_message(&mut reader).await? {
            if request_tx.send(request).await.is_err() {
                break;
            }
        }
        debug!("client finished sending");
        drop(request_tx);
        Ok::<(), anyhow::Error>(())
    };

    let write_loop = async {
        let mut notifications: Option<broadcast::Receiver<Notification>> = None;

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        debug!("client disconnected");
                        return Ok::<(), anyhow::Error>(());
                    };
                    debug!(?request, "received request");

                    let subscribing = matches!(request, Request::Subscribe) && notifications.is_none();
                    let response = process_request(request, &shared, &mut notifications).await;
                    write_message(&mut writer, &response).await?;

                    if subscribing {
                        if let Some(greeting) = ready_greeting(&shared).await {
                            write_message(&mut writer, &greeting).await?;
                        }
                    }
                }
                notification = next_notification(&mut notifications) => match notification {
                    Ok(notification) => write_message(&mut writer, &notification).await?,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged, notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        notifications = None;
                    }
                },
            }
        }
    };

    tokio::try_join!(read_loop, write_loop)?;
    Ok(())
}

/// The ready pulse, replayed to each new subscriber once the controller is up
async fn ready_greeting(shared: &Shared) -> Option<Notification> {
    let ready = shared.state.read().await.status.ready;
    ready.then_some(Notification::Haptic(HapticCommand::Pulse {
        kind: PulseKind::SuccessNotification,
    }))
}

async fn next_notification(
    rx: &mut Option<broadcast::Receiver<Notification>>,
) -> Result<Notification, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read one length-prefixed JSON request; `None` on clean EOF
async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Request>> {
    let mut len_buf = [0u8; 4];

    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        anyhow::bail!("message too large ({len} bytes)");
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;

    let request = serde_json::from_slice(&msg_buf).context("failed to parse request")?;
    Ok(Some(request))
}

/// Send a length-prefixed JSON message
async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

/// Process a request and return a response
async fn process_request(
    request: Request,
    shared: &Shared,
    notifications: &mut Option<broadcast::Receiver<Notification>>,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::GetStatus => {
            let mut state = shared.state.write().await;
            state.status.uptime_secs = state.start_time.elapsed().as_secs();
            Response::Status(state.status.clone())
        }

        Request::Subscribe => {
            if notifications.is_none() {
                *notifications = Some(shared.notify_tx.subscribe());
                debug!("client subscribed to notifications");
            }
            Response::Subscribed
        }

        Request::Gesture { event } => forward(shared, event.into()).await,

        Request::SetSpeed { wpm } => match NonZeroU32::new(wpm) {
            Some(wpm) => forward(shared, Command::SetSpeed(wpm)).await,
            None => Response::error("invalid_speed", "wpm must be greater than zero"),
        },
    }
}

async fn forward(shared: &Shared, command: Command) -> Response {
    match shared.commands.send(command).await {
        Ok(()) => Response::Accepted,
        Err(_) => Response::error("unavailable", "controller is not running"),
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::UnixStream;

    use std::time::Duration;

    use super::*;
    use crate::input::InputEvent;

    fn frame(json: &str) -> Vec<u8> {
        let mut out = (json.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(json.as_bytes());
        out
    }

    fn shared() -> (Shared, mpsc::Receiver<Command>) {
        let (commands, command_rx) = mpsc::channel(8);
        let (notify_tx, _) = broadcast::channel(8);
        let shared = Shared {
            state: Arc::new(RwLock::new(ServerState {
                status: DaemonStatus::new(20, false),
                start_time: std::time::Instant::now(),
            })),
            commands,
            notify_tx,
        };
        (shared, command_rx)
    }

    #[tokio::test]
    async fn test_read_message_framing() {
        let mut mock = tokio_test::io::Builder::new()
            .read(&frame(r#"{"type":"ping"}"#))
            .build();

        assert!(matches!(read_message(&mut mock).await.unwrap(), Some(Request::Ping)));
        assert!(read_message(&mut mock).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_message_is_rejected() {
        let mut mock = tokio_test::io::Builder::new()
            .read(&(MAX_MESSAGE_LEN as u32 + 1).to_le_bytes())
            .build();

        assert!(read_message(&mut mock).await.is_err());
    }

    #[tokio::test]
    async fn test_ping_pong_over_mock_stream() {
        let (shared, _command_rx) = shared();
        let mock = tokio_test::io::Builder::new()
            .read(&frame(r#"{"type":"ping"}"#))
            .write(&frame(r#"{"type":"pong"}"#))
            .build();

        handle_client(mock, shared).await.unwrap();
    }

    #[tokio::test]
    async fn test_gesture_is_forwarded() {
        let (shared, mut command_rx) = shared();
        let mut notifications = None;

        let response = process_request(
            Request::Gesture { event: InputEvent::DoubleActivate },
            &shared,
            &mut notifications,
        )
        .await;

        assert!(matches!(response, Response::Accepted));
        assert_eq!(
            command_rx.recv().await,
            Some(Command::Input(InputEvent::DoubleActivate))
        );
    }

    #[tokio::test]
    async fn test_zero_speed_is_rejected() {
        let (shared, mut command_rx) = shared();
        let mut notifications = None;

        let response =
            process_request(Request::SetSpeed { wpm: 0 }, &shared, &mut notifications).await;

        assert!(matches!(response, Response::Error { ref code, .. } if code == "invalid_speed"));
        assert!(command_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let (commands, _command_rx) = mpsc::channel(8);
        let server = Arc::new(Server::new(&socket_path, commands, DaemonStatus::new(20, false)).unwrap());

        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_message(&mut client, &Request::Subscribe).await.unwrap();
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Subscribed));

        server
            .apply_event(&StateEvent::PlaybackStarted { text: "hi".into(), steps: 6 })
            .await;
        server.notify(Notification::Haptic(HapticCommand::Pulse {
            kind: PulseKind::HeavyImpact,
        }));

        let pushed: Notification = read_json(&mut client).await;
        assert!(matches!(
            pushed,
            Notification::Haptic(HapticCommand::Pulse { kind: PulseKind::HeavyImpact })
        ));

        write_message(&mut client, &Request::GetStatus).await.unwrap();
        let response: Response = read_json(&mut client).await;
        match response {
            Response::Status(status) => assert_eq!(status.status_text, "Playing: \"hi\""),
            other => panic!("unexpected response {other:?}"),
        }

        server.shutdown().await;
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_requests_are_answered_after_client_half_close() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let (commands, mut command_rx) = mpsc::channel(8);
        let server = Arc::new(Server::new(&socket_path, commands, DaemonStatus::new(20, false)).unwrap());

        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_message(
            &mut client,
            &Request::Gesture { event: InputEvent::DoubleActivate },
        )
        .await
        .unwrap();
        client.shutdown().await.unwrap();

        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut reply))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, frame(r#"{"type":"accepted"}"#));

        let command = tokio::time::timeout(Duration::from_secs(2), command_rx.recv())
            .await
            .unwrap();
        assert_eq!(command, Some(Command::Input(InputEvent::DoubleActivate)));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_late_subscriber_feels_ready_pulse() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let (commands, _command_rx) = mpsc::channel(8);
        let server = Arc::new(Server::new(&socket_path, commands, DaemonStatus::new(20, false)).unwrap());

        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        // The controller came up before anyone was listening
        server.apply_event(&StateEvent::Ready).await;
        server.notify(Notification::Haptic(HapticCommand::Pulse {
            kind: PulseKind::SuccessNotification,
        }));

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_message(&mut client, &Request::Subscribe).await.unwrap();
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Subscribed));

        let pushed: Notification = read_json(&mut client).await;
        assert!(matches!(
            pushed,
            Notification::Haptic(HapticCommand::Pulse { kind: PulseKind::SuccessNotification })
        ));

        // Subscribing twice does not replay it
        write_message(&mut client, &Request::Subscribe).await.unwrap();
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Subscribed));
        write_message(&mut client, &Request::Ping).await.unwrap();
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Pong));

        server.shutdown().await;
    }

    async fn read_json<T: serde::de::DeserializeOwned>(stream: &mut UnixStream) -> T {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
