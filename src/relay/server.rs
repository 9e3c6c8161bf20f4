//! The relay's network execution context.
//!
//! [`RelayServer::spawn`] binds the listener, then runs the accept loop on
//! a dedicated thread with its own single-threaded tokio runtime.  The GUI
//! thread keeps a [`RelayHandle`] and schedules broadcasts through it
//! without ever blocking.
//!
//! # Ownership
//!
//! ```text
//! GUI thread ──RelayCommand──▶ server loop ──PanelEvent──▶ GUI thread
//!                                 ▲    │ owns ConnectionRegistry
//!              ConnectionEvent    │    ▼ ClientHandle::send
//!                             connection tasks (one per socket)
//! ```
//!
//! Only the server loop touches the registry, so no locks are needed.
//! Connection tasks report registrations and closures as events.

use super::broadcast::broadcast;
use super::connection::{ClientHandle, ConnectionId};
use super::registry::ConnectionRegistry;
use crate::config::RelayConfig;
use crate::protocol::{ClientMessage, Command};
use crate::traits::PanelEvent;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message;

/// Requests from the GUI thread to the server loop.
#[derive(Debug)]
pub enum RelayCommand {
    Broadcast(Command),
    Shutdown,
}

/// What a connection task reports to the server loop.
#[derive(Debug)]
enum ConnectionEvent {
    Register {
        handle: ClientHandle,
        product_id: Option<String>,
        image_url: Option<String>,
    },
    Closed {
        id: ConnectionId,
        reason: String,
    },
}

/// Errors produced by the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("relay is not running")]
    NotRunning,
}

/// WebSocket relay between the control panel and its clients.
pub struct RelayServer {
    config: RelayConfig,
    notifier: Option<std_mpsc::Sender<PanelEvent>>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            notifier: None,
        }
    }

    /// Attach the channel that receives every [`PanelEvent`].
    pub fn set_notifier(&mut self, tx: std_mpsc::Sender<PanelEvent>) {
        self.notifier = Some(tx);
    }

    /// Bind the listener on the calling thread, then serve on a new thread.
    ///
    /// Bind errors are returned here rather than from the background thread.
    pub fn spawn(self) -> Result<RelayHandle, RelayError> {
        let std_listener = std::net::TcpListener::bind(self.config.listen)?;
        std_listener.set_nonblocking(true)?;
        let addr = std_listener.local_addr()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = self.notifier.clone();

        let thread = std::thread::Builder::new()
            .name("relay".into())
            .spawn(move || {
                let result = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(RelayError::from)
                    .and_then(|runtime| {
                        runtime.block_on(async move {
                            let listener = TcpListener::from_std(std_listener)?;
                            self.serve(listener, rx).await
                        })
                    });
                if let Err(ref e) = result {
                    error!("relay stopped: {}", e);
                }
                if let Some(tx) = notifier {
                    let _ = tx.send(PanelEvent::RelayStopped {
                        error: result.err().map(|e| e.to_string()),
                    });
                }
            })?;

        Ok(RelayHandle {
            addr,
            tx,
            thread: Some(thread),
        })
    }

    /// Accept and serve connections until [`RelayCommand::Shutdown`] arrives
    /// or every command sender is dropped.
    ///
    /// Must run inside a tokio runtime.  The registry lives exactly as long
    /// as this future and is cleared before it returns.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut commands: mpsc::UnboundedReceiver<RelayCommand>,
    ) -> Result<(), RelayError> {
        let addr = listener.local_addr()?;
        info!("relay listening on ws://{}", addr);
        self.notify(PanelEvent::Listening { addr });

        let mut registry = ConnectionRegistry::new();
        if let Some(tx) = &self.notifier {
            registry.set_notifier(tx.clone());
        }

        let (event_tx, mut events) = mpsc::unbounded_channel();
        let mut connections = JoinSet::new();
        let mut next_id = 0u64;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        next_id += 1;
                        let id = ConnectionId(next_id);
                        debug!("accepted {} as {}", peer, id);
                        connections.spawn(serve_connection(id, stream, peer, event_tx.clone()));
                    }
                    Err(e) => warn!("accept error: {}", e),
                },
                Some(event) = events.recv() => handle_event(&mut registry, event),
                command = commands.recv() => match command {
                    Some(RelayCommand::Broadcast(command)) => {
                        let kind = command.kind();
                        let attempted = broadcast(&registry, &command);
                        self.notify(PanelEvent::Broadcasted { kind, attempted });
                    }
                    Some(RelayCommand::Shutdown) | None => {
                        info!("relay shutting down");
                        break;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        connections.shutdown().await;
        registry.clear();
        Ok(())
    }

    fn notify(&self, event: PanelEvent) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(event);
        }
    }
}

fn handle_event(registry: &mut ConnectionRegistry, event: ConnectionEvent) {
    match event {
        ConnectionEvent::Register {
            handle,
            product_id,
            image_url,
        } => {
            let id = handle.id();
            let identifier = product_id.unwrap_or_default();
            if let Err(e) = registry.register(&identifier, image_url, handle) {
                warn!("registration from {} rejected: {}", id, e);
            }
        }
        ConnectionEvent::Closed { id, reason } => {
            info!("connection {} closed: {}", id, reason);
            registry.unregister(id);
        }
    }
}

/// Drive one client connection until it closes.
///
/// Reads inbound frames and writes queued outbound frames from the same
/// task.  Always ends by reporting [`ConnectionEvent::Closed`].
async fn serve_connection(
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake with {} failed: {}", peer, e);
            let _ = events.send(ConnectionEvent::Closed {
                id,
                reason: format!("handshake failed: {}", e),
            });
            return;
        }
    };
    info!("client connected: {} ({})", peer, id);

    let (mut sink, mut source) = ws.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    let handle = ClientHandle::new(id, peer, tx);

    let reason = loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_text(text.as_str(), &handle, &events),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(f) => format!("closed by peer ({} {})", u16::from(f.code), f.reason.as_str()),
                        None => "closed by peer".to_string(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("read error: {}", e),
                None => break "stream ended".to_string(),
            },
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::text(text)).await {
                    break format!("write error: {}", e);
                }
            }
        }
    };

    let _ = sink.close().await;
    let _ = events.send(ConnectionEvent::Closed { id, reason });
}

fn handle_text(
    text: &str,
    handle: &ClientHandle,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Register {
            product_id,
            image_url,
        }) => {
            debug!("register from {}: {:?}", handle.id(), product_id);
            let _ = events.send(ConnectionEvent::Register {
                handle: handle.clone(),
                product_id,
                image_url,
            });
        }
        Err(e) => warn!("ignoring message from {}: {} ({})", handle.id(), text, e),
    }
}

/// The GUI thread's side of a running relay.
///
/// Dropping the handle shuts the relay down and joins its thread.
pub struct RelayHandle {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<RelayCommand>,
    thread: Option<JoinHandle<()>>,
}

impl RelayHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Schedule `command` for broadcast on the relay thread.
    pub fn send(&self, command: Command) -> Result<(), RelayError> {
        self.tx
            .send(RelayCommand::Broadcast(command))
            .map_err(|_| RelayError::NotRunning)
    }

    /// Stop the relay and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.tx.send(RelayCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("relay thread panicked");
            }
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ClientParams, GlobalParams};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Harness {
        addr: SocketAddr,
        commands: mpsc::UnboundedSender<RelayCommand>,
        events: std_mpsc::Receiver<PanelEvent>,
        server: tokio::task::JoinHandle<Result<(), RelayError>>,
    }

    async fn start() -> Harness {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (panel_tx, events) = std_mpsc::channel();
        let mut server = RelayServer::new(RelayConfig { listen: addr });
        server.set_notifier(panel_tx);
        let (commands, rx) = mpsc::unbounded_channel();
        let server = tokio::spawn(server.serve(listener, rx));
        Harness {
            addr,
            commands,
            events,
            server,
        }
    }

    impl Harness {
        async fn connect(&self) -> Client {
            let (ws, _) = connect_async(format!("ws://{}", self.addr)).await.unwrap();
            ws
        }

        /// Poll the GUI-side channel until an event matches `pred`.
        async fn wait_for(&self, pred: impl Fn(&PanelEvent) -> bool) -> PanelEvent {
            let deadline = tokio::time::Instant::now() + TIMEOUT;
            loop {
                while let Ok(event) = self.events.try_recv() {
                    if pred(&event) {
                        return event;
                    }
                }
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "timed out waiting for panel event"
                );
                sleep(Duration::from_millis(10)).await;
            }
        }

        async fn wait_added(&self, id: &str) {
            self.wait_for(|e| {
                matches!(e, PanelEvent::ClientAdded { identifier, .. } if identifier == id)
            })
            .await;
        }

        fn broadcast(&self, command: Command) {
            self.commands
                .send(RelayCommand::Broadcast(command))
                .unwrap();
        }
    }

    async fn register(client: &mut Client, id: &str) {
        let frame = json!({"type": "register", "productId": id, "imageUrl": "http://img"});
        client
            .send(Message::text(frame.to_string()))
            .await
            .unwrap();
    }

    async fn recv_json(client: &mut Client) -> Value {
        loop {
            let msg = timeout(TIMEOUT, client.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("read error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    fn global() -> GlobalParams {
        GlobalParams {
            target_hour: 10,
            target_minute: 30,
            target_second: 0,
            decrement_value: 0.1,
            check_delay: 500,
            result_check_delay: 1500,
            resubmit_delay: 500,
        }
    }

    #[tokio::test]
    async fn stop_reaches_all_registered_clients() {
        let h = start().await;
        let mut a = h.connect().await;
        let mut b = h.connect().await;
        register(&mut a, "p-a").await;
        h.wait_added("p-a").await;
        register(&mut b, "p-b").await;
        h.wait_added("p-b").await;

        h.broadcast(Command::Stop);
        assert_eq!(recv_json(&mut a).await, json!({"type": "stop"}));
        assert_eq!(recv_json(&mut b).await, json!({"type": "stop"}));

        let event = h
            .wait_for(|e| matches!(e, PanelEvent::Broadcasted { .. }))
            .await;
        assert_eq!(
            event,
            PanelEvent::Broadcasted {
                kind: crate::protocol::CommandKind::Stop,
                attempted: 2,
            }
        );
    }

    #[tokio::test]
    async fn start_carries_client_params() {
        let h = start().await;
        let mut a = h.connect().await;
        register(&mut a, "p-a").await;
        h.wait_added("p-a").await;

        let mut clients = HashMap::new();
        clients.insert(
            "p-a".to_string(),
            ClientParams {
                min_values: vec![1.0, 2.5],
                sku_prices: vec![9.99],
                auto_decrement: true,
                random_delay: Some(250),
            },
        );
        h.broadcast(Command::Start {
            global: global(),
            clients,
        });

        let v = recv_json(&mut a).await;
        assert_eq!(v["type"], json!("start"));
        assert_eq!(v["globalParams"]["targetHour"], json!(10));
        assert_eq!(v["specificParams"]["minValues"], json!([1.0, 2.5]));
        assert_eq!(v["specificParams"]["skuPrices"], json!([9.99]));
        assert_eq!(v["specificParams"]["randomDelay"], json!(250));
    }

    #[tokio::test]
    async fn closed_connection_is_unregistered_and_skipped() {
        let h = start().await;
        let mut a = h.connect().await;
        let mut b = h.connect().await;
        register(&mut a, "p-a").await;
        h.wait_added("p-a").await;
        register(&mut b, "p-b").await;
        h.wait_added("p-b").await;

        a.close(None).await.unwrap();
        let removed = h
            .wait_for(|e| matches!(e, PanelEvent::ClientRemoved { .. }))
            .await;
        assert_eq!(
            removed,
            PanelEvent::ClientRemoved {
                identifier: "p-a".into(),
                clients: 1,
            }
        );

        h.broadcast(Command::Stop);
        let event = h
            .wait_for(|e| matches!(e, PanelEvent::Broadcasted { .. }))
            .await;
        assert!(matches!(event, PanelEvent::Broadcasted { attempted: 1, .. }));
        assert_eq!(recv_json(&mut b).await, json!({"type": "stop"}));
    }

    #[tokio::test]
    async fn duplicate_identifier_from_second_connection_is_rejected() {
        let h = start().await;
        let mut a = h.connect().await;
        let mut b = h.connect().await;
        register(&mut a, "same").await;
        h.wait_added("same").await;
        register(&mut b, "same").await;

        h.broadcast(Command::Stop);
        let event = h
            .wait_for(|e| matches!(e, PanelEvent::Broadcasted { .. }))
            .await;
        assert!(matches!(event, PanelEvent::Broadcasted { attempted: 1, .. }));
        assert_eq!(recv_json(&mut a).await, json!({"type": "stop"}));
        assert!(timeout(Duration::from_millis(200), b.next()).await.is_err());
    }

    #[tokio::test]
    async fn malformed_frames_do_not_drop_the_connection() {
        let h = start().await;
        let mut a = h.connect().await;
        a.send(Message::text("not json at all")).await.unwrap();
        a.send(Message::text(r#"{"type":"hello"}"#)).await.unwrap();
        a.send(Message::text(r#"{"type":"register"}"#)).await.unwrap();
        register(&mut a, "p-a").await;
        h.wait_added("p-a").await;

        h.broadcast(Command::Stop);
        assert_eq!(recv_json(&mut a).await, json!({"type": "stop"}));
    }

    #[tokio::test]
    async fn shutdown_clears_registry() {
        let mut h = start().await;
        let mut a = h.connect().await;
        register(&mut a, "p-a").await;
        h.wait_added("p-a").await;

        h.commands.send(RelayCommand::Shutdown).unwrap();
        (&mut h.server).await.unwrap().unwrap();
        let removed = h
            .wait_for(|e| matches!(e, PanelEvent::ClientRemoved { .. }))
            .await;
        assert!(matches!(removed, PanelEvent::ClientRemoved { clients: 0, .. }));
    }

    #[test]
    fn spawned_relay_reports_lifecycle() {
        let (tx, rx) = std_mpsc::channel();
        let mut server = RelayServer::new(RelayConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
        });
        server.set_notifier(tx);
        let handle = server.spawn().unwrap();
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);

        let first = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(first, PanelEvent::Listening { addr });

        handle.send(Command::Stop).unwrap();
        handle.shutdown();
        let rest: Vec<PanelEvent> = rx.try_iter().collect();
        assert!(rest.contains(&PanelEvent::RelayStopped { error: None }));
    }

    #[test]
    fn bind_conflict_is_reported_synchronously() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let server = RelayServer::new(RelayConfig {
            listen: taken.local_addr().unwrap(),
        });
        assert!(matches!(server.spawn(), Err(RelayError::Io(_))));
    }
}
