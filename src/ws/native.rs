//! Native WebSocket session: `tokio-tungstenite`.
//!
//! One background tokio task per session owns:
//! - the socket halves and the in-flight connect attempt
//! - the application-level heartbeat and the disconnect timeout
//! - the reconnect watchdog
//!
//! The public API talks to it over a bounded mpsc channel and never blocks.
//! Subscriptions live in the shared registry and are replayed on every open.

use std::collections::HashSet;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::domain::candle::Bar;
use crate::error::{WsError, WsResult};
use crate::flags::{FeatureFlags, StaticFlags};
use crate::network::origin_of;
use crate::shared::ChannelId;
use crate::telemetry::{NoopReceipts, ReceiptSink};
use crate::ws::router::{MessageRouter, Routed};
use crate::ws::subscriptions::{HandlerId, SharedRegistry, SubscriptionRegistry};
use crate::ws::{Channel, ConnectionState, DisconnectMode, MessageOut, WsConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = WsResult<WsStream>> + Send>>;
type ConnectedCallback = Arc<dyn Fn(bool) + Send + Sync>;
type MessageCallback = Arc<dyn Fn(String) + Send + Sync>;

// ─── Commands from public API to background task ─────────────────────────────

#[derive(Debug)]
enum Command {
    Send(String),
    Subscribe { channel_id: ChannelId, channel: Channel },
    Unsubscribe { channel_id: ChannelId, channel: Channel },
    Disconnect,
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: WsConfig,
    url: String,
    cmd_rx: mpsc::Receiver<Command>,
    /// Disconnect signal used when the command queue is full.
    shutdown: Arc<Notify>,
    registry: SharedRegistry,
    router: MessageRouter,
    conn_state: Arc<AtomicU8>,
    on_connected: ConnectedCallback,
    on_message: MessageCallback,
}

impl TaskState {
    fn set_state(&self, state: ConnectionState) {
        self.conn_state.store(state as u8, Ordering::SeqCst);
    }

    fn emit_connected(&self, connected: bool) {
        (self.on_connected)(connected);
    }
}

/// A live socket and the timers that only exist while it is open.
struct Connection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    heartbeat: Interval,
    disconnect_deadline: Pin<Box<Sleep>>,
    /// Channel ids a subscribe frame was sent for on this socket.
    subscribed: HashSet<ChannelId>,
}

enum SocketEvent {
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Heartbeat,
    PongTimeout,
}

impl Connection {
    fn new(ws: WsStream, config: &WsConfig) -> Self {
        let (sink, stream) = ws.split();
        let now = Instant::now();
        let mut heartbeat = interval_at(now + config.ping_interval, config.ping_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            sink,
            stream,
            heartbeat,
            disconnect_deadline: Box::pin(sleep(config.pong_timeout)),
            subscribed: HashSet::new(),
        }
    }

    async fn next_event(&mut self) -> SocketEvent {
        tokio::select! {
            frame = self.stream.next() => SocketEvent::Frame(frame),
            _ = self.heartbeat.tick() => SocketEvent::Heartbeat,
            () = self.disconnect_deadline.as_mut() => SocketEvent::PongTimeout,
        }
    }

    fn rearm(&mut self, timeout: Duration) {
        self.disconnect_deadline
            .as_mut()
            .reset(Instant::now() + timeout);
    }

    async fn send_subscribe(&mut self, channel_id: &ChannelId, channel: Channel) {
        if self.subscribed.contains(channel_id) {
            return;
        }
        let msg = MessageOut::subscribe(channel, channel_id.clone());
        match send_msg(&mut self.sink, &msg).await {
            Ok(()) => {
                self.subscribed.insert(channel_id.clone());
            }
            Err(e) => tracing::error!("Failed to subscribe to {}: {}", channel_id, e),
        }
    }
}

// ─── Public WsSession ────────────────────────────────────────────────────────

/// Resilient market-data session over `tokio-tungstenite`.
///
/// Holds at most one live socket. Lost sockets are re-established by a
/// watchdog, and every tracked subscription is replayed when a socket opens.
pub struct WsSession {
    config: WsConfig,
    registry: SharedRegistry,
    flags: Arc<dyn FeatureFlags>,
    receipts: Arc<dyn ReceiptSink>,
    conn_state: Arc<AtomicU8>,
    cmd_tx: Option<mpsc::Sender<Command>>,
    shutdown: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl WsSession {
    /// Create a new session. Does not connect yet.
    pub fn new(config: WsConfig) -> Self {
        Self {
            config,
            registry: SubscriptionRegistry::shared(),
            flags: Arc::new(StaticFlags::default()),
            receipts: Arc::new(NoopReceipts),
            conn_state: Arc::new(AtomicU8::new(ConnectionState::Idle as u8)),
            cmd_tx: None,
            shutdown: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    pub fn with_flags(mut self, flags: Arc<dyn FeatureFlags>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_receipts(mut self, receipts: Arc<dyn ReceiptSink>) -> Self {
        self.receipts = receipts;
        self
    }

    /// Use an existing registry instead of a fresh one.
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Start the session.
    ///
    /// Spawns the background task and returns without waiting for the socket.
    /// `on_connected_change` fires `true` on every open and `false` on every
    /// close or failed attempt. `on_message` receives forwarded frames.
    pub async fn connect<C, M>(
        &mut self,
        url: &str,
        on_connected_change: C,
        on_message: M,
    ) -> WsResult<()>
    where
        C: Fn(bool) + Send + Sync + 'static,
        M: Fn(String) + Send + Sync + 'static,
    {
        if self.is_running() {
            return Err(WsError::AlreadyConnected);
        }

        let parsed = Url::parse(url).map_err(|e| WsError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(WsError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                url,
                parsed.scheme()
            )));
        }

        let router = MessageRouter::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.flags),
            Arc::clone(&self.receipts),
            origin_of(&parsed),
            self.config.pong_type.clone(),
        );

        let (cmd_tx, cmd_rx) = mpsc::channel(self.config.command_channel_capacity.max(1));
        self.cmd_tx = Some(cmd_tx);
        self.shutdown = Arc::new(Notify::new());

        let state = TaskState {
            config: self.config.clone(),
            url: url.to_string(),
            cmd_rx,
            shutdown: Arc::clone(&self.shutdown),
            registry: Arc::clone(&self.registry),
            router,
            conn_state: Arc::clone(&self.conn_state),
            on_connected: Arc::new(on_connected_change),
            on_message: Arc::new(on_message),
        };

        self.task_handle = Some(tokio::spawn(run_task(state)));
        Ok(())
    }

    /// Tear the connection down.
    ///
    /// With [`DisconnectMode::Terminal`] the registry is cleared and the task
    /// stops. With [`DisconnectMode::Resumable`] the watchdog revives the
    /// socket on its next tick.
    pub fn disconnect(&mut self) {
        if self.config.disconnect_mode == DisconnectMode::Terminal {
            self.lock_registry().clear();
        }

        let Some(tx) = &self.cmd_tx else {
            return;
        };
        match tx.try_send(Command::Disconnect) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Command channel full, signalling disconnect directly");
                self.shutdown.notify_one();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Session task already stopped");
            }
        }
    }

    /// Send a raw text frame. Best effort: dropped with a log when not open.
    pub fn send(&self, payload: impl Into<String>) {
        self.dispatch(Command::Send(payload.into()));
    }

    /// Track a subscription and send its subscribe frame if the socket is open.
    ///
    /// Returns `false` if the channel id was already tracked.
    pub fn subscribe(&self, channel_id: impl Into<ChannelId>, channel: Channel) -> bool {
        let channel_id = channel_id.into();
        let newly = self.lock_registry().track(channel_id.clone(), channel);
        if newly {
            self.dispatch(Command::Subscribe {
                channel_id,
                channel,
            });
        }
        newly
    }

    /// Register a bar handler on a candle channel, subscribing on first use.
    pub fn subscribe_candles<F>(&self, channel_id: impl Into<ChannelId>, handler: F) -> HandlerId
    where
        F: Fn(&Bar) + Send + Sync + 'static,
    {
        let channel_id = channel_id.into();
        let (id, newly) = {
            let mut registry = self.lock_registry();
            let newly = !registry.is_tracked(&channel_id);
            (registry.add_handler(channel_id.clone(), Arc::new(handler)), newly)
        };
        if newly {
            self.dispatch(Command::Subscribe {
                channel_id,
                channel: Channel::Candles,
            });
        }
        id
    }

    /// Remove a bar handler. The channel stays subscribed.
    pub fn remove_candle_handler(&self, handler: HandlerId) -> bool {
        self.lock_registry().remove_handler(handler)
    }

    /// Stop tracking a subscription and send its unsubscribe frame if open.
    pub fn unsubscribe(&self, channel_id: impl Into<ChannelId>) -> bool {
        let channel_id = channel_id.into();
        let removed = self.lock_registry().untrack(&channel_id);
        match removed {
            Some(sub) => {
                self.dispatch(Command::Unsubscribe {
                    channel_id,
                    channel: sub.stream,
                });
                true
            }
            None => false,
        }
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from(self.conn_state.load(Ordering::SeqCst))
    }

    /// Whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Open
    }

    /// Whether the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, SubscriptionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, cmd: Command) {
        let Some(tx) = &self.cmd_tx else {
            tracing::debug!("Session not started, dropping {:?}", cmd);
            return;
        };
        match tx.try_send(cmd) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                tracing::error!("Send failed: command channel full, dropping {:?}", cmd);
            }
            Err(mpsc::error::TrySendError::Closed(cmd)) => {
                tracing::debug!("Session task stopped, dropping {:?}", cmd);
            }
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    let period = state.config.reconnect_interval;
    let mut watchdog = interval_at(Instant::now() + period, period);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut connection: Option<Connection> = None;
    let mut connecting: Option<ConnectFuture> = Some(start_connect(&state));
    state.set_state(ConnectionState::Connecting);

    loop {
        tokio::select! {
            // ── a) Connect attempt finished ──────────────────────────────
            result = poll_connect(&mut connecting) => {
                connecting = None;
                match result {
                    Ok(ws) => {
                        connection = Some(open(&state, ws).await);
                    }
                    Err(e) => {
                        tracing::warn!("WebSocket connection failed: {}", e);
                        state.set_state(ConnectionState::Closed);
                        state.emit_connected(false);
                    }
                }
            }

            // ── b) Socket event ──────────────────────────────────────────
            event = next_event(&mut connection) => {
                let keep = match (event, connection.as_mut()) {
                    (SocketEvent::Frame(frame), Some(conn)) => handle_frame(&state, conn, frame).await,
                    (SocketEvent::Heartbeat, Some(conn)) => {
                        if let Err(e) = send_text(&mut conn.sink, &state.config.ping_message).await {
                            tracing::warn!("Failed to send ping: {}", e);
                        }
                        true
                    }
                    (SocketEvent::PongTimeout, Some(_)) => {
                        tracing::warn!(
                            "Pong timeout: no response within {}ms",
                            state.config.pong_timeout.as_millis()
                        );
                        false
                    }
                    (_, None) => true,
                };
                if !keep {
                    teardown(&state, &mut connection, &mut connecting).await;
                }
            }

            // ── c) Reconnect watchdog ────────────────────────────────────
            _ = watchdog.tick() => {
                if connection.is_none() && connecting.is_none() {
                    tracing::info!("Reconnecting to {}", state.url);
                    state.set_state(ConnectionState::Connecting);
                    connecting = Some(start_connect(&state));
                }
            }

            // ── d) Command from public API ───────────────────────────────
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Send(payload)) => match connection.as_mut() {
                        Some(conn) => {
                            if let Err(e) = send_text(&mut conn.sink, &payload).await {
                                tracing::error!("Send failed: {} (payload: {})", e, payload);
                            }
                        }
                        None => tracing::debug!("Not connected, dropping send: {}", payload),
                    },
                    Some(Command::Subscribe { channel_id, channel }) => {
                        if let Some(conn) = connection.as_mut() {
                            conn.send_subscribe(&channel_id, channel).await;
                        }
                    }
                    Some(Command::Unsubscribe { channel_id, channel }) => {
                        if let Some(conn) = connection.as_mut() {
                            conn.subscribed.remove(&channel_id);
                            let msg = MessageOut::unsubscribe(channel, channel_id);
                            if let Err(e) = send_msg(&mut conn.sink, &msg).await {
                                tracing::error!("Send failed: {} (payload: {:?})", e, msg);
                            }
                        }
                    }
                    Some(Command::Disconnect) => {
                        if disconnect_requested(&state, &mut connection, &mut connecting).await {
                            return;
                        }
                    }
                    None => {
                        // Session handle dropped.
                        teardown(&state, &mut connection, &mut connecting).await;
                        return;
                    }
                }
            }

            // ── e) Disconnect that bypassed a full command queue ─────────
            () = state.shutdown.notified() => {
                if disconnect_requested(&state, &mut connection, &mut connecting).await {
                    return;
                }
            }
        }
    }
}

/// Tear down for `disconnect()`. Returns `true` when the task should stop.
async fn disconnect_requested(
    state: &TaskState,
    connection: &mut Option<Connection>,
    connecting: &mut Option<ConnectFuture>,
) -> bool {
    teardown(state, connection, connecting).await;
    match state.config.disconnect_mode {
        DisconnectMode::Terminal => {
            tracing::info!("Session closed");
            true
        }
        DisconnectMode::Resumable => {
            tracing::info!("Disconnected; watchdog will reconnect");
            false
        }
    }
}

/// Socket opened: arm timers, report, replay subscriptions.
async fn open(state: &TaskState, ws: WsStream) -> Connection {
    let mut conn = Connection::new(ws, &state.config);
    state.set_state(ConnectionState::Open);
    tracing::info!("WebSocket connected to {}", state.url);
    state.emit_connected(true);
    resubscribe_all(&mut conn, &state.registry).await;
    conn
}

/// Returns `false` when the socket must be torn down.
async fn handle_frame(
    state: &TaskState,
    conn: &mut Connection,
    frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
) -> bool {
    match frame {
        Some(Ok(Message::Text(text))) => {
            let text_str: &str = text.as_ref();
            match state.router.route(text_str) {
                Routed::Pong => conn.rearm(state.config.pong_timeout),
                Routed::Forward(payload) => (state.on_message)(payload),
                Routed::Delivered { .. } | Routed::Consumed | Routed::Dropped | Routed::Rejected => {}
            }
            true
        }
        Some(Ok(Message::Ping(data))) => {
            let _ = conn.sink.send(Message::Pong(data)).await;
            true
        }
        Some(Ok(Message::Close(frame))) => {
            if cfg!(debug_assertions) {
                let (code, reason) = extract_close(frame.as_ref());
                tracing::warn!("WebSocket closed by server: code={} reason={}", code, reason);
            }
            false
        }
        Some(Ok(_)) => true, // Non-text frames are ignored.
        Some(Err(e)) => {
            if cfg!(debug_assertions) {
                tracing::warn!("WebSocket error: {}", e);
            }
            false
        }
        None => {
            tracing::debug!("WebSocket stream ended");
            false
        }
    }
}

/// Close the socket (bounded), drop it with its timers, report `false`.
///
/// Reports only if there was a socket or an attempt to abandon.
async fn teardown(
    state: &TaskState,
    connection: &mut Option<Connection>,
    connecting: &mut Option<ConnectFuture>,
) {
    let abandoned_attempt = connecting.take().is_some();
    let had_socket = match connection.take() {
        Some(mut conn) => {
            if tokio::time::timeout(state.config.close_timeout, conn.sink.close())
                .await
                .is_err()
            {
                tracing::debug!("Close handshake timed out");
            }
            true
        }
        None => false,
    };

    state.set_state(ConnectionState::Closed);
    if had_socket || abandoned_attempt {
        state.emit_connected(false);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn start_connect(state: &TaskState) -> ConnectFuture {
    let url = state.url.clone();
    let timeout = state.config.connect_timeout;
    Box::pin(async move {
        let (ws, _) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| WsError::Timeout)??;
        Ok(ws)
    })
}

async fn poll_connect(connecting: &mut Option<ConnectFuture>) -> WsResult<WsStream> {
    match connecting {
        Some(fut) => fut.as_mut().await,
        None => pending().await,
    }
}

async fn next_event(connection: &mut Option<Connection>) -> SocketEvent {
    match connection {
        Some(conn) => conn.next_event().await,
        None => pending().await,
    }
}

async fn send_text(sink: &mut SplitSink<WsStream, Message>, text: &str) -> Result<(), WsError> {
    sink.send(Message::Text(text.to_string().into()))
        .await
        .map_err(|e| WsError::SendFailed(e.to_string()))
}

/// Serialize and send a MessageOut over the sink.
async fn send_msg(sink: &mut SplitSink<WsStream, Message>, msg: &MessageOut) -> Result<(), WsError> {
    let json = msg
        .to_json()
        .map_err(|e| WsError::SendFailed(e.to_string()))?;
    send_text(sink, &json).await
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

// ─── Subscription replay ─────────────────────────────────────────────────────

async fn resubscribe_all(conn: &mut Connection, registry: &SharedRegistry) {
    let subs = registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .subscriptions();
    if subs.is_empty() {
        return;
    }
    tracing::info!("Resubscribing to {} tracked subscription(s)", subs.len());
    for (channel_id, channel) in &subs {
        conn.send_subscribe(channel_id, *channel).await;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn test_session_new() {
        let session = WsSession::new(WsConfig::default());
        assert!(session.cmd_tx.is_none());
        assert!(!session.is_running());
        assert_eq!(session.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_subscribe_before_connect_tracks() {
        let session = WsSession::new(WsConfig::default());
        assert!(session.subscribe("BTC-USD", Channel::Orderbook));
        assert!(!session.subscribe("BTC-USD", Channel::Orderbook));
        assert!(session.registry().lock().unwrap().is_tracked(&"BTC-USD".into()));

        assert!(session.unsubscribe("BTC-USD"));
        assert!(!session.unsubscribe("BTC-USD"));
    }

    #[test]
    fn test_subscribe_candles_shares_channel() {
        let session = WsSession::new(WsConfig::default());
        let a = session.subscribe_candles("BTC-USD/1MIN", |_: &Bar| {});
        let b = session.subscribe_candles("BTC-USD/1MIN", |_: &Bar| {});
        assert_ne!(a, b);

        let registry = session.registry();
        assert_eq!(registry.lock().unwrap().len(), 1);
        assert_eq!(registry.lock().unwrap().handlers_for(&"BTC-USD/1MIN".into()).len(), 2);

        assert!(session.remove_candle_handler(a));
        assert_eq!(registry.lock().unwrap().handlers_for(&"BTC-USD/1MIN".into()).len(), 1);
    }

    #[test]
    fn test_send_when_not_connected_is_silent() {
        let session = WsSession::new(WsConfig::default());
        session.send(r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_terminal_disconnect_clears_registry() {
        let mut session = WsSession::new(WsConfig::default());
        session.subscribe("X", Channel::Candles);
        session.disconnect();
        assert!(session.registry().lock().unwrap().is_empty());
    }

    #[test]
    fn test_resumable_disconnect_keeps_registry() {
        let mut session = WsSession::new(WsConfig {
            disconnect_mode: DisconnectMode::Resumable,
            ..WsConfig::default()
        });
        session.subscribe("X", Channel::Candles);
        session.disconnect();
        assert_eq!(session.registry().lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_urls() {
        let mut session = WsSession::new(WsConfig::default());
        for url in ["not a url", "https://example.com/ws", "ftp://example.com"] {
            let result = session.connect(url, |_| {}, |_| {}).await;
            assert!(matches!(result, Err(WsError::InvalidUrl(_))), "url: {url}");
        }
        assert!(!session.is_running());
    }

    #[test]
    fn test_extract_close_with_frame() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "goodbye".into(),
        };
        let (code, reason) = extract_close(Some(&frame));
        assert_eq!(code, 1000);
        assert_eq!(reason, "goodbye");
    }

    #[test]
    fn test_extract_close_no_frame() {
        let (code, reason) = extract_close(None);
        assert_eq!(code, 1006);
        assert_eq!(reason, "No close frame");
    }
}
