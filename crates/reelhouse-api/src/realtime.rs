//! STOMP-over-WebSocket realtime channel with fixed-delay reconnect.
//!
//! One [`RealtimeChannel`] per process holds at most one live socket. The
//! bearer token is presented in the STOMP `CONNECT` frame; heart-beats are
//! exchanged in both directions; when the socket drops the background task
//! waits [`RealtimeConfig::reconnect_delay`] and dials again, re-issuing
//! every registered subscription.
//!
//! # Example
//!
//! ```rust,ignore
//! let channel = RealtimeChannel::new(RealtimeConfig::for_website(&url)?, session);
//! channel.connect();
//! channel.subscribe("/user/queue/notifications");
//! let mut rx = channel.messages();
//! while let Ok(msg) = rx.recv().await {
//!     println!("{}: {}", msg.destination, msg.body);
//! }
//! channel.disconnect();
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::session::Session;
use crate::stomp::{Command, Frame, HEARTBEAT, Inbound, negotiate_heartbeat};

// ── Defaults ─────────────────────────────────────────────────────────

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);

const MESSAGE_CHANNEL_CAPACITY: usize = 256;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_TICK: Duration = Duration::from_millis(10);

// ── RealtimeConfig ───────────────────────────────────────────────────

/// Where to connect and how to keep the connection alive.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, e.g. `wss://host/api/ws/websocket`.
    pub url: Url,

    /// Fixed wait between a drop and the next connection attempt.
    pub reconnect_delay: Duration,

    /// Heart-beat interval offered in both directions. Zero disables.
    pub heartbeat: Duration,
}

impl RealtimeConfig {
    /// Derive the endpoint from the website URL: `<base>/api/ws` through
    /// the SockJS raw-WebSocket transport (`/api/ws/websocket`).
    pub fn for_website(website_url: &Url) -> Result<Self, Error> {
        let mut url = website_url.clone();
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|()| {
            Error::WebSocketConnect(format!("cannot derive a websocket URL from {website_url}"))
        })?;

        let trimmed = url.path().trim_end_matches('/');
        let base = trimmed.strip_suffix("/api").unwrap_or(trimmed).to_owned();
        url.set_path(&format!("{base}/api/ws/websocket"));
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            url,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat: DEFAULT_HEARTBEAT,
        })
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

// ── ConnectionState ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── RealtimeMessage ──────────────────────────────────────────────────

/// A `MESSAGE` frame delivered by the broker.
#[derive(Debug, Clone)]
pub struct RealtimeMessage {
    pub destination: String,
    pub subscription: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RealtimeMessage {
    fn from_frame(frame: Frame) -> Self {
        let destination = frame.get("destination").unwrap_or_default().to_owned();
        let subscription = frame.get("subscription").map(str::to_owned);
        Self {
            destination,
            subscription,
            headers: frame.headers,
            body: frame.body,
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: self.body.clone(),
        })
    }
}

// ── RealtimeChannel ──────────────────────────────────────────────────

/// Handle to the process-wide realtime connection.
///
/// Cheaply cloneable. All methods are synchronous; socket I/O happens on a
/// background task spawned by [`connect`](Self::connect), which therefore
/// must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

struct Inner {
    config: RealtimeConfig,
    session: Arc<Session>,
    state: watch::Sender<ConnectionState>,
    messages: broadcast::Sender<Arc<RealtimeMessage>>,
    subscriptions: DashMap<String, String>,
    next_subscription: AtomicU64,
    active: ArcSwapOption<ActiveConnection>,
}

struct ActiveConnection {
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<Frame>,
    /// Cancelled by the background task when it exits.
    finished: CancellationToken,
}

impl Inner {
    /// State writes from a background task are ignored once that task has
    /// been cancelled, so a replaced connection cannot clobber its successor.
    fn set_state(&self, cancel: &CancellationToken, state: ConnectionState) {
        if !cancel.is_cancelled() {
            self.state.send_replace(state);
        }
    }

    fn outbound(&self) -> Option<mpsc::UnboundedSender<Frame>> {
        if *self.state.borrow() != ConnectionState::Connected {
            return None;
        }
        self.active.load_full().map(|a| a.outbound.clone())
    }
}

impl RealtimeChannel {
    pub fn new(config: RealtimeConfig, session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (messages, _) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                config,
                session,
                state,
                messages,
                subscriptions: DashMap::new(),
                next_subscription: AtomicU64::new(0),
                active: ArcSwapOption::empty(),
            }),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the connection loop.
    ///
    /// Without a credential this does nothing. A connection that is already
    /// live is torn down and replaced.
    pub fn connect(&self) {
        if !self.inner.session.is_authenticated() {
            debug!("no credential, realtime channel stays disconnected");
            return;
        }

        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let next = Arc::new(ActiveConnection {
            cancel: cancel.clone(),
            outbound,
            finished: finished.clone(),
        });

        if let Some(previous) = self.inner.active.swap(Some(next)) {
            debug!("replacing existing realtime connection");
            previous.cancel.cancel();
        }

        self.inner.state.send_replace(ConnectionState::Connecting);
        tokio::spawn(connection_loop(
            Arc::clone(&self.inner),
            outbound_rx,
            cancel,
            finished,
        ));
    }

    /// Tear down the connection, if any. Safe to call repeatedly.
    pub fn disconnect(&self) {
        if let Some(active) = self.inner.active.swap(None) {
            active.cancel.cancel();
            info!("realtime channel disconnected");
        }
        self.inner.state.send_replace(ConnectionState::Disconnected);
    }

    /// Like [`disconnect`](Self::disconnect), but waits until frames already
    /// handed to [`send`](Self::send) are written and the socket is closed.
    pub async fn shutdown(&self) {
        let active = self.inner.active.swap(None);
        if let Some(ref active) = active {
            active.cancel.cancel();
        }
        self.inner.state.send_replace(ConnectionState::Disconnected);
        if let Some(active) = active {
            active.finished.cancelled().await;
            info!("realtime channel shut down");
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    // ── Messaging ────────────────────────────────────────────────────

    /// Publish `body` to `destination`.
    ///
    /// Returns `false` (and drops the frame) unless currently connected.
    /// Nothing is queued for later delivery.
    pub fn send(&self, destination: &str, body: impl Into<String>) -> bool {
        let Some(outbound) = self.inner.outbound() else {
            debug!(destination, "realtime channel not connected, dropping frame");
            return false;
        };
        outbound.send(Frame::send(destination, body)).is_ok()
    }

    /// [`send`](Self::send) with a JSON-encoded payload.
    pub fn send_json<T: Serialize + ?Sized>(&self, destination: &str, payload: &T) -> bool {
        match serde_json::to_string(payload) {
            Ok(body) => self.send(destination, body),
            Err(e) => {
                warn!(error = %e, destination, "failed to encode realtime payload");
                false
            }
        }
    }

    /// Register interest in `destination`. The subscription survives
    /// reconnects. Returns the subscription id.
    pub fn subscribe(&self, destination: &str) -> String {
        let n = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        let id = format!("sub-{n}");
        self.inner
            .subscriptions
            .insert(id.clone(), destination.to_owned());

        if let Some(outbound) = self.inner.outbound() {
            let _ = outbound.send(Frame::subscribe(&id, destination));
        }
        debug!(id, destination, "subscribed");
        id
    }

    pub fn unsubscribe(&self, id: &str) {
        if self.inner.subscriptions.remove(id).is_none() {
            return;
        }
        if let Some(outbound) = self.inner.outbound() {
            let _ = outbound.send(Frame::unsubscribe(id));
        }
    }

    /// Receiver for every `MESSAGE` frame, across all subscriptions.
    pub fn messages(&self) -> broadcast::Receiver<Arc<RealtimeMessage>> {
        self.inner.messages.subscribe()
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("url", &self.inner.config.url.as_str())
            .field("state", &self.state())
            .field("subscriptions", &self.inner.subscriptions.len())
            .finish_non_exhaustive()
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// connect → read until drop → wait `reconnect_delay` → connect again.
async fn connection_loop(
    inner: Arc<Inner>,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    cancel: CancellationToken,
    finished: CancellationToken,
) {
    let _finished = finished.drop_guard();
    loop {
        // The token is re-read per attempt so an expired session stops the loop.
        let Some(token) = inner.session.token() else {
            info!("credential gone, stopping realtime reconnects");
            inner.set_state(&cancel, ConnectionState::Disconnected);
            break;
        };

        inner.set_state(&cancel, ConnectionState::Connecting);
        match run_connection(&inner, &token, &mut outbound, &cancel).await {
            Ok(()) => info!("realtime connection closed"),
            Err(e) => warn!(error = %e, "realtime connection lost"),
        }

        if cancel.is_cancelled() {
            break;
        }

        inner.set_state(&cancel, ConnectionState::Connecting);
        let delay = inner.config.reconnect_delay;
        debug!(delay_ms = delay.as_millis(), "waiting before reconnect");

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("realtime loop exiting");
}

// ── Broker-side subscriptions ────────────────────────────────────────

/// Subscription ids the broker has been told about on the current socket.
///
/// [`reconcile`](Self::reconcile) diffs this against the registry, so a
/// `subscribe()` that lands while CONNECTED is being handled still reaches
/// the broker, and [`admit`](Self::admit) drops queued frames the diff
/// already covered.
#[derive(Debug, Default)]
struct BrokerSubscriptions {
    ids: HashSet<String>,
}

impl BrokerSubscriptions {
    /// SUBSCRIBE/UNSUBSCRIBE frames that bring the broker in line with
    /// `registered`.
    fn reconcile(&mut self, registered: &DashMap<String, String>) -> Vec<Frame> {
        let mut frames = Vec::new();
        for entry in registered {
            if self.ids.insert(entry.key().clone()) {
                frames.push(Frame::subscribe(entry.key(), entry.value()));
            }
        }
        self.ids.retain(|id| {
            let keep = registered.contains_key(id);
            if !keep {
                frames.push(Frame::unsubscribe(id));
            }
            keep
        });
        frames
    }

    /// Whether a queued frame still needs writing.
    fn admit(&mut self, frame: &Frame) -> bool {
        match (frame.command, frame.get("id")) {
            (Command::Subscribe, Some(id)) => self.ids.insert(id.to_owned()),
            (Command::Unsubscribe, Some(id)) => self.ids.remove(id),
            _ => true,
        }
    }
}

// ── Single connection lifecycle ──────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

async fn run_connection(
    inner: &Inner,
    token: &SecretString,
    outbound: &mut mpsc::UnboundedReceiver<Frame>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let url = &inner.config.url;
    info!(url = %url, "connecting realtime channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        result = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri)) => {
            result.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let result = drive(inner, token, &mut write, &mut read, outbound, cancel).await;
    if result.is_err() {
        // Best effort: the peer may already be gone.
        let _ = write.close().await;
    }
    result
}

async fn write_frame(write: &mut WsWrite, frame: &Frame) -> Result<(), Error> {
    write
        .send(Message::text(frame.encode()))
        .await
        .map_err(ws_error)
}

/// Speak STOMP over an open socket until it drops or `cancel` fires.
#[allow(clippy::too_many_lines)]
async fn drive(
    inner: &Inner,
    token: &SecretString,
    write: &mut WsWrite,
    read: &mut WsRead,
    outbound: &mut mpsc::UnboundedReceiver<Frame>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let url = &inner.config.url;
    let heartbeat = inner.config.heartbeat;
    let bearer = format!("Bearer {}", token.expose_secret());
    let connect = Frame::connect(url.host_str().unwrap_or_default(), heartbeat, Some(&bearer));
    write_frame(write, &connect).await?;

    let started = Instant::now();
    let mut connected = false;
    let mut subscribed = BrokerSubscriptions::default();
    let mut outgoing: Option<Duration> = None;
    let mut incoming: Option<Duration> = None;
    let mut last_seen = Instant::now();
    let mut last_sent = Instant::now();

    let tick_period = if heartbeat.is_zero() {
        Duration::from_secs(1)
    } else {
        (heartbeat / 2).max(MIN_TICK)
    };
    let mut ticker = tokio::time::interval(tick_period);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if connected {
                    while let Ok(frame) = outbound.try_recv() {
                        if subscribed.admit(&frame) {
                            let _ = write_frame(write, &frame).await;
                        }
                    }
                    let _ = write_frame(write, &Frame::disconnect()).await;
                }
                let _ = write.close().await;
                return Ok(());
            }
            frame = read.next() => {
                last_seen = Instant::now();
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        for inbound in Frame::decode_all(&text)? {
                            let Inbound::Frame(frame) = inbound else {
                                trace!("heart-beat received");
                                continue;
                            };
                            match frame.command {
                                Command::Connected => {
                                    (outgoing, incoming) =
                                        negotiate_heartbeat(heartbeat, frame.get("heart-beat"));
                                    connected = true;

                                    // No queuing: frames from before this connection are stale.
                                    while outbound.try_recv().is_ok() {}

                                    for sub in subscribed.reconcile(&inner.subscriptions) {
                                        write_frame(write, &sub).await?;
                                    }
                                    inner.set_state(cancel, ConnectionState::Connected);

                                    // Registrations made while the first pass was being written
                                    // saw no outbound queue.
                                    for sub in subscribed.reconcile(&inner.subscriptions) {
                                        write_frame(write, &sub).await?;
                                    }
                                    last_sent = Instant::now();
                                    info!(?outgoing, ?incoming, "realtime channel connected");
                                }
                                Command::Message => {
                                    let message = RealtimeMessage::from_frame(frame);
                                    trace!(destination = %message.destination, "realtime message");
                                    // No subscribers is fine: the message is simply dropped.
                                    let _ = inner.messages.send(Arc::new(message));
                                }
                                Command::Error => {
                                    let reason = frame
                                        .get("message")
                                        .map_or_else(|| frame.body.clone(), str::to_owned);
                                    return Err(Error::Stomp(reason));
                                }
                                other => debug!(command = %other, "ignoring frame"),
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        trace!("websocket ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let Some(cf) = frame else {
                            info!("websocket close frame received (no payload)");
                            return Ok(());
                        };
                        info!(code = %cf.code, reason = %cf.reason, "websocket close frame received");
                        if cf.code == CloseCode::Normal {
                            return Ok(());
                        }
                        return Err(Error::WebSocketClosed {
                            code: u16::from(cf.code),
                            reason: cf.reason.to_string(),
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ws_error(e)),
                    None => {
                        info!("websocket stream ended");
                        return Ok(());
                    }
                }
            }
            Some(frame) = outbound.recv(), if connected => {
                if subscribed.admit(&frame) {
                    write_frame(write, &frame).await?;
                    last_sent = Instant::now();
                }
            }
            _ = ticker.tick() => {
                if !connected {
                    if started.elapsed() > CONNECT_TIMEOUT {
                        return Err(Error::Stomp("broker never answered CONNECT".into()));
                    }
                    continue;
                }
                if let Some(interval) = outgoing {
                    if last_sent.elapsed() >= interval {
                        write
                            .send(Message::text(HEARTBEAT.to_owned()))
                            .await
                            .map_err(ws_error)?;
                        last_sent = Instant::now();
                    }
                }
                if let Some(interval) = incoming {
                    let silent = last_seen.elapsed();
                    if silent > interval * 2 {
                        return Err(Error::HeartbeatTimeout {
                            elapsed_ms: u64::try_from(silent.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                }
            }
        }
    }
}

fn ws_error(e: tungstenite::Error) -> Error {
    Error::WebSocketConnect(e.to_string())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryNavigator, MemoryTokenStore};

    fn channel(token: Option<&str>) -> RealtimeChannel {
        let store = token.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_token);
        let session = Arc::new(Session::new(Arc::new(store), Arc::new(MemoryNavigator::new())));
        let config = RealtimeConfig::for_website(&Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        RealtimeChannel::new(config, session)
    }

    #[test]
    fn endpoint_derived_from_website_url() {
        let https = RealtimeConfig::for_website(&Url::parse("https://stream.example.com").unwrap())
            .unwrap();
        assert_eq!(https.url.as_str(), "wss://stream.example.com/api/ws/websocket");
        assert_eq!(https.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        assert_eq!(https.heartbeat, DEFAULT_HEARTBEAT);

        let http = RealtimeConfig::for_website(&Url::parse("http://localhost:8080/api/").unwrap())
            .unwrap();
        assert_eq!(http.url.as_str(), "ws://localhost:8080/api/ws/websocket");
    }

    #[test]
    fn connect_without_token_is_a_no_op() {
        let channel = channel(None);
        channel.connect();
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn disconnect_twice_is_safe() {
        let channel = channel(Some("abc123"));
        channel.disconnect();
        channel.disconnect();
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn send_while_disconnected_is_dropped() {
        let channel = channel(Some("abc123"));
        assert!(!channel.send("/app/ping", "{}"));
        assert!(!channel.send_json("/app/ping", &serde_json::json!({ "n": 1 })));
    }

    #[test]
    fn subscriptions_are_recorded_while_disconnected() {
        let channel = channel(None);
        let a = channel.subscribe("/user/queue/notifications");
        let b = channel.subscribe("/topic/releases");
        assert_ne!(a, b);
        assert_eq!(channel.inner.subscriptions.len(), 2);
        channel.unsubscribe(&a);
        assert_eq!(channel.inner.subscriptions.len(), 1);
    }

    #[test]
    fn late_registrations_are_reconciled_once() {
        let registered = DashMap::new();
        registered.insert("sub-0".to_owned(), "/user/queue/notifications".to_owned());

        let mut broker = BrokerSubscriptions::default();
        let first = broker.reconcile(&registered);
        assert_eq!(first, vec![Frame::subscribe("sub-0", "/user/queue/notifications")]);

        // Registered while the first pass was written, before any queue existed.
        registered.insert("sub-1".to_owned(), "/topic/releases".to_owned());
        let second = broker.reconcile(&registered);
        assert_eq!(second, vec![Frame::subscribe("sub-1", "/topic/releases")]);

        // Nothing left to say, and the queued copy is not written twice.
        assert!(broker.reconcile(&registered).is_empty());
        assert!(!broker.admit(&Frame::subscribe("sub-1", "/topic/releases")));
        assert!(broker.admit(&Frame::send("/app/ping", "{}")));
    }

    #[test]
    fn dropped_registrations_are_unsubscribed() {
        let registered = DashMap::new();
        registered.insert("sub-0".to_owned(), "/topic/releases".to_owned());
        let mut broker = BrokerSubscriptions::default();
        broker.reconcile(&registered);

        registered.remove("sub-0");
        assert_eq!(broker.reconcile(&registered), vec![Frame::unsubscribe("sub-0")]);
        assert!(!broker.admit(&Frame::unsubscribe("sub-0")));
    }

    #[test]
    fn message_json_decodes_body() {
        let frame = Frame::new(Command::Message)
            .header("destination", "/topic/x")
            .with_body(r#"{"n":3}"#);
        let message = RealtimeMessage::from_frame(frame);
        assert_eq!(message.destination, "/topic/x");
        let value: serde_json::Value = message.json().unwrap();
        assert_eq!(value["n"], 3);
    }
}
