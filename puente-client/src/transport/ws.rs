//! STOMP over WebSocket (`tokio-tungstenite`)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, error::Elapsed};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BrokerTransport, EVENT_CAPACITY, TransportEvent};
use crate::config::StompConfig;
use crate::error::TransportError;
use crate::stomp::{Command, Frame, HEARTBEAT, Heartbeat, SUB_PROTOCOLS};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Frames queued for the writer task
const OUTBOUND_CAPACITY: usize = 64;
/// Grace period for DISCONNECT on deactivate
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Shared end-of-session state of one session's reader and writer
#[derive(Clone)]
struct SessionGuard {
    ended: Arc<AtomicBool>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    events: mpsc::Sender<TransportEvent>,
}

impl SessionGuard {
    /// End the session on failure; only the first report is emitted
    async fn fail(&self, event: TransportEvent) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.connected.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        warn!(?event, "STOMP session ended");
        let _ = self.events.send(event).await;
    }

    /// End the session on request; nothing is emitted
    fn close(&self) {
        self.ended.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

struct Session {
    outbound: mpsc::Sender<String>,
    guard: SessionGuard,
    writer: JoinHandle<()>,
}

/// STOMP 1.2 client over a WebSocket
pub struct StompWsTransport {
    url: String,
    config: StompConfig,
    events: mpsc::Sender<TransportEvent>,
    session: Mutex<Option<Session>>,
    connected: Arc<AtomicBool>,
    next_subscription: AtomicU32,
}

impl StompWsTransport {
    /// Create the transport and the receiver of its session events
    pub fn new(
        url: impl Into<String>,
        config: StompConfig,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CAPACITY);
        let transport = Self {
            url: url.into(),
            config,
            events,
            session: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            next_subscription: AtomicU32::new(0),
        };
        (transport, rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// WebSocket handshake, CONNECT, wait for CONNECTED
    async fn open(&self) -> Result<(WsStream, Heartbeat), TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connection(format!("Invalid URL {}: {e}", self.url)))?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(SUB_PROTOCOLS),
        );
        let host = self
            .config
            .virtual_host
            .clone()
            .or_else(|| request.uri().host().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string());

        let (mut ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::Connection(format!("{}: {e}", self.url)))?;

        let connect = Frame::connect(
            &host,
            self.config.heartbeat_outgoing,
            self.config.heartbeat_incoming,
        );
        ws.send(Message::text(connect.encode()))
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        while let Some(msg) = ws.next().await {
            let text = match msg.map_err(|e| TransportError::Connection(e.to_string()))? {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Message::Close(_) => break,
                _ => continue,
            };
            for frame in Frame::decode_all(&text)? {
                match frame.command {
                    Command::Connected => {
                        let heartbeat = Heartbeat::negotiate(
                            self.config.heartbeat_outgoing,
                            self.config.heartbeat_incoming,
                            frame.get("heart-beat"),
                        );
                        debug!(
                            version = frame.get("version").unwrap_or("1.0"),
                            ?heartbeat,
                            "STOMP CONNECTED"
                        );
                        return Ok((ws, heartbeat));
                    }
                    Command::Error => {
                        let reason = frame.get("message").unwrap_or(&frame.body).to_string();
                        return Err(TransportError::Rejected(reason));
                    }
                    _ => {}
                }
            }
        }

        Err(TransportError::Connection(
            "Socket closed during STOMP handshake".to_string(),
        ))
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), TransportError> {
        let outbound = {
            let session = self.session.lock();
            session
                .as_ref()
                .filter(|_| self.is_connected())
                .map(|s| s.outbound.clone())
        }
        .ok_or(TransportError::NotConnected)?;

        outbound
            .send(frame.encode())
            .await
            .map_err(|_| TransportError::ConnectionLost("STOMP session closed".to_string()))
    }
}

#[async_trait]
impl BrokerTransport for StompWsTransport {
    async fn activate(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }

        let (ws, heartbeat) = tokio::time::timeout(self.config.connect_timeout, self.open())
            .await
            .map_err(|_| TransportError::Timeout(format!("STOMP handshake with {}", self.url)))??;

        let (sink, source) = ws.split();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let guard = SessionGuard {
            ended: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            connected: self.connected.clone(),
            events: self.events.clone(),
        };

        if let Some(stale) = self.session.lock().take() {
            stale.guard.close();
        }
        self.connected.store(true, Ordering::SeqCst);
        self.next_subscription.store(0, Ordering::SeqCst);

        let writer = tokio::spawn(write_loop(
            sink,
            outbound_rx,
            heartbeat.outgoing,
            guard.clone(),
        ));
        tokio::spawn(read_loop(source, heartbeat.incoming, guard.clone()));

        *self.session.lock() = Some(Session {
            outbound,
            guard,
            writer,
        });

        info!(url = %self.url, "STOMP session established");
        Ok(())
    }

    async fn deactivate(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.guard.close();
            let _ = tokio::time::timeout(DISCONNECT_GRACE, session.writer).await;
            info!(url = %self.url, "STOMP session closed");
        }
    }

    async fn subscribe(&self, destination: &str) -> Result<(), TransportError> {
        let id = format!(
            "sub-{}",
            self.next_subscription.fetch_add(1, Ordering::SeqCst)
        );
        self.send_frame(Frame::subscribe(&id, destination)).await?;
        info!(%destination, %id, "Subscribed");
        Ok(())
    }

    async fn publish(
        &self,
        destination: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), TransportError> {
        self.send_frame(Frame::send(destination, body, headers)).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn tick(beat: &mut Option<Interval>) {
    match beat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn write_loop(
    mut sink: WsSink,
    mut outbound: mpsc::Receiver<String>,
    heartbeat: Option<Duration>,
    guard: SessionGuard,
) {
    let mut beat = heartbeat.map(|period| tokio::time::interval_at(Instant::now() + period, period));

    loop {
        let text = tokio::select! {
            _ = guard.cancel.cancelled() => {
                let _ = sink.send(Message::text(Frame::disconnect().encode())).await;
                let _ = sink.close().await;
                return;
            }
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => return,
            },
            _ = tick(&mut beat) => HEARTBEAT.to_string(),
        };

        if let Err(e) = sink.send(Message::text(text)).await {
            guard
                .fail(TransportEvent::WebSocketError(e.to_string()))
                .await;
            return;
        }
    }
}

type Received = Result<Option<Result<Message, tungstenite::Error>>, Elapsed>;

async fn next_within(source: &mut WsSource, limit: Option<Duration>) -> Received {
    match limit {
        Some(limit) => tokio::time::timeout(limit, source.next()).await,
        None => Ok(source.next().await),
    }
}

async fn read_loop(mut source: WsSource, heartbeat: Option<Duration>, guard: SessionGuard) {
    // Broker silence beyond two periods means the connection is dead
    let silence_limit = heartbeat.map(|period| period * 2);

    loop {
        let received = tokio::select! {
            _ = guard.cancel.cancelled() => return,
            received = next_within(&mut source, silence_limit) => received,
        };

        let text = match received {
            Err(_) => {
                guard
                    .fail(TransportEvent::WebSocketError(
                        "Broker heart-beat lost".to_string(),
                    ))
                    .await;
                return;
            }
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => {
                guard.fail(TransportEvent::Closed).await;
                return;
            }
            Ok(Some(Err(e))) => {
                guard
                    .fail(TransportEvent::WebSocketError(e.to_string()))
                    .await;
                return;
            }
            Ok(Some(Ok(Message::Text(text)))) => text.as_str().to_owned(),
            Ok(Some(Ok(Message::Binary(bytes)))) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Some(Ok(_))) => continue,
        };

        let frames = match Frame::decode_all(&text) {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable STOMP frame");
                continue;
            }
        };

        for frame in frames {
            match frame.command {
                Command::Message => {
                    let destination = frame.get("destination").unwrap_or_default().to_string();
                    let event = TransportEvent::Message {
                        destination,
                        body: frame.body,
                    };
                    if guard.events.send(event).await.is_err() {
                        return;
                    }
                }
                Command::Error => {
                    let message = frame.get("message").map(str::to_string);
                    let reason = match message {
                        Some(message) if frame.body.is_empty() => message,
                        Some(message) => format!("{message}: {}", frame.body),
                        None => frame.body,
                    };
                    guard.fail(TransportEvent::StompError(reason)).await;
                    return;
                }
                other => debug!(command = other.as_str(), "Ignoring STOMP frame"),
            }
        }
    }
}
