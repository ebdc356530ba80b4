//! Session lifecycle
//!
//! A session serves one WebSocket with two tasks: the read loop feeds inbound
//! frames to a handler under a read deadline, the write loop drains the
//! outbound buffer and sends keepalive pings under a write deadline. Whichever
//! side stops first triggers teardown.

use super::{Hub, SessionError, SessionHandle, SessionShared, SessionState};
use crate::handlers::InboundHandler;
use crate::protocol::CloseCode;
use axum::extract::ws::Message;
use bytes::{Bytes, BytesMut};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use totalk_common::SessionSettings;
use tracing::{debug, info, trace, warn};

/// A session that has not started serving its socket yet
pub struct Session {
    shared: Arc<SessionShared>,
    outbound: mpsc::Receiver<Bytes>,
    settings: SessionSettings,
}

impl Session {
    /// Create a session and the handle to register in a hub
    pub fn new(user_id: Option<String>, settings: &SessionSettings) -> (Self, SessionHandle) {
        let shared = SessionShared::new(user_id);
        let (tx, rx) = mpsc::channel(settings.outbound_buffer.max(1));
        let session = Self {
            shared: Arc::clone(&shared),
            outbound: rx,
            settings: settings.clone(),
        };
        (session, SessionHandle::new(shared, tx))
    }

    pub fn id(&self) -> &str {
        self.shared.id()
    }

    pub fn shared(&self) -> &Arc<SessionShared> {
        &self.shared
    }

    /// Serve the socket until either loop stops, then tear down
    ///
    /// The handle must already be registered in `hub` under `key`.
    pub async fn run<W, R, E>(
        self,
        sink: W,
        stream: R,
        hub: Arc<Hub>,
        key: String,
        handler: Arc<dyn InboundHandler>,
    ) where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let Self {
            shared,
            outbound,
            settings,
        } = self;
        let session_id = shared.id().to_owned();
        let write_timeout = settings.write_timeout();

        shared.set_state(SessionState::Open);
        info!(hub = %hub.name(), session_id = %session_id, key = %key, "Session open");

        let mut reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&shared),
            handler,
            settings.read_timeout(),
        ));
        let mut writer = tokio::spawn(write_loop(sink, outbound, Arc::clone(&shared), settings));

        let writer_done = tokio::select! {
            result = &mut reader => {
                log_end("read", &session_id, result);
                false
            }
            result = &mut writer => {
                log_end("write", &session_id, result);
                reader.abort();
                true
            }
        };

        if shared.begin_teardown(CloseCode::Normal) {
            hub.unregister_connection(&key, &session_id);
        }

        // Dropping the hub handle closed the buffer; let the writer send its close frame
        if !writer_done {
            match timeout(write_timeout, &mut writer).await {
                Ok(result) => log_end("write", &session_id, result),
                Err(_) => writer.abort(),
            }
        }

        shared.set_state(SessionState::Closed);
        info!(
            hub = %hub.name(),
            session_id = %session_id,
            close_code = shared.close_code().as_u16(),
            "Session closed"
        );
    }
}

fn log_end(half: &str, session_id: &str, result: Result<Result<(), SessionError>, JoinError>) {
    match result {
        Ok(Ok(())) => debug!(session_id = %session_id, half, "Loop finished"),
        Ok(Err(e)) => debug!(session_id = %session_id, half, error = %e, "Loop ended"),
        Err(e) if e.is_cancelled() => trace!(session_id = %session_id, half, "Loop cancelled"),
        Err(e) => warn!(session_id = %session_id, half, error = %e, "Loop task failed"),
    }
}

/// Read frames until the peer leaves, the transport fails or the deadline passes
///
/// Every frame, pongs included, refreshes the deadline. Frames the handler
/// rejects are logged and skipped.
pub async fn read_loop<R, E>(
    mut stream: R,
    shared: Arc<SessionShared>,
    handler: Arc<dyn InboundHandler>,
    read_timeout: Duration,
) -> Result<(), SessionError>
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = match timeout(read_timeout, stream.next()).await {
            Err(_) => return Err(SessionError::KeepaliveTimeout(read_timeout)),
            Ok(None) => return Ok(()),
            Ok(Some(Err(e))) => return Err(SessionError::TransportClosed(e.to_string())),
            Ok(Some(Ok(frame))) => frame,
        };
        shared.touch();

        let text = match frame {
            Message::Text(text) => text,
            Message::Binary(data) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    let error = SessionError::InvalidFrame("binary frame is not UTF-8".to_string());
                    debug!(session_id = %shared.id(), error = %error, "Frame skipped");
                    continue;
                }
            },
            Message::Ping(_) | Message::Pong(_) => {
                trace!(session_id = %shared.id(), "Keepalive frame received");
                continue;
            }
            Message::Close(_) => {
                debug!(session_id = %shared.id(), "Peer closed the connection");
                return Ok(());
            }
        };

        if let Err(e) = handler.handle(&shared, &text).await {
            warn!(session_id = %shared.id(), error = %e, "Inbound frame rejected");
        }
    }
}

/// Drain the outbound buffer into the sink and keep the peer alive
///
/// Returns once the buffer is closed (after writing a close frame) or a write
/// fails or exceeds the write deadline.
pub async fn write_loop<W>(
    mut sink: W,
    mut outbound: mpsc::Receiver<Bytes>,
    shared: Arc<SessionShared>,
    settings: SessionSettings,
) -> Result<(), SessionError>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let write_timeout = settings.write_timeout();
    let ping_every = settings.ping_interval();
    let mut keepalive = interval_at(Instant::now() + ping_every, ping_every);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = outbound.recv() => {
                let Some(first) = received else {
                    let code = shared.close_code();
                    let _ = bounded(write_timeout, sink.send(Message::Close(Some(code.to_frame())))).await;
                    debug!(session_id = %shared.id(), code = code.as_u16(), "Outbound buffer closed");
                    return Ok(());
                };
                write_batch(&mut sink, first, &mut outbound, &settings).await?;
            }
            _ = keepalive.tick() => {
                bounded(write_timeout, sink.send(Message::Ping(Vec::new()))).await?;
                trace!(session_id = %shared.id(), "Ping sent");
            }
        }
    }
}

/// Write `first` plus everything already buffered behind it, in order
async fn write_batch<W>(
    sink: &mut W,
    first: Bytes,
    outbound: &mut mpsc::Receiver<Bytes>,
    settings: &SessionSettings,
) -> Result<(), SessionError>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let mut batch = vec![first];
    while batch.len() < settings.outbound_buffer {
        match outbound.try_recv() {
            Ok(next) => batch.push(next),
            Err(_) => break,
        }
    }

    if settings.coalesce {
        let mut joined = BytesMut::with_capacity(batch.iter().map(|b| b.len() + 1).sum());
        for (i, part) in batch.iter().enumerate() {
            if i > 0 {
                joined.extend_from_slice(b"\n");
            }
            joined.extend_from_slice(part);
        }
        bounded(settings.write_timeout(), sink.send(frame(joined.freeze()))).await
    } else {
        bounded(settings.write_timeout(), feed_all(sink, batch)).await
    }
}

async fn feed_all<W>(sink: &mut W, batch: Vec<Bytes>) -> Result<(), W::Error>
where
    W: Sink<Message> + Unpin,
{
    for payload in batch {
        sink.feed(frame(payload)).await?;
    }
    sink.flush().await
}

async fn bounded<F, E>(limit: Duration, op: F) -> Result<(), SessionError>
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match timeout(limit, op).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SessionError::TransportClosed(e.to_string())),
        Err(_) => Err(SessionError::TransportClosed(format!(
            "write exceeded {limit:?}"
        ))),
    }
}

/// Text frame for UTF-8 payloads, binary otherwise
fn frame(payload: Bytes) -> Message {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}
