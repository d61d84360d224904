//! Per-connection task.
//!
//! One task per WebSocket connection:
//! - handshake: read `roomId` / `username` from the upgrade request query
//!   and join the room (or close straight away if either is missing);
//! - then select over inbound frames, the session's outbound queue and the
//!   heartbeat tick until the connection ends;
//! - finally tell the room the session has left, exactly once.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use retro_core::{ServerEvent, SessionId};
use retro_protocol::{decode_input, encode_output, Handshake};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::registry::RoomRegistry;
use crate::types::{RoomCommand, RoomTx};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Why the session loop ended.
#[derive(Debug)]
enum Exit {
    PeerClosed,
    Detached,
    RoomGone,
    Idle,
    WriteFailed,
}

/// Run the I/O loop for a single connection.
pub async fn run_client(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<RoomRegistry>,
    config: Arc<Config>,
) -> anyhow::Result<()> {
    let mut query: Option<String> = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        query = req.uri().query().map(str::to_owned);
        Ok(resp)
    };
    let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
    .await
    .context("websocket handshake failed")?;

    let handshake = match Handshake::from_query(query.as_deref()) {
        Ok(handshake) => handshake,
        Err(e) => {
            info!(%peer, error = %e, "handshake rejected");
            let _ = ws.close(None).await;
            return Ok(());
        }
    };

    let session = registry.next_session_id();
    let (out_tx, out_rx) = mpsc::channel(config.outbound_queue);
    let room_tx = registry
        .join(&handshake.room_id, session, &handshake.username, out_tx)
        .await;

    info!(%peer, room = %handshake.room_id, user = %handshake.username, %session, "connected");

    let (sink, stream) = ws.split();
    let exit = run_session(session, &room_tx, sink, stream, out_rx, &config).await;

    // Exactly one leave per session, however the loop ended.
    let _ = room_tx.send(RoomCommand::Leave { session });

    info!(%peer, room = %handshake.room_id, user = %handshake.username, %session, reason = ?exit, "disconnected");
    Ok(())
}

async fn run_session(
    session: SessionId,
    room_tx: &RoomTx,
    mut sink: WsSink,
    mut stream: WsStream,
    mut out_rx: mpsc::Receiver<Arc<ServerEvent>>,
    config: &Config,
) -> Exit {
    let write_timeout = config.write_timeout();
    let mut heartbeat = config.heartbeat_interval().map(|period| {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        (interval, period)
    });
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            frame = stream.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        debug!(%session, error = %e, "read error");
                        return Exit::PeerClosed;
                    }
                    None => return Exit::PeerClosed,
                };
                last_seen = Instant::now();

                match frame {
                    Message::Text(text) => {
                        if text.len() > config.max_message_bytes {
                            warn!(%session, len = text.len(), "oversized message dropped");
                            continue;
                        }
                        match decode_input(text.as_str()) {
                            Ok(op) => {
                                // Only fails once the room task has retired: this session
                                // was detached (replaced or rejected), the room then
                                // emptied, and the frame raced the queue closing.
                                if room_tx.send(RoomCommand::Apply { session, op }).is_err() {
                                    let _ = write_event(&mut sink, &ServerEvent::RoomNotFound, write_timeout).await;
                                    let _ = sink.send(Message::Close(None)).await;
                                    return Exit::RoomGone;
                                }
                            }
                            Err(e) => warn!(%session, error = %e, "invalid message dropped"),
                        }
                    }
                    Message::Binary(data) => {
                        warn!(%session, len = data.len(), "binary message dropped");
                    }
                    Message::Close(_) => return Exit::PeerClosed,
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                }
            }

            event = out_rx.recv() => {
                match event {
                    Some(event) => {
                        if let Err(e) = write_event(&mut sink, &event, write_timeout).await {
                            debug!(%session, error = %e, "write failed");
                            return Exit::WriteFailed;
                        }
                    }
                    None => {
                        // Detached by the room (replaced or rejected).
                        let _ = time::timeout(write_timeout, sink.send(Message::Close(None))).await;
                        return Exit::Detached;
                    }
                }
            }

            _ = next_tick(&mut heartbeat) => {
                if let Some((_, period)) = &heartbeat {
                    if last_seen.elapsed() >= *period * 2 {
                        return Exit::Idle;
                    }
                }
                let ping = time::timeout(write_timeout, sink.send(Message::Ping(Default::default())));
                if !matches!(ping.await, Ok(Ok(()))) {
                    return Exit::WriteFailed;
                }
            }
        }
    }
}

async fn next_tick(heartbeat: &mut Option<(Interval, Duration)>) {
    match heartbeat {
        Some((interval, _)) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn write_event(
    sink: &mut WsSink,
    event: &ServerEvent,
    write_timeout: Duration,
) -> anyhow::Result<()> {
    let text = encode_output(event)?;
    time::timeout(write_timeout, sink.send(Message::text(text)))
        .await
        .context("write timed out")??;
    Ok(())
}
