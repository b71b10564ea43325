use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_http::ws::{Codec, Item};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;

use system::{ClientStroke, ConnectionId, ServerMessage};

use crate::server::{ServerCommand, ServerTx};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// Capacity of the per-connection egress channel.
pub const CONNECTION_BUFFER: usize = 32;

/// Largest inbound message, single frame or reassembled, in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WsSettings {
    pub max_frame_size: usize,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Server side frame codec honoring `settings`.
pub fn frame_codec(settings: &WsSettings) -> Codec {
    Codec::new().max_size(settings.max_frame_size)
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    Message(Arc<ServerMessage>),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

/// The server dropped our egress channel.
#[derive(Message)]
#[rtype(result = "()")]
struct EgressClosed;

enum ConnectionState {
    Connecting,
    Active(ConnectionId),
    Closed,
}

/// What became of one inbound text message.
#[derive(Debug, PartialEq)]
enum Ingress {
    Forwarded,
    Ignored,
    /// The server cannot take the stroke; the connection has to resync.
    Stalled,
}

#[derive(Debug, Error, PartialEq)]
enum FragmentError {
    #[error("continuation frame out of sequence")]
    OutOfSequence,
    #[error("fragmented message exceeds {0} bytes")]
    TooLarge(usize),
    #[error("fragmented text is not valid UTF-8")]
    InvalidUtf8,
}

/// Reassembly of a message split over continuation frames.
enum Fragments {
    Idle,
    Text(Vec<u8>),
    Binary(usize),
}

impl Fragments {
    /// Returns the whole text once its last fragment arrives.
    fn push(&mut self, item: Item, limit: usize) -> Result<Option<String>, FragmentError> {
        let check = |len: usize| {
            if len > limit {
                Err(FragmentError::TooLarge(limit))
            } else {
                Ok(())
            }
        };

        match (std::mem::replace(self, Fragments::Idle), item) {
            (Fragments::Idle, Item::FirstText(bytes)) => {
                check(bytes.len())?;
                *self = Fragments::Text(bytes.to_vec());
                Ok(None)
            }
            (Fragments::Idle, Item::FirstBinary(bytes)) => {
                check(bytes.len())?;
                *self = Fragments::Binary(bytes.len());
                Ok(None)
            }
            (Fragments::Text(mut buf), Item::Continue(bytes)) => {
                check(buf.len() + bytes.len())?;
                buf.extend_from_slice(&bytes);
                *self = Fragments::Text(buf);
                Ok(None)
            }
            (Fragments::Text(mut buf), Item::Last(bytes)) => {
                check(buf.len() + bytes.len())?;
                buf.extend_from_slice(&bytes);
                String::from_utf8(buf)
                    .map(Some)
                    .map_err(|_| FragmentError::InvalidUtf8)
            }
            (Fragments::Binary(len), Item::Continue(bytes)) => {
                check(len + bytes.len())?;
                *self = Fragments::Binary(len + bytes.len());
                Ok(None)
            }
            (Fragments::Binary(len), Item::Last(bytes)) => {
                check(len + bytes.len())?;
                log::debug!(
                    "Dropping fragmented binary message of {} bytes",
                    len + bytes.len()
                );
                Ok(None)
            }
            _ => Err(FragmentError::OutOfSequence),
        }
    }
}

struct ConnectionActor {
    state: ConnectionState,
    srv_tx: ServerTx,
    settings: WsSettings,
    fragments: Fragments,
    last_heard: Instant,
}

impl ConnectionActor {
    fn new(srv_tx: ServerTx, settings: WsSettings) -> Self {
        Self {
            state: ConnectionState::Connecting,
            srv_tx,
            settings,
            fragments: Fragments::Idle,
            last_heard: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heard) > CLIENT_TIMEOUT {
                log::warn!("Connection timed out, closing");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_text(&mut self, text: &str) -> Ingress {
        let from = match self.state {
            ConnectionState::Active(connection_id) => connection_id,
            _ => {
                log::debug!("Dropping frame received outside an active session");
                return Ingress::Ignored;
            }
        };

        let stroke = match ClientStroke::from_json(text) {
            Ok(stroke) => stroke,
            Err(err) => {
                log::debug!("Dropping malformed frame from {}: {}", from, err);
                return Ingress::Ignored;
            }
        };

        match self.srv_tx.try_send(ServerCommand::Stroke { from, stroke }) {
            Ok(()) => Ingress::Forwarded,
            Err(TrySendError::Full(_)) => {
                log::warn!("Server is saturated, closing {} so it resyncs", from);
                Ingress::Stalled
            }
            Err(TrySendError::Closed(_)) => {
                log::warn!("Server is gone, closing {}", from);
                Ingress::Stalled
            }
        }
    }

    /// `Active → Closed`. The disconnect is delivered even when the server
    /// queue is momentarily full.
    fn leave(&mut self) {
        if let ConnectionState::Active(from) =
            std::mem::replace(&mut self.state, ConnectionState::Closed)
        {
            log::info!("Connection {} closed", from);
            let srv_tx = self.srv_tx.clone();
            tokio::spawn(async move {
                if srv_tx.send(ServerCommand::Disconnect { from }).await.is_err() {
                    log::debug!("Server stopped before {} left", from);
                }
            });
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);

        let (tx, mut rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(CONNECTION_BUFFER);

        if let Err(err) = self.srv_tx.try_send(ServerCommand::Connect { tx }) {
            log::error!("Cannot register connection: {}", err);
            ctx.stop();
            return;
        }

        let addr = ctx.address();

        tokio::spawn(async move {
            log::debug!("connection green thread - started");
            while let Some(event) = rx.recv().await {
                if !addr.connected() {
                    break;
                }
                addr.do_send(ConnectionActorMessage(event));
            }
            addr.do_send(EgressClosed);
            log::debug!("connection green thread - terminated");
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.leave();
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                log::warn!("WebSocket protocol error: {}", err);
                ctx.stop();
                return;
            }
        };

        self.last_heard = Instant::now();
        match msg {
            ws::Message::Ping(bytes) => ctx.pong(&bytes),
            ws::Message::Pong(_) => {}
            ws::Message::Text(text) => {
                if self.handle_text(&text) == Ingress::Stalled {
                    ctx.stop();
                }
            }
            ws::Message::Binary(bin) => {
                log::debug!("Dropping binary frame of {} bytes", bin.len());
            }
            ws::Message::Continuation(item) => {
                match self.fragments.push(item, self.settings.max_frame_size) {
                    Ok(Some(text)) => {
                        if self.handle_text(&text) == Ingress::Stalled {
                            ctx.stop();
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log::warn!("Closing connection: {}", err);
                        ctx.stop();
                    }
                }
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Nop => {}
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Connected { connection_id } => {
                log::info!("Connection {} active", connection_id);
                self.state = ConnectionState::Active(connection_id);
            }
            ConnectionEvent::Message(message) => match message.to_json() {
                Ok(text) => ctx.text(text),
                Err(err) => log::error!("Cannot encode outgoing message: {}", err),
            },
        }
    }
}

impl Handler<EgressClosed> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, _: EgressClosed, ctx: &mut ws::WebsocketContext<Self>) -> Self::Result {
        if let ConnectionState::Active(connection_id) = self.state {
            log::info!("Connection {} dropped by server", connection_id);
        }
        ctx.stop();
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    settings: web::Data<WsSettings>,
) -> Result<HttpResponse, Error> {
    let settings = *settings.get_ref();
    ws::WsResponseBuilder::new(
        ConnectionActor::new(srv_tx.get_ref().clone(), settings),
        &req,
        stream,
    )
    .codec(frame_codec(&settings))
    .start()
}
