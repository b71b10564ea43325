use tokio::sync::mpsc::{channel, Sender};

use system::chrono::{DateTime, Utc};
use system::{ClientStroke, ConnectionId, ServerMessage, StrokeSettings};

use crate::connection::ConnectionEvent;
use crate::server_state::ServerState;
use crate::topic::{ConnectionTx, Topic};

pub type ServerTx = Sender<ServerCommand>;

const SERVER_BUFFER: usize = 256;

#[derive(Debug)]
pub enum ServerCommand {
    Connect {
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    Stroke {
        from: ConnectionId,
        stroke: ClientStroke,
    },
    /// Drop every stroke that expired by `now`.
    Sweep {
        now: DateTime<Utc>,
    },
}

/// Sole owner of the stroke store. Commands are handled one at a time, so
/// every subscriber sees snapshots in append order.
struct Server {
    server_state: ServerState,
    topic: Topic,
}

impl Server {
    fn new(settings: StrokeSettings) -> Self {
        Self {
            server_state: ServerState::new(settings),
            topic: Topic::new(),
        }
    }

    fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connect { tx } => self.connect(tx),
            ServerCommand::Disconnect { from } => self.disconnect(&from),
            ServerCommand::Stroke { from, stroke } => {
                let now = Utc::now();
                match self.server_state.accept_stroke(&from, stroke, now) {
                    Ok(()) => {
                        let snapshot = self.server_state.live_snapshot(now);
                        self.publish(ServerMessage::Add(snapshot));
                    }
                    Err(rejected) => log::debug!("Dropping stroke: {}", rejected),
                }
            }
            ServerCommand::Sweep { now } => {
                if self.server_state.sweep(now) {
                    let snapshot = self.server_state.live_snapshot(now);
                    self.publish(ServerMessage::Init(snapshot));
                }
            }
        }
    }

    fn connect(&mut self, tx: ConnectionTx) {
        let session = self.server_state.create_session();
        let connection_id = session.connection_id;
        let config = ServerMessage::Config(session.color.clone());

        let greeted = tx
            .try_send(ConnectionEvent::Connected { connection_id })
            .and_then(|_| tx.try_send(ConnectionEvent::Message(config.into())));
        if greeted.is_err() {
            log::warn!("Connection {} went away before it was greeted", connection_id);
            self.server_state.remove_session(&connection_id);
            return;
        }

        self.topic.subscribe(connection_id, tx);
        log::info!(
            "Connection {} joined, {} connected",
            connection_id,
            self.topic.len()
        );

        let snapshot = self.server_state.live_snapshot(Utc::now());
        self.publish(ServerMessage::Init(snapshot));
    }

    fn disconnect(&mut self, connection_id: &ConnectionId) {
        let subscribed = self.topic.unsubscribe(connection_id).is_some();
        if self.server_state.remove_session(connection_id).is_some() || subscribed {
            log::info!(
                "Connection {} left, {} connected",
                connection_id,
                self.topic.len()
            );
        }
    }

    fn publish(&mut self, message: ServerMessage) {
        for connection_id in self.topic.publish(message) {
            self.server_state.remove_session(&connection_id);
        }
    }
}

pub fn spawn_server(settings: StrokeSettings) -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ServerCommand>(SERVER_BUFFER);

    tokio::spawn(async move {
        let mut server = Server::new(settings);

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("Server stopped");
    });

    srv_tx
}
