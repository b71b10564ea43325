use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use system::{ConnectionId, ServerMessage};

use crate::connection::ConnectionEvent;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

/// The broadcast group every active session belongs to.
pub struct Topic {
    subscribers: HashMap<ConnectionId, ConnectionTx>,
}

impl Topic {
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.subscribers.insert(connection_id, tx);
    }

    pub fn unsubscribe(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.subscribers.remove(connection_id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Hands `message` to every subscriber without waiting on any of them.
    ///
    /// Subscribers whose channel is closed or full are dropped from the topic
    /// and returned. Dropping the sender ends their connection, and the client
    /// resynchronizes from `init` when it reconnects.
    pub fn publish(&mut self, message: ServerMessage) -> Vec<ConnectionId> {
        let message = Arc::new(message);
        let mut dropped = Vec::new();

        for (connection_id, tx) in &self.subscribers {
            match tx.try_send(ConnectionEvent::Message(message.clone())) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Connection {} is lagging behind, dropping it", connection_id);
                    dropped.push(*connection_id);
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("Connection {} went away without leaving", connection_id);
                    dropped.push(*connection_id);
                }
            }
        }

        for connection_id in &dropped {
            self.subscribers.remove(connection_id);
        }
        dropped
    }
}
