use std::collections::HashMap;

use system::chrono::{DateTime, Utc};
use system::{
    simplify_positions, ClientStroke, ConnectionId, Stroke, StrokeSettings, StrokeStore,
};
use thiserror::Error;

use crate::session::Session;

#[derive(Debug, Error, PartialEq)]
pub enum StrokeRejected {
    #[error("connection {0} has no active session")]
    UnknownSession(ConnectionId),
    #[error("stroke has no positions")]
    EmptyTrace,
}

pub struct ServerState {
    sessions: HashMap<ConnectionId, Session>,
    store: StrokeStore,
    settings: StrokeSettings,
}

impl ServerState {
    pub fn new(settings: StrokeSettings) -> Self {
        Self {
            sessions: HashMap::new(),
            store: StrokeStore::new(),
            settings,
        }
    }

    pub fn create_session(&mut self) -> &Session {
        let mut connection_id = ConnectionId::new_v4();
        while self.sessions.contains_key(&connection_id) {
            connection_id = ConnectionId::new_v4();
        }
        self.sessions
            .entry(connection_id)
            .or_insert_with(|| Session::new(connection_id))
    }

    pub fn remove_session(&mut self, connection_id: &ConnectionId) -> Option<Session> {
        self.sessions.remove(connection_id)
    }

    /// Drops strokes that expired by `now`. Returns whether anything was removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> bool {
        self.store.sweep(now)
    }

    /// Strokes still alive at `now`, in append order. Anything expired is
    /// swept first, so a published snapshot never carries a dead stroke.
    pub fn live_snapshot(&mut self, now: DateTime<Utc>) -> Vec<Stroke> {
        self.store.sweep(now);
        self.store.snapshot()
    }

    /// Simplifies the trace and appends it under the session's colour.
    pub fn accept_stroke(
        &mut self,
        from: &ConnectionId,
        stroke: ClientStroke,
        now: DateTime<Utc>,
    ) -> Result<(), StrokeRejected> {
        let session = self
            .sessions
            .get(from)
            .ok_or(StrokeRejected::UnknownSession(*from))?;
        if stroke.positions.is_empty() {
            return Err(StrokeRejected::EmptyTrace);
        }

        let positions = simplify_positions(&stroke.positions, self.settings.tolerance);
        log::debug!(
            "Connection {} drew {} points, kept {}",
            from,
            stroke.positions.len(),
            positions.len()
        );
        self.store.append(Stroke::new(
            session.color.color.clone(),
            positions,
            self.settings.expiry_from(now),
        ));
        Ok(())
    }
}
