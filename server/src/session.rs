use system::{assign_color, ColorConfig, ConnectionId};

pub struct Session {
    pub connection_id: ConnectionId,
    pub color: ColorConfig,
}

impl Session {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            color: assign_color(&connection_id.to_string()),
        }
    }
}
