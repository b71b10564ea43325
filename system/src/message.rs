use serde::{Deserialize, Serialize};

use crate::types::{Position, Stroke};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorConfig {
    pub color: String,
    #[serde(rename = "isLight")]
    pub is_light: bool,
}

/// Server to client frame: `{ "action": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once to a new connection only.
    Config(ColorConfig),
    /// Whole canvas; published when someone joins and after strokes expire.
    Init(Vec<Stroke>),
    /// Whole canvas; published after every accepted stroke.
    Add(Vec<Stroke>),
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A finished, not yet simplified trace as drawn by a client.
///
/// The client's own colour is accepted on the wire but the server stores the
/// colour it assigned to the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStroke {
    #[serde(default)]
    pub color: Option<String>,
    pub positions: Vec<Position>,
}

impl ClientStroke {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
