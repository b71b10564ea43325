use chrono::{DateTime, Duration, Utc};
use euclid::default::Point2D;
use serde::{Deserialize, Serialize};

pub type ConnectionId = uuid::Uuid;

pub const DEFAULT_STROKE_TTL_SECS: i64 = 4 * 60 * 60;
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 2.0;

/// A point in shared canvas coordinates, in the shape clients put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Point2D<f64> {
    fn from(p: Position) -> Self {
        Point2D::new(p.x, p.y)
    }
}

impl From<Point2D<f64>> for Position {
    fn from(p: Point2D<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// An accepted, already simplified stroke. Nothing about it changes once it is
/// built; the store only decides whether it is still alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    color: String,
    #[serde(rename = "decay")]
    expires_at: DateTime<Utc>,
    positions: Vec<Position>,
}

impl Stroke {
    /// `positions` must not be empty.
    pub fn new(color: String, positions: Vec<Position>, expires_at: DateTime<Utc>) -> Self {
        debug_assert!(!positions.is_empty(), "stroke without positions");
        Self {
            color,
            expires_at,
            positions,
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Parameters every accepted stroke goes through. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSettings {
    pub ttl: Duration,
    pub tolerance: f64,
}

impl StrokeSettings {
    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }
}

impl std::default::Default for StrokeSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_STROKE_TTL_SECS),
            tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
        }
    }
}
