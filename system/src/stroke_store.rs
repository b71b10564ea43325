use chrono::{DateTime, Utc};

use crate::types::Stroke;

/// Live strokes in the order they were accepted. Insertion order is the order
/// new subscribers replay them in.
///
/// The store itself does no locking; it is meant to have a single owner that
/// serializes `append`, `sweep` and `snapshot`.
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
}

impl StrokeStore {
    pub fn new() -> Self {
        Self {
            strokes: Vec::new(),
        }
    }

    pub fn append(&mut self, stroke: Stroke) {
        debug_assert!(!stroke.positions().is_empty());
        self.strokes.push(stroke);
    }

    /// Copy of the current strokes. Later appends or sweeps are not visible
    /// through it.
    pub fn snapshot(&self) -> Vec<Stroke> {
        self.strokes.clone()
    }

    /// Removes every stroke with `expires_at <= now`, keeping survivors in
    /// order. Returns whether anything was removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.strokes.len();
        self.strokes.retain(|stroke| !stroke.is_expired(now));
        let removed = before - self.strokes.len();
        if removed > 0 {
            log::debug!("Swept {} expired strokes, {} left", removed, self.strokes.len());
        }
        removed > 0
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}
