//! Key hit-zone layout
//!
//! Each letter owns a random point on the play area. Pointer and touch hits
//! resolve to the closest letter; key presses explode at the letter's point.

use glam::Vec2;
use rand::Rng;

use crate::Viewport;

pub const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Default)]
pub struct KeyLayout {
    keys: Vec<(String, Vec2)>,
}

impl KeyLayout {
    pub fn new<R: Rng>(rng: &mut R, viewport: &Viewport) -> Self {
        let mut layout = Self::default();
        layout.rebuild(rng, viewport);
        layout
    }

    /// Re-place every letter for a new viewport
    pub fn rebuild<R: Rng>(&mut self, rng: &mut R, viewport: &Viewport) {
        self.keys = LETTERS
            .chars()
            .map(|c| {
                let pos = Vec2::new(
                    rng.random::<f32>() * viewport.width,
                    rng.random::<f32>() * viewport.height,
                );
                (c.to_string(), pos)
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<Vec2> {
        self.keys.iter().find(|(k, _)| k == key).map(|(_, p)| *p)
    }

    /// Closest letter to `pos`
    pub fn nearest(&self, pos: Vec2) -> Option<&str> {
        self.keys
            .iter()
            .min_by(|(_, a), (_, b)| a.distance_squared(pos).total_cmp(&b.distance_squared(pos)))
            .map(|(k, _)| k.as_str())
    }
}
