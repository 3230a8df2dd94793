//! Translation of raw window input into mod callback arguments.

use serde::{Deserialize, Serialize};

/// Scroll input as reported by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "delta", rename_all = "snake_case")]
pub enum ScrollDelta {
    /// Wheel notches; passed through unchanged.
    Lines(f32),
    /// Touchpad pixels; the sign is flipped so that both units zoom the
    /// same way.
    Pixels(f64),
}

impl ScrollDelta {
    /// Scroll amount handed to `GameMod::scroll`.
    pub fn amount(self) -> f32 {
        match self {
            ScrollDelta::Lines(lines) => lines,
            ScrollDelta::Pixels(pixels) if pixels == 0.0 => 0.0,
            ScrollDelta::Pixels(pixels) => -(pixels as f32),
        }
    }
}

impl From<f32> for ScrollDelta {
    fn from(lines: f32) -> Self {
        ScrollDelta::Lines(lines)
    }
}
