//! Host-owned camera state.

use crate::error::HostError;
use ember_mod_api::Position;
use serde::{Deserialize, Serialize};

/// Rule applied to every zoom write.
///
/// `Unbounded` stores whatever value it is given, including negative and
/// NaN values. `Clamped` bounds writes to `[min, max]` and ignores NaN
/// writes, keeping the previous zoom.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ZoomPolicy {
    #[default]
    Unbounded,
    Clamped { min: f32, max: f32 },
}

impl ZoomPolicy {
    pub fn clamped(min: f32, max: f32) -> Result<Self, HostError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(HostError::InvalidZoomBounds { min, max });
        }
        Ok(ZoomPolicy::Clamped { min, max })
    }

    /// Value stored when `requested` is written over `current`.
    pub fn apply(self, current: f32, requested: f32) -> f32 {
        match self {
            ZoomPolicy::Unbounded => requested,
            ZoomPolicy::Clamped { .. } if requested.is_nan() => current,
            ZoomPolicy::Clamped { min, max } => requested.clamp(min, max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    zoom: f32,
    policy: ZoomPolicy,
    position: Position,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0, ZoomPolicy::Unbounded)
    }
}

impl Camera {
    pub fn new(zoom: f32, policy: ZoomPolicy) -> Self {
        Self {
            zoom: policy.apply(zoom, zoom),
            policy,
            position: Position::ORIGIN,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = self.policy.apply(self.zoom, zoom);
    }

    pub fn policy(&self) -> ZoomPolicy {
        self.policy
    }

    /// World position the camera is centred on.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Position is never clamped by the zoom policy.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_accepts_anything() {
        let mut camera = Camera::default();
        assert_eq!(camera.zoom(), 1.0);

        camera.set_zoom(-4.0);
        assert_eq!(camera.zoom(), -4.0);

        camera.set_zoom(f32::NAN);
        assert!(camera.zoom().is_nan());
    }

    #[test]
    fn clamped_bounds_writes() {
        let policy = ZoomPolicy::clamped(0.5, 4.0).unwrap();
        let mut camera = Camera::new(1.0, policy);

        camera.set_zoom(10.0);
        assert_eq!(camera.zoom(), 4.0);

        camera.set_zoom(-1.0);
        assert_eq!(camera.zoom(), 0.5);

        camera.set_zoom(f32::NAN);
        assert_eq!(camera.zoom(), 0.5);
    }

    #[test]
    fn clamped_rejects_bad_bounds() {
        assert!(ZoomPolicy::clamped(2.0, 1.0).is_err());
        assert!(ZoomPolicy::clamped(f32::NEG_INFINITY, 1.0).is_err());
        assert!(ZoomPolicy::clamped(1.0, 1.0).is_ok());
    }

    #[test]
    fn initial_zoom_is_clamped() {
        let camera = Camera::new(8.0, ZoomPolicy::clamped(1.0, 2.0).unwrap());
        assert_eq!(camera.zoom(), 2.0);
    }

    #[test]
    fn position_starts_at_origin_and_ignores_policy() {
        let mut camera = Camera::new(1.0, ZoomPolicy::clamped(0.5, 2.0).unwrap());
        assert_eq!(camera.position(), Position::ORIGIN);

        camera.set_position(Position::new(-300.0, 42.5));
        assert_eq!(camera.position(), Position::new(-300.0, 42.5));
        assert_eq!(camera.zoom(), 1.0);
    }
}
