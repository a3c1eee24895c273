//! Debug drawing primitives and system
//!
//! Immediate-mode debug output: the stepover probe draws its ray, the
//! resolver draws contact normals. Requests carry a lifetime in seconds;
//! [`DebugDrawSystem`] keeps them until they expire so an external renderer
//! can pick them up each frame.

use crate::foundation::math::{Vec3, Vec4};
use std::collections::HashMap;

/// Unique identifier for persistent debug shapes
pub type DebugShapeId = String;

/// Colors used by the collision core
pub mod colors {
    use crate::foundation::math::Vec4;

    /// Stepover ray that found a floor
    pub const PROBE_HIT: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
    /// Stepover ray that found nothing within tolerance
    pub const PROBE_MISS: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    /// Resolved contact normal
    pub const CONTACT_NORMAL: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);
    /// Contact point
    pub const CONTACT_POINT: Vec4 = Vec4::new(1.0, 0.5, 0.0, 1.0);
}

/// Sink for debug draw requests
///
/// Calls have no result the simulation depends on.
pub trait DebugDraw {
    /// Draw a line segment for `duration` seconds
    fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: f32);

    /// Draw a point for `duration` seconds
    fn draw_point(&mut self, position: Vec3, color: Vec4, size: f32, duration: f32);
}

/// Debug sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDebugDraw;

impl DebugDraw for NullDebugDraw {
    fn draw_line(&mut self, _start: Vec3, _end: Vec3, _color: Vec4, _duration: f32) {}

    fn draw_point(&mut self, _position: Vec3, _color: Vec4, _size: f32, _duration: f32) {}
}

/// Recorded draw request
#[derive(Clone, Debug, PartialEq)]
pub enum DebugShape {
    /// Segment from `start` to `end`
    Line {
        /// Segment start
        start: Vec3,
        /// Segment end
        end: Vec3,
        /// RGBA color
        color: Vec4,
        /// Seconds left before expiry
        duration: f32,
    },

    /// Single point
    Point {
        /// World position
        position: Vec3,
        /// RGBA color
        color: Vec4,
        /// Size in pixels
        size: f32,
        /// Seconds left before expiry
        duration: f32,
    },
}

impl DebugShape {
    /// Seconds left before expiry
    pub fn duration(&self) -> f32 {
        match *self {
            Self::Line { duration, .. } | Self::Point { duration, .. } => duration,
        }
    }

    /// Ages the shape by `delta_time`; true once it has expired
    pub fn tick(&mut self, delta_time: f32) -> bool {
        let (Self::Line { duration, .. } | Self::Point { duration, .. }) = self;
        *duration -= delta_time;
        *duration <= 0.0
    }

    fn color(&self) -> Vec4 {
        match *self {
            Self::Line { color, .. } | Self::Point { color, .. } => color,
        }
    }
}

/// Recording sink for an external renderer
///
/// Requests made through [`DebugDraw`] are transient and live until
/// [`DebugDrawSystem::update`] has aged them past their duration, so a
/// zero-duration request survives exactly until the next update. Pinned
/// shapes stay until removed by id.
#[derive(Debug, Clone)]
pub struct DebugDrawSystem {
    transient: Vec<DebugShape>,
    pinned: HashMap<DebugShapeId, DebugShape>,
    /// Drop every request while false
    pub enabled: bool,
}

impl DebugDrawSystem {
    /// Empty, enabled system
    pub fn new() -> Self {
        Self {
            transient: Vec::new(),
            pinned: HashMap::new(),
            enabled: true,
        }
    }

    /// Pins `shape` under `id`, replacing any shape with the same id
    pub fn draw_persistent(&mut self, id: impl Into<String>, shape: DebugShape) {
        if self.enabled {
            self.pinned.insert(id.into(), shape);
        }
    }

    /// Unpins the shape stored under `id`
    pub fn clear_persistent(&mut self, id: &str) {
        self.pinned.remove(id);
    }

    /// Ages transient shapes and drops the expired ones
    pub fn update(&mut self, delta_time: f32) {
        self.transient.retain_mut(|shape| !shape.tick(delta_time));
    }

    /// Everything a renderer should draw this frame
    pub fn shapes(&self) -> Vec<&DebugShape> {
        if !self.enabled {
            return Vec::new();
        }
        self.transient.iter().chain(self.pinned.values()).collect()
    }

    /// Transient plus pinned shapes
    pub fn shape_count(&self) -> usize {
        self.transient.len() + self.pinned.len()
    }

    /// Transient lines drawn in `color`
    pub fn lines_with_color(&self, color: Vec4) -> usize {
        self.transient
            .iter()
            .filter(|shape| matches!(shape, DebugShape::Line { .. }) && shape.color() == color)
            .count()
    }

    /// Transient points drawn in `color`
    pub fn points_with_color(&self, color: Vec4) -> usize {
        self.transient
            .iter()
            .filter(|shape| matches!(shape, DebugShape::Point { .. }) && shape.color() == color)
            .count()
    }

    /// Drops every shape
    pub fn clear(&mut self) {
        self.transient.clear();
        self.pinned.clear();
    }

    fn record(&mut self, shape: DebugShape) {
        if self.enabled {
            self.transient.push(shape);
        }
    }
}

impl Default for DebugDrawSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugDraw for DebugDrawSystem {
    fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: f32) {
        self.record(DebugShape::Line { start, end, color, duration });
    }

    fn draw_point(&mut self, position: Vec3, color: Vec4, size: f32, duration: f32) {
        self.record(DebugShape::Point { position, color, size, duration });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_shape_expiration() {
        let mut system = DebugDrawSystem::new();

        system.draw_line(
            Vec3::zeros(),
            Vec3::new(0.0, -1.0, 0.0),
            colors::PROBE_HIT,
            1.0,
        );

        assert_eq!(system.shape_count(), 1);

        system.update(0.5);
        assert_eq!(system.shape_count(), 1);

        // 1.1 seconds total
        system.update(0.6);
        assert_eq!(system.shape_count(), 0);
    }

    #[test]
    fn test_persistent_shapes() {
        let mut system = DebugDrawSystem::new();

        system.draw_persistent(
            "spawn",
            DebugShape::Point {
                position: Vec3::zeros(),
                color: colors::CONTACT_POINT,
                size: 4.0,
                duration: f32::INFINITY,
            },
        );

        for _ in 0..100 {
            system.update(1.0);
        }
        assert_eq!(system.shape_count(), 1);

        system.clear_persistent("spawn");
        assert_eq!(system.shape_count(), 0);
    }

    #[test]
    fn test_disabled_system_records_nothing() {
        let mut system = DebugDrawSystem::new();
        system.enabled = false;
        system.draw_point(Vec3::zeros(), colors::CONTACT_POINT, 2.0, 1.0);
        assert_eq!(system.shape_count(), 0);
        assert!(system.shapes().is_empty());
    }

    #[test]
    fn test_lines_are_counted_by_color() {
        let mut system = DebugDrawSystem::new();
        system.draw_line(Vec3::zeros(), Vec3::x(), colors::PROBE_HIT, 1.0);
        system.draw_line(Vec3::zeros(), Vec3::x(), colors::PROBE_MISS, 1.0);
        system.draw_line(Vec3::zeros(), Vec3::y(), colors::PROBE_HIT, 1.0);
        assert_eq!(system.lines_with_color(colors::PROBE_HIT), 2);
        assert_eq!(system.lines_with_color(colors::PROBE_MISS), 1);
    }
}
