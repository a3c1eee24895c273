//! Semantic classification of contact normals

use crate::core::config::ControllerConfig;
use crate::foundation::math::{Vec3, UP};

/// What a contact means for the movement state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// Walkable ground
    Floor,
    /// Slidable surface steeper than the slide angle
    Slope,
    /// Horizontal push-out
    Wall,
    /// Downward push-out
    Ceiling,
}

/// Classify a contact normal
///
/// Rules, first match wins:
/// 1. Downward normals are ceilings.
/// 2. Slidable surfaces with `dot(n, up) >= slope_min_dot` are slopes when
///    their inclination exceeds the slide angle, floors otherwise.
/// 3. Upward normals on non-slidable entities are floors.
/// 4. Everything else is a wall.
pub fn classify(normal: &Vec3, slidable: bool, config: &ControllerConfig) -> ContactKind {
    let up = normal.dot(&UP);

    if up < 0.0 {
        return ContactKind::Ceiling;
    }

    if slidable {
        if up >= config.slope_min_dot {
            let inclination = up.clamp(-1.0, 1.0).acos();
            return if inclination > config.slide_angle_rad() {
                ContactKind::Slope
            } else {
                ContactKind::Floor
            };
        }
        return ContactKind::Wall;
    }

    if up > 0.0 {
        ContactKind::Floor
    } else {
        ContactKind::Wall
    }
}
