//! Movement events produced by the per-state ticks

use crate::foundation::math::Vec3;
use crate::world::EntityKey;

/// Precomputed scripted climb
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaultPath {
    /// Entity being climbed
    pub entity: EntityKey,
    /// Feet position when the vault started
    pub origin: Vec3,
    /// Feet position on top of the obstacle
    pub target: Vec3,
    /// Camera yaw at the end of the vault
    pub target_yaw: f32,
}

/// Event discriminant, the key of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Jump pressed
    Jump,
    /// Stepover probe found no ground
    FloorLost,
    /// Landed on or touched walkable ground
    FloorContact,
    /// Touched a slidable surface steeper than the slide angle
    SlopeContact,
    /// Horizontal contact
    WallContact,
    /// Hit something overhead
    CeilingContact,
    /// Vertical velocity of a jump stopped being positive
    ApexReached,
    /// Caught a ledge
    LedgeGrabbed,
    /// Let go of a ledge
    GrabReleased,
    /// Vault towards a precomputed target began
    VaultStarted,
    /// Vault reached its target pose
    VaultFinished,
}

impl EventKind {
    /// Every event kind, in declaration order
    pub const ALL: [EventKind; 11] = [
        Self::Jump,
        Self::FloorLost,
        Self::FloorContact,
        Self::SlopeContact,
        Self::WallContact,
        Self::CeilingContact,
        Self::ApexReached,
        Self::LedgeGrabbed,
        Self::GrabReleased,
        Self::VaultStarted,
        Self::VaultFinished,
    ];
}

/// Event with the data its entry action needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementEvent {
    /// Jump pressed
    Jump,
    /// No ground under the feet
    FloorLost,
    /// Walkable ground
    FloorContact {
        /// Ground entity
        entity: EntityKey,
        /// Ground normal
        normal: Vec3,
    },
    /// Steep slidable surface
    SlopeContact {
        /// Slope entity
        entity: EntityKey,
        /// Surface normal
        normal: Vec3,
    },
    /// Horizontal contact
    WallContact {
        /// Wall entity
        entity: EntityKey,
        /// Wall normal
        normal: Vec3,
    },
    /// Overhead contact
    CeilingContact {
        /// Ceiling entity
        entity: EntityKey,
    },
    /// Jump apex
    ApexReached,
    /// Caught a ledge
    LedgeGrabbed {
        /// Entity owning the ledge
        entity: EntityKey,
        /// Ledge top height
        ledge_height: f32,
        /// Wall normal below the ledge
        normal: Vec3,
    },
    /// Let go of a ledge
    GrabReleased,
    /// Vault began
    VaultStarted {
        /// Where the vault goes
        path: VaultPath,
    },
    /// Vault complete
    VaultFinished,
}

impl MovementEvent {
    /// Table key for this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Jump => EventKind::Jump,
            Self::FloorLost => EventKind::FloorLost,
            Self::FloorContact { .. } => EventKind::FloorContact,
            Self::SlopeContact { .. } => EventKind::SlopeContact,
            Self::WallContact { .. } => EventKind::WallContact,
            Self::CeilingContact { .. } => EventKind::CeilingContact,
            Self::ApexReached => EventKind::ApexReached,
            Self::LedgeGrabbed { .. } => EventKind::LedgeGrabbed,
            Self::GrabReleased => EventKind::GrabReleased,
            Self::VaultStarted { .. } => EventKind::VaultStarted,
            Self::VaultFinished => EventKind::VaultFinished,
        }
    }
}
