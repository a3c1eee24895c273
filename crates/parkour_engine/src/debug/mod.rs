//! Debug module for visualization and debugging tools
//!
//! The collision core only emits draw requests; whatever renders them lives
//! outside this crate. [`NullDebugDraw`] satisfies the contract when nothing
//! should be drawn.

pub mod draw;

pub use draw::{colors, DebugDraw, DebugDrawSystem, DebugShape, DebugShapeId, NullDebugDraw};
