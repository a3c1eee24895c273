//! Collision detection and resolution for the character controller
//!
//! # Module Organization
//!
//! - [`collision`] - Geometry, narrow-phase tests and GJK
//! - [`classify`] - Floor/slope/wall/ceiling classification
//! - [`buffer`] - Per-tick candidate list drawn from the chunk grid
//! - [`resolver`] - Iterative push-out loop
//! - [`stepover`] - Downward ray probe for standing ground contact

pub mod buffer;
pub mod classify;
pub mod collision;
pub mod resolver;
pub mod stepover;

pub use buffer::{Candidate, CollisionBuffer};
pub use classify::{classify, ContactKind};
pub use resolver::{CollisionResult, Resolution, ResolveMode, Resolver};
pub use stepover::{probe, ProbeOutcome};
