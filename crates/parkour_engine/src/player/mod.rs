//! Player movement state machine
//!
//! - [`state`]: the seven movement states and everything carried between ticks
//! - [`events`]: events produced by the per-state ticks
//! - [`transitions`]: the `(state, event)` table
//! - [`controller`]: per-state integration and entry actions
//! - [`input`]: decoded per-tick input

pub mod controller;
pub mod events;
pub mod input;
pub mod state;
pub mod transitions;

pub use controller::{MovementContext, StepOutcome};
pub use events::{EventKind, MovementEvent, VaultPath};
pub use input::{ActionFlags, PlayerInput};
pub use state::{GrabData, MovementState, PlayerState, SlideData};
pub use transitions::transition;
