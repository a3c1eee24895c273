//! Transition table keyed by `(state, event)`
//!
//! Pairs not listed are undefined and fail loudly instead of leaving the
//! state untouched.

use crate::player::events::EventKind;
use crate::player::state::MovementState;
use crate::simulation::SimulationError;

/// Next state for `event` in `state`
pub fn transition(state: MovementState, event: EventKind) -> Result<MovementState, SimulationError> {
    use EventKind as E;
    use MovementState as S;

    let next = match (state, event) {
        (S::Standing, E::Jump) => S::Jumping,
        (S::Standing, E::FloorLost) => S::Falling,
        (S::Standing, E::SlopeContact) => S::Sliding,
        (S::Standing, E::FloorContact | E::WallContact) => S::Standing,
        (S::Standing, E::VaultStarted) => S::Vaulting,

        (S::Jumping, E::FloorContact) => S::Standing,
        (S::Jumping, E::ApexReached | E::WallContact | E::CeilingContact) => S::Falling,
        (S::Jumping, E::SlopeContact) => S::Sliding,
        (S::Jumping, E::LedgeGrabbed) => S::Grabbing,

        (S::Falling, E::FloorContact) => S::Standing,
        (S::Falling, E::SlopeContact) => S::Sliding,
        (S::Falling, E::WallContact | E::CeilingContact) => S::Falling,
        (S::Falling, E::LedgeGrabbed) => S::Grabbing,

        (S::Sliding, E::Jump) => S::Jumping,
        (S::Sliding, E::FloorContact) => S::Standing,
        (S::Sliding, E::FloorLost) => S::SlideFalling,
        (S::Sliding, E::WallContact) => S::Sliding,

        (S::SlideFalling, E::FloorContact) => S::Standing,
        (S::SlideFalling, E::SlopeContact) => S::Sliding,
        (S::SlideFalling, E::WallContact) => S::Falling,
        (S::SlideFalling, E::CeilingContact) => S::SlideFalling,

        (S::Grabbing, E::Jump | E::VaultStarted) => S::Vaulting,
        (S::Grabbing, E::GrabReleased) => S::Falling,

        (S::Vaulting, E::VaultFinished) => S::Standing,

        (state, event) => return Err(SimulationError::UndefinedTransition { state, event }),
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pair_is_defined_or_an_error() {
        let mut defined = 0;
        for state in MovementState::ALL {
            for event in EventKind::ALL {
                match transition(state, event) {
                    Ok(_) => defined += 1,
                    Err(SimulationError::UndefinedTransition { state: s, event: e }) => {
                        assert_eq!((s, e), (state, event));
                    }
                    Err(other) => panic!("unexpected error {other}"),
                }
            }
        }
        assert_eq!(defined, 29);
    }

    #[test]
    fn test_selected_edges() {
        use EventKind as E;
        use MovementState as S;
        assert_eq!(transition(S::Standing, E::Jump).unwrap(), S::Jumping);
        assert_eq!(transition(S::Standing, E::FloorLost).unwrap(), S::Falling);
        assert_eq!(transition(S::Standing, E::SlopeContact).unwrap(), S::Sliding);
        assert_eq!(transition(S::Jumping, E::ApexReached).unwrap(), S::Falling);
        assert_eq!(transition(S::Falling, E::FloorContact).unwrap(), S::Standing);
        assert_eq!(transition(S::Sliding, E::FloorLost).unwrap(), S::SlideFalling);
        assert_eq!(transition(S::Grabbing, E::Jump).unwrap(), S::Vaulting);
        assert_eq!(transition(S::Vaulting, E::VaultFinished).unwrap(), S::Standing);
    }

    #[test]
    fn test_undefined_pairs_fail() {
        assert!(transition(MovementState::Vaulting, EventKind::Jump).is_err());
        assert!(transition(MovementState::Standing, EventKind::ApexReached).is_err());
        assert!(transition(MovementState::Falling, EventKind::FloorLost).is_err());
    }
}
