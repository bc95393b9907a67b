//! Stall status state machine.
//!
//! AVAILABLE -> HELD -> RESERVED -> AVAILABLE, with HELD -> AVAILABLE as the
//! only shortcut. Each transition is a no-op when the stall already sits in
//! the target status and an error from any other illegal source.

use crate::error::StallError;
use shared::{StallEventKind, StallStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Hold,
    Release,
    Reserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Already in the target status; return the record as is.
    AlreadyInTarget,
    /// Move from the current status to the contained target.
    Move(StallStatus),
}

impl Transition {
    pub fn target(self) -> StallStatus {
        match self {
            Self::Hold => StallStatus::Held,
            Self::Release => StallStatus::Available,
            Self::Reserve => StallStatus::Reserved,
        }
    }

    pub fn sources(self) -> &'static [StallStatus] {
        match self {
            Self::Hold => &[StallStatus::Available],
            Self::Release => &[StallStatus::Held, StallStatus::Reserved],
            Self::Reserve => &[StallStatus::Held],
        }
    }

    /// Event published after the status actually changes.
    pub fn event(self) -> Option<StallEventKind> {
        match self {
            Self::Hold => None,
            Self::Release => Some(StallEventKind::Released),
            Self::Reserve => Some(StallEventKind::Reserved),
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Release => "release",
            Self::Reserve => "reserve",
        }
    }

    pub fn outcome(self) -> &'static str {
        match self {
            Self::Hold => "held",
            Self::Release => "released",
            Self::Reserve => "reserved",
        }
    }

    pub fn plan(self, current: StallStatus) -> Result<Step, StallError> {
        let target = self.target();
        if current == target {
            return Ok(Step::AlreadyInTarget);
        }

        if self.sources().contains(&current) {
            return Ok(Step::Move(target));
        }

        Err(StallError::InvalidStateTransition {
            action: self.action(),
            outcome: self.outcome(),
            current,
            allowed: self
                .sources()
                .iter()
                .map(StallStatus::as_str)
                .collect::<Vec<_>>()
                .join(" or "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StallStatus::*;

    fn assert_invalid(transition: Transition, current: StallStatus, expected: &str) {
        match transition.plan(current) {
            Err(err @ StallError::InvalidStateTransition { .. }) => {
                assert_eq!(err.to_string(), expected)
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn hold_only_from_available() {
        assert_eq!(Transition::Hold.plan(Available).unwrap(), Step::Move(Held));
        assert_eq!(Transition::Hold.plan(Held).unwrap(), Step::AlreadyInTarget);
        assert_invalid(
            Transition::Hold,
            Reserved,
            "Cannot hold stall with status: RESERVED. Only AVAILABLE stalls can be held.",
        );
    }

    #[test]
    fn release_from_held_or_reserved() {
        assert_eq!(Transition::Release.plan(Held).unwrap(), Step::Move(Available));
        assert_eq!(
            Transition::Release.plan(Reserved).unwrap(),
            Step::Move(Available)
        );
        assert_eq!(
            Transition::Release.plan(Available).unwrap(),
            Step::AlreadyInTarget
        );
    }

    #[test]
    fn reserve_requires_hold_first() {
        assert_eq!(Transition::Reserve.plan(Held).unwrap(), Step::Move(Reserved));
        assert_eq!(
            Transition::Reserve.plan(Reserved).unwrap(),
            Step::AlreadyInTarget
        );
        assert_invalid(
            Transition::Reserve,
            Available,
            "Cannot reserve stall with status: AVAILABLE. Only HELD stalls can be reserved.",
        );
    }

    #[test]
    fn only_release_and_reserve_publish() {
        assert_eq!(Transition::Hold.event(), None);
        assert_eq!(Transition::Release.event(), Some(StallEventKind::Released));
        assert_eq!(Transition::Reserve.event(), Some(StallEventKind::Reserved));
    }

    #[test]
    fn every_status_has_a_defined_outcome() {
        for transition in [Transition::Hold, Transition::Release, Transition::Reserve] {
            for status in StallStatus::ALL {
                let planned = transition.plan(status);
                let legal = status == transition.target() || transition.sources().contains(&status);
                assert_eq!(planned.is_ok(), legal, "{transition:?} from {status}");
            }
        }
    }
}
