//! The session cursor and its animated transition state machine.
//!
//! Moving between items passes through `leaving -> entering -> idle`, each leg
//! lasting a fixed short delay so the host can run exit/enter animations. The
//! position mutates exactly once, when the leaving deadline elapses: no observer
//! ever sees a transient inconsistent (phase, position) pair. This is the single
//! suspending step in the engine besides the persistence debounce; navigation
//! commands arriving mid-transition are dropped, not queued.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// The transition phase as the host sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPhase {
    Idle,
    Leaving,
    Entering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Idle,
    Leaving {
        direction: Direction,
        deadline: DateTime<Utc>,
    },
    Entering {
        deadline: DateTime<Utc>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Cursor {
    pub position: usize,
    pub revealed: bool,
    transition: Transition,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            position: 0,
            revealed: false,
            transition: Transition::Idle,
        }
    }

    pub fn at(position: usize) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        match self.transition {
            Transition::Idle => TransitionPhase::Idle,
            Transition::Leaving { .. } => TransitionPhase::Leaving,
            Transition::Entering { .. } => TransitionPhase::Entering,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.transition, Transition::Idle)
    }

    /// Start an animated move. Only valid from idle; callers drop the input otherwise.
    pub fn begin_move(&mut self, direction: Direction, now: DateTime<Utc>, leg: Duration) {
        debug_assert!(self.is_idle());
        self.transition = Transition::Leaving {
            direction,
            deadline: now + leg,
        };
    }

    /// Advance the transition clock. Returns the movement direction at the instant
    /// the exit leg completes; that is when the caller must mutate the position.
    /// `revealed` resets to false at that same instant.
    pub fn tick(&mut self, now: DateTime<Utc>, leg: Duration) -> Option<Direction> {
        match self.transition {
            Transition::Leaving {
                direction,
                deadline,
            } if deadline <= now => {
                self.revealed = false;
                self.transition = Transition::Entering {
                    deadline: now + leg,
                };
                Some(direction)
            }
            Transition::Entering { deadline } if deadline <= now => {
                self.transition = Transition::Idle;
                None
            }
            _ => None,
        }
    }

    /// Set the position directly, bypassing the animated transition. Used for
    /// gallery/dropdown selection and deep-link restore.
    pub fn snap(&mut self, position: usize) {
        self.position = position;
        self.revealed = false;
        self.transition = Transition::Idle;
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match self.transition {
            Transition::Idle => None,
            Transition::Leaving { deadline, .. } | Transition::Entering { deadline } => {
                Some(deadline)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn leg() -> Duration {
        Duration::milliseconds(200)
    }

    #[test]
    fn move_passes_through_both_legs() {
        let mut cursor = Cursor::new();
        let t0 = start();
        cursor.begin_move(Direction::Forward, t0, leg());
        assert_eq!(cursor.phase(), TransitionPhase::Leaving);

        // Before the deadline nothing happens
        assert_eq!(cursor.tick(t0 + Duration::milliseconds(100), leg()), None);
        assert_eq!(cursor.phase(), TransitionPhase::Leaving);

        let t1 = t0 + leg();
        assert_eq!(cursor.tick(t1, leg()), Some(Direction::Forward));
        assert_eq!(cursor.phase(), TransitionPhase::Entering);

        assert_eq!(cursor.tick(t1 + leg(), leg()), None);
        assert_eq!(cursor.phase(), TransitionPhase::Idle);
    }

    #[test]
    fn reveal_resets_when_the_position_mutates() {
        let mut cursor = Cursor::new();
        cursor.revealed = true;
        let t0 = start();
        cursor.begin_move(Direction::Backward, t0, leg());
        assert!(cursor.revealed, "reveal holds through the exit animation");
        assert_eq!(cursor.tick(t0 + leg(), leg()), Some(Direction::Backward));
        assert!(!cursor.revealed);
    }

    #[test]
    fn snap_clears_reveal_and_transition() {
        let mut cursor = Cursor::new();
        cursor.revealed = true;
        cursor.begin_move(Direction::Forward, start(), leg());
        cursor.snap(5);
        assert_eq!(cursor.position, 5);
        assert!(!cursor.revealed);
        assert!(cursor.is_idle());
        assert_eq!(cursor.next_deadline(), None);
    }

    #[test]
    fn a_late_tick_completes_one_leg_at_a_time() {
        let mut cursor = Cursor::new();
        let t0 = start();
        cursor.begin_move(Direction::Forward, t0, leg());
        // Host was busy; the tick arrives long after both deadlines would have elapsed.
        let late = t0 + Duration::seconds(10);
        assert_eq!(cursor.tick(late, leg()), Some(Direction::Forward));
        assert_eq!(cursor.phase(), TransitionPhase::Entering);
        assert_eq!(cursor.tick(late + leg(), leg()), None);
        assert!(cursor.is_idle());
    }
}
