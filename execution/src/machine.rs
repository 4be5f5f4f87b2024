use dicepit_types::game::GameStateValue;
use thiserror::Error;

/// Rejected state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("illegal transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: GameStateValue,
    pub to: GameStateValue,
}

/// Accepted state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Changed {
        from: GameStateValue,
        to: GameStateValue,
    },
    /// Target equals the current state (idempotent re-entry); callers must
    /// not repeat side effects.
    Unchanged,
}

/// Per-channel game lifecycle machine.
///
/// Legal edges:
/// - WaitingRoom -> ActiveGame (capacity reached, maintenance clear)
/// - ActiveGame -> Win (winner determined)
/// - ActiveGame -> Finished (no-winner NPC edge case)
/// - Win -> Finished (announcement dispatched, rewards settled)
/// - Finished -> WaitingRoom, Maintenance -> WaitingRoom (reset)
/// - any -> Maintenance (flag observed while opening a room)
///
/// Anything else is rejected rather than silently applied.
#[derive(Clone, Debug, Default)]
pub struct Machine {
    state: GameStateValue,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GameStateValue {
        self.state
    }

    pub fn transition(&mut self, to: GameStateValue) -> Result<Transition, TransitionError> {
        use GameStateValue::*;
        let from = self.state;
        let legal = matches!(
            (from, to),
            (WaitingRoom, ActiveGame)
                | (ActiveGame, Win)
                | (ActiveGame, Finished)
                | (Win, Finished)
                | (Finished, WaitingRoom)
                | (Maintenance, WaitingRoom)
                | (WaitingRoom, WaitingRoom)
                | (_, Maintenance)
        );
        if !legal {
            return Err(TransitionError { from, to });
        }
        if from == to {
            return Ok(Transition::Unchanged);
        }
        self.state = to;
        Ok(Transition::Changed { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GameStateValue::*;

    #[test]
    fn test_full_lifecycle() {
        let mut machine = Machine::new();
        assert_eq!(machine.state(), WaitingRoom);
        for to in [ActiveGame, Win, Finished, WaitingRoom] {
            assert_eq!(
                machine.transition(to),
                Ok(Transition::Changed {
                    from: machine.state(),
                    to
                })
            );
        }
        assert_eq!(machine.state(), WaitingRoom);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut machine = Machine::new();
        assert_eq!(machine.transition(WaitingRoom), Ok(Transition::Unchanged));
        assert_eq!(machine.transition(WaitingRoom), Ok(Transition::Unchanged));
        assert_eq!(machine.state(), WaitingRoom);
    }

    #[test]
    fn test_direct_win_rejected() {
        let mut machine = Machine::new();
        assert_eq!(
            machine.transition(Win),
            Err(TransitionError {
                from: WaitingRoom,
                to: Win
            })
        );
        assert_eq!(machine.state(), WaitingRoom);
    }

    #[test]
    fn test_active_from_finished_rejected() {
        let mut machine = Machine::new();
        machine.transition(ActiveGame).unwrap();
        machine.transition(Win).unwrap();
        machine.transition(Finished).unwrap();
        assert_eq!(
            machine.transition(ActiveGame),
            Err(TransitionError {
                from: Finished,
                to: ActiveGame
            })
        );
    }

    #[test]
    fn test_npc_only_game_skips_win() {
        let mut machine = Machine::new();
        machine.transition(ActiveGame).unwrap();
        assert_eq!(
            machine.transition(Finished),
            Ok(Transition::Changed {
                from: ActiveGame,
                to: Finished
            })
        );
    }

    #[test]
    fn test_maintenance_reachable_from_anywhere() {
        for seed in [WaitingRoom, ActiveGame] {
            let mut machine = Machine::new();
            if seed == ActiveGame {
                machine.transition(ActiveGame).unwrap();
            }
            machine.transition(Maintenance).unwrap();
            assert_eq!(machine.state(), Maintenance);
            // Only a reset leaves maintenance.
            assert!(machine.transition(ActiveGame).is_err());
            assert_eq!(
                machine.transition(WaitingRoom),
                Ok(Transition::Changed {
                    from: Maintenance,
                    to: WaitingRoom
                })
            );
        }
    }
}
