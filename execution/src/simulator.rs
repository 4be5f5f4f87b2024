use dicepit_types::game::{
    Roll, Round, RoundSequence, BUST_BACK_TOTAL, DAMAGE_TABLE, MAX_ROLLS, ROLLS_PER_ROUND,
    TARGET_TOTAL,
};
use thiserror::Error;

use crate::rng::DiceRng;

/// Invariant violation during combat simulation.
///
/// Both variants are programming-error class: a valid die face always maps
/// to a damage value, and ordinary play always reaches the target well
/// inside the roll bound. Neither may produce a truncated sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("no damage value for die face {0}")]
    UnknownFace(u8),
    #[error("no winning roll within {MAX_ROLLS} rolls")]
    WinNotReached,
}

fn damage_for(face: u8) -> Result<u8, SimulationError> {
    match face {
        1..=6 => Ok(DAMAGE_TABLE[(face - 1) as usize]),
        _ => Err(SimulationError::UnknownFace(face)),
    }
}

/// Pre-simulate one combatant's entire game.
///
/// Rolls until the running total lands exactly on the target. A roll that
/// would overshoot resets the total to the bust-back value instead. Rolls
/// are grouped three to a round; the winning roll closes its round early
/// and ends the simulation immediately.
pub fn simulate(rng: &mut DiceRng) -> Result<RoundSequence, SimulationError> {
    let mut rounds = Vec::new();
    let mut current: Vec<Roll> = Vec::with_capacity(ROLLS_PER_ROUND);
    let mut total: u16 = 0;

    for _ in 0..MAX_ROLLS {
        let face = rng.roll_die();
        let damage = damage_for(face)?;

        total = match total + damage as u16 {
            next if next > TARGET_TOTAL => BUST_BACK_TOTAL,
            next => next,
        };
        current.push(Roll {
            face,
            damage,
            total,
        });

        if total == TARGET_TOTAL {
            let win_round = rounds.len() as u32;
            let win_roll = (current.len() - 1) as u32;
            // Zen: the target was hit on the opening roll of a round.
            let zen = win_roll == 0;
            rounds.push(Round { rolls: current });
            return Ok(RoundSequence {
                rounds,
                win_round,
                win_roll,
                zen,
            });
        }

        if current.len() == ROLLS_PER_ROUND {
            rounds.push(Round {
                rolls: std::mem::replace(&mut current, Vec::with_capacity(ROLLS_PER_ROUND)),
            });
        }
    }

    Err(SimulationError::WinNotReached)
}
