//! Board content handed to the render sink.
//!
//! String formatting proper (embeds, emoji) lives with the chat adapter;
//! this module only decides what each board says and how fast the step loop
//! paces itself.

use std::time::Duration;

use dicepit_types::game::{GameSettings, Participant};

/// Stable waiting-room title. Stale rooms left by an earlier process are
/// found by this marker, not by stored reference.
pub const WAITING_ROOM_TITLE: &str = "Dice Pit: waiting room";

/// Title of the live game board.
pub const GAME_BOARD_TITLE: &str = "Dice Pit: battle";

/// Title of the win announcement.
pub const WIN_TITLE: &str = "Dice Pit: victory";

/// Rendered message content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardContent {
    pub title: String,
    pub body: String,
}

/// Where a step sits in the round flow; richer moments get longer pauses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPhase {
    /// An ordinary roll reveal.
    Roll,
    /// The last roll of a round.
    RoundBoundary,
    /// The winning roll.
    FinalReveal,
}

/// Rendering richness, chosen per deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Full board rendering with dramatic pacing.
    Rich,
    /// Fallback rendering with a fixed short delay.
    Lightweight,
}

impl RenderMode {
    /// Suspension between steps of the round loop.
    pub fn step_delay(&self, phase: StepPhase) -> Duration {
        match self {
            Self::Lightweight => Duration::from_millis(500),
            Self::Rich => match phase {
                StepPhase::Roll => Duration::from_millis(500),
                StepPhase::RoundBoundary => Duration::from_millis(1_500),
                StepPhase::FinalReveal => Duration::from_millis(3_500),
            },
        }
    }
}

/// Waiting-room board for a channel.
pub fn waiting_room(settings: &GameSettings, joined: usize) -> BoardContent {
    BoardContent {
        title: WAITING_ROOM_TITLE.to_string(),
        body: format!(
            "{:?} | {}/{} seats filled",
            settings.game_type, joined, settings.max_capacity
        ),
    }
}

/// Game board after `stepped` combatants have revealed their roll at
/// (round, roll).
pub fn game_board(
    participants: &[Participant],
    round: usize,
    roll: usize,
    stepped: usize,
) -> BoardContent {
    let mut body = format!("round {} roll {}\n", round + 1, roll + 1);
    for (i, participant) in participants.iter().enumerate() {
        let total = if i < stepped {
            participant.sequence.total_after(round, roll)
        } else if round == 0 && roll == 0 {
            None
        } else {
            // Combatants later in the order still show last step's total.
            match roll {
                0 => participant
                    .sequence
                    .total_after(round - 1, dicepit_types::game::ROLLS_PER_ROUND - 1),
                _ => participant.sequence.total_after(round, roll - 1),
            }
        };
        let shown = total.map_or("-".to_string(), |t| t.to_string());
        let tag = if participant.is_npc { " (npc)" } else { "" };
        body.push_str(&format!("{}{}: {}\n", participant.user.0, tag, shown));
    }
    BoardContent {
        title: GAME_BOARD_TITLE.to_string(),
        body,
    }
}

/// Final board state after the game ends.
pub fn final_board(participants: &[Participant]) -> BoardContent {
    let mut body = String::from("final\n");
    for participant in participants {
        let total = participant
            .sequence
            .rounds
            .last()
            .and_then(|r| r.rolls.last())
            .map_or("-".to_string(), |r| r.total.to_string());
        let tag = if participant.is_winner {
            " (winner)"
        } else if participant.is_npc {
            " (npc)"
        } else {
            ""
        };
        body.push_str(&format!("{}{}: {}\n", participant.user.0, tag, total));
    }
    BoardContent {
        title: GAME_BOARD_TITLE.to_string(),
        body,
    }
}

/// Win announcement content.
pub fn win_announcement(winner: &Participant, payout: u64) -> BoardContent {
    let body = if winner.is_npc {
        format!("npc {} takes the pit", winner.user.0)
    } else if winner.sequence.zen {
        format!("{} wins zen, {} tokens", winner.user.0, payout)
    } else {
        format!("{} wins, {} tokens", winner.user.0, payout)
    };
    BoardContent {
        title: WIN_TITLE.to_string(),
        body,
    }
}
