/// Damage dealt by each die face, indexed by `face - 1`.
pub const DAMAGE_TABLE: [u8; 6] = [1, 1, 2, 2, 3, 3];

/// Running total that wins the game.
pub const TARGET_TOTAL: u16 = 21;

/// Total the running score falls back to after overshooting the target.
///
/// Overshooting is not capped: the score is reset to this value and the
/// combatant keeps rolling.
pub const BUST_BACK_TOTAL: u16 = 15;

/// Rolls grouped into one round.
pub const ROLLS_PER_ROUND: usize = 3;

/// Safety bound on raw rolls per simulation. Ordinary play always wins long
/// before exhausting it; running past it is an invariant violation.
pub const MAX_ROLLS: usize = 100;

/// Upper bound on rounds in a sequence (used by codec range reads).
pub const MAX_ROUNDS: usize = MAX_ROLLS.div_ceil(ROLLS_PER_ROUND);

/// Most participants any game type seats, humans and NPCs combined.
pub const MAX_PARTICIPANTS: usize = 8;

/// Floor applied to the cooldown increase/decrease probabilities.
pub const PROBABILITY_FLOOR: f64 = 0.05;

/// Ceiling applied to the cooldown increase/decrease probabilities.
pub const PROBABILITY_CEIL: f64 = 0.95;

/// Largest jitter added to or subtracted from the base cooldown (ms).
pub const COOLDOWN_JITTER_MS: u64 = 60_000;

/// Default base cooldown between games (ms).
pub const DEFAULT_COOLDOWN_BASE_MS: u64 = 10 * 60 * 1_000;

/// Default base payout for a winning encounter.
pub const DEFAULT_BASE_AMOUNT: u64 = 10;

/// Default per-round payout modifier.
pub const DEFAULT_ROUND_MODIFIER: u64 = 2;

/// Default zen-win payout multiplier.
pub const DEFAULT_ZEN_MULTIPLIER: u64 = 2;

/// Default zen-win per-round payout modifier.
pub const DEFAULT_ZEN_ROUND_MODIFIER: u64 = 1;
