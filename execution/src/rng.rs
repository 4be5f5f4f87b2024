use commonware_cryptography::{sha256::Sha256, Hasher};
use dicepit_types::ChannelId;

/// Domain separator mixed into every combat seed.
const COMBAT_DOMAIN: &[u8] = b"dicepit-combat";

/// Deterministic dice generator.
///
/// Uses SHA256 hash chains seeded from the channel, the instance's game
/// nonce, and the combatant's identity, so a sequence can be reproduced
/// exactly but combatants in the same game never share rolls.
#[derive(Clone)]
pub struct DiceRng {
    state: [u8; 32],
    index: usize,
}

impl DiceRng {
    /// Create a generator for one combatant in one game.
    pub fn new(channel: ChannelId, game_nonce: u64, combatant: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(COMBAT_DOMAIN);
        hasher.update(&channel.0.to_be_bytes());
        hasher.update(&game_nonce.to_be_bytes());
        hasher.update(&combatant.to_be_bytes());
        Self {
            state: hasher.finalize().0,
            index: 0,
        }
    }

    /// Get the next byte of the chain.
    fn next_byte(&mut self) -> u8 {
        if self.index >= 32 {
            // Rehash to get more bytes
            let mut hasher = Sha256::new();
            hasher.update(&self.state);
            self.state = hasher.finalize().0;
            self.index = 0;
        }
        let result = self.state[self.index];
        self.index += 1;
        result
    }

    /// Get a random value in range [0, max).
    pub fn next_bounded(&mut self, max: u8) -> u8 {
        if max == 0 {
            return 0;
        }
        // Rejection sampling for an unbiased distribution
        let limit = u8::MAX - (u8::MAX % max);
        loop {
            let value = self.next_byte();
            if value < limit {
                return value % max;
            }
        }
    }

    /// Roll a single die (1-6).
    pub fn roll_die(&mut self) -> u8 {
        self.next_bounded(6) + 1
    }
}
