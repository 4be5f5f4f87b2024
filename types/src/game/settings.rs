use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use thiserror::Error as ThisError;

use super::{
    DEFAULT_BASE_AMOUNT, DEFAULT_COOLDOWN_BASE_MS, DEFAULT_ROUND_MODIFIER,
    DEFAULT_ZEN_MULTIPLIER, DEFAULT_ZEN_ROUND_MODIFIER, MAX_PARTICIPANTS,
};
use crate::ChannelId;

/// Game formats a channel can host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GameType {
    /// One human against one NPC.
    SoloNpc = 0,
    /// Two humans head to head.
    Duel = 1,
    /// Four humans against one NPC.
    SquadNpc = 2,
}

impl GameType {
    /// Human seats that must fill before the game starts.
    pub fn capacity(&self) -> u32 {
        match self {
            Self::SoloNpc => 1,
            Self::Duel => 2,
            Self::SquadNpc => 4,
        }
    }

    /// NPC combatants appended when the game starts.
    pub fn npc_count(&self) -> u32 {
        match self {
            Self::SoloNpc => 1,
            Self::Duel => 0,
            Self::SquadNpc => 1,
        }
    }
}

impl Write for GameType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GameType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::SoloNpc),
            1 => Ok(Self::Duel),
            2 => Ok(Self::SquadNpc),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for GameType {
    const SIZE: usize = 1;
}

/// Token-economy parameters for a channel's payouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenConfig {
    pub base_amount: u64,
    pub round_modifier: u64,
    pub zen_multiplier: u64,
    pub zen_round_modifier: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            base_amount: DEFAULT_BASE_AMOUNT,
            round_modifier: DEFAULT_ROUND_MODIFIER,
            zen_multiplier: DEFAULT_ZEN_MULTIPLIER,
            zen_round_modifier: DEFAULT_ZEN_ROUND_MODIFIER,
        }
    }
}

impl Write for TokenConfig {
    fn write(&self, writer: &mut impl BufMut) {
        self.base_amount.write(writer);
        self.round_modifier.write(writer);
        self.zen_multiplier.write(writer);
        self.zen_round_modifier.write(writer);
    }
}

impl Read for TokenConfig {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            base_amount: u64::read(reader)?,
            round_modifier: u64::read(reader)?,
            zen_multiplier: u64::read(reader)?,
            zen_round_modifier: u64::read(reader)?,
        })
    }
}

impl FixedSize for TokenConfig {
    const SIZE: usize = u64::SIZE * 4;
}

/// Invalid persisted settings.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SettingsError {
    #[error("capacity must be at least 1")]
    EmptyCapacity,
    #[error("minimum capacity {min} exceeds maximum {max}")]
    InvertedCapacity { min: u32, max: u32 },
    #[error("maximum capacity {0} exceeds the {MAX_PARTICIPANTS} participant bound")]
    CapacityTooLarge(u32),
    #[error("zen multiplier must be at least 1")]
    ZeroZenMultiplier,
    #[error("base cooldown must be nonzero")]
    ZeroCooldown,
}

/// Immutable per-waiting-room configuration.
///
/// Recreated whenever a fresh waiting room opens, never mutated in place.
/// Defaults are filled in once here, not re-checked on every read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSettings {
    pub channel: ChannelId,
    pub game_type: GameType,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub cooldown_base_ms: u64,
    pub token: TokenConfig,
}

impl GameSettings {
    /// Settings for a channel with every tunable at its default.
    pub fn for_channel(channel: ChannelId, game_type: GameType) -> Self {
        Self {
            channel,
            game_type,
            min_capacity: game_type.capacity(),
            max_capacity: game_type.capacity(),
            cooldown_base_ms: DEFAULT_COOLDOWN_BASE_MS,
            token: TokenConfig::default(),
        }
    }

    /// Reject settings a game cannot be run with. Fatal to this channel only.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_capacity == 0 {
            return Err(SettingsError::EmptyCapacity);
        }
        if self.min_capacity > self.max_capacity {
            return Err(SettingsError::InvertedCapacity {
                min: self.min_capacity,
                max: self.max_capacity,
            });
        }
        let seats = self.max_capacity as usize + self.game_type.npc_count() as usize;
        if seats > MAX_PARTICIPANTS {
            return Err(SettingsError::CapacityTooLarge(self.max_capacity));
        }
        if self.token.zen_multiplier == 0 {
            return Err(SettingsError::ZeroZenMultiplier);
        }
        if self.cooldown_base_ms == 0 {
            return Err(SettingsError::ZeroCooldown);
        }
        Ok(())
    }
}

impl Write for GameSettings {
    fn write(&self, writer: &mut impl BufMut) {
        self.channel.write(writer);
        self.game_type.write(writer);
        self.min_capacity.write(writer);
        self.max_capacity.write(writer);
        self.cooldown_base_ms.write(writer);
        self.token.write(writer);
    }
}

impl Read for GameSettings {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            channel: ChannelId::read(reader)?,
            game_type: GameType::read(reader)?,
            min_capacity: u32::read(reader)?,
            max_capacity: u32::read(reader)?,
            cooldown_base_ms: u64::read(reader)?,
            token: TokenConfig::read(reader)?,
        })
    }
}

impl EncodeSize for GameSettings {
    fn encode_size(&self) -> usize {
        self.channel.encode_size()
            + self.game_type.encode_size()
            + self.min_capacity.encode_size()
            + self.max_capacity.encode_size()
            + self.cooldown_base_ms.encode_size()
            + self.token.encode_size()
    }
}
