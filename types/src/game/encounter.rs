use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

use super::{GameType, MAX_PARTICIPANTS};
use crate::{AssetId, ChannelId, UserId};

/// Per-participant outcome persisted with a finished encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterOutcome {
    pub user: UserId,
    pub asset: AssetId,
    pub is_winner: bool,
    pub is_npc: bool,
    /// Temporary token balance credited to the winner; zero otherwise.
    pub payout: u64,
    pub cooldown_ms: u64,
    pub cooldown_adjusted: bool,
}

impl Write for EncounterOutcome {
    fn write(&self, writer: &mut impl BufMut) {
        self.user.write(writer);
        self.asset.write(writer);
        self.is_winner.write(writer);
        self.is_npc.write(writer);
        self.payout.write(writer);
        self.cooldown_ms.write(writer);
        self.cooldown_adjusted.write(writer);
    }
}

impl Read for EncounterOutcome {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            user: UserId::read(reader)?,
            asset: AssetId::read(reader)?,
            is_winner: bool::read(reader)?,
            is_npc: bool::read(reader)?,
            payout: u64::read(reader)?,
            cooldown_ms: u64::read(reader)?,
            cooldown_adjusted: bool::read(reader)?,
        })
    }
}

impl EncodeSize for EncounterOutcome {
    fn encode_size(&self) -> usize {
        self.user.encode_size()
            + self.asset.encode_size()
            + self.is_winner.encode_size()
            + self.is_npc.encode_size()
            + self.payout.encode_size()
            + self.cooldown_ms.encode_size()
            + self.cooldown_adjusted.encode_size()
    }
}

/// Record of one finished game, handed to persistence as the encounter's
/// game data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterRecord {
    pub channel: ChannelId,
    pub game_type: GameType,
    /// Winning round index; `None` for the no-winner NPC-only edge case.
    pub win_round: Option<u32>,
    pub outcomes: Vec<EncounterOutcome>,
}

impl Write for EncounterRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.channel.write(writer);
        self.game_type.write(writer);
        self.win_round.write(writer);
        self.outcomes.write(writer);
    }
}

impl Read for EncounterRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            channel: ChannelId::read(reader)?,
            game_type: GameType::read(reader)?,
            win_round: Option::<u32>::read(reader)?,
            outcomes: Vec::<EncounterOutcome>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
        })
    }
}

impl EncodeSize for EncounterRecord {
    fn encode_size(&self) -> usize {
        self.channel.encode_size()
            + self.game_type.encode_size()
            + self.win_round.encode_size()
            + self.outcomes.encode_size()
    }
}
