use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};

use super::{MAX_ROUNDS, ROLLS_PER_ROUND};
use crate::{AssetId, UserId, Wallet};

/// One die roll and its effect on the running total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roll {
    /// Raw die face in [1, 6].
    pub face: u8,
    /// Damage mapped from the face.
    pub damage: u8,
    /// Running total after this roll (post bust-back, if any).
    pub total: u16,
}

impl Write for Roll {
    fn write(&self, writer: &mut impl BufMut) {
        self.face.write(writer);
        self.damage.write(writer);
        self.total.write(writer);
    }
}

impl Read for Roll {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            face: u8::read(reader)?,
            damage: u8::read(reader)?,
            total: u16::read(reader)?,
        })
    }
}

impl FixedSize for Roll {
    const SIZE: usize = u8::SIZE * 2 + u16::SIZE;
}

/// Up to three rolls grouped into one round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Round {
    pub rolls: Vec<Roll>,
}

impl Write for Round {
    fn write(&self, writer: &mut impl BufMut) {
        self.rolls.write(writer);
    }
}

impl Read for Round {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            rolls: Vec::<Roll>::read_range(reader, 1..=ROLLS_PER_ROUND)?,
        })
    }
}

impl EncodeSize for Round {
    fn encode_size(&self) -> usize {
        self.rolls.encode_size()
    }
}

/// A participant's complete pre-simulated game: every round it will roll,
/// ending at the roll that reaches the target total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundSequence {
    pub rounds: Vec<Round>,
    /// Index of the round containing the winning roll.
    pub win_round: u32,
    /// Index of the winning roll within its round.
    pub win_roll: u32,
    /// Whether the win qualifies for the zen bonus.
    pub zen: bool,
}

impl RoundSequence {
    /// Roll at the lockstep position (round, roll), if the sequence reaches it.
    pub fn roll_at(&self, round: usize, roll: usize) -> Option<&Roll> {
        self.rounds.get(round).and_then(|r| r.rolls.get(roll))
    }

    /// Whether the winning roll sits exactly at (round, roll).
    pub fn wins_at(&self, round: usize, roll: usize) -> bool {
        self.win_round as usize == round && self.win_roll as usize == roll
    }

    /// Running total after the last roll at or before (round, roll).
    ///
    /// `None` until the sequence's first roll is reached.
    pub fn total_after(&self, round: usize, roll: usize) -> Option<u16> {
        let mut last = None;
        for (i, r) in self.rounds.iter().enumerate().take(round + 1) {
            let upto = if i == round { roll + 1 } else { r.rolls.len() };
            if let Some(latest) = r.rolls.iter().take(upto).last() {
                last = Some(latest.total);
            }
        }
        last
    }

    /// Raw rolls across all rounds.
    pub fn total_rolls(&self) -> usize {
        self.rounds.iter().map(|r| r.rolls.len()).sum()
    }
}

impl Write for RoundSequence {
    fn write(&self, writer: &mut impl BufMut) {
        self.rounds.write(writer);
        self.win_round.write(writer);
        self.win_roll.write(writer);
        self.zen.write(writer);
    }
}

impl Read for RoundSequence {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            rounds: Vec::<Round>::read_range(reader, 1..=MAX_ROUNDS)?,
            win_round: u32::read(reader)?,
            win_roll: u32::read(reader)?,
            zen: bool::read(reader)?,
        })
    }
}

impl EncodeSize for RoundSequence {
    fn encode_size(&self) -> usize {
        self.rounds.encode_size()
            + self.win_round.encode_size()
            + self.win_roll.encode_size()
            + self.zen.encode_size()
    }
}

/// One registered combatant in a game instance.
///
/// Created when a user registers into the waiting room (the sequence is
/// simulated eagerly at that point) and destroyed when the user withdraws or
/// the instance resets after finishing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub user: UserId,
    pub wallet: Wallet,
    pub asset: AssetId,
    pub sequence: RoundSequence,
    /// Sole winner of the finished game.
    pub is_winner: bool,
    /// Engine-controlled combatant; never receives payouts or stat updates.
    pub is_npc: bool,
    /// Post-game cooldown applied to this participant (ms).
    pub cooldown_ms: u64,
    /// Whether the cooldown was jittered away from the base duration.
    pub cooldown_adjusted: bool,
}

impl Participant {
    pub fn human(user: UserId, wallet: Wallet, asset: AssetId, sequence: RoundSequence) -> Self {
        Self {
            user,
            wallet,
            asset,
            sequence,
            is_winner: false,
            is_npc: false,
            cooldown_ms: 0,
            cooldown_adjusted: false,
        }
    }

    pub fn npc(user: UserId, asset: AssetId, sequence: RoundSequence) -> Self {
        Self {
            user,
            wallet: Wallet::default(),
            asset,
            sequence,
            is_winner: false,
            is_npc: true,
            cooldown_ms: 0,
            cooldown_adjusted: false,
        }
    }
}

impl Write for Participant {
    fn write(&self, writer: &mut impl BufMut) {
        self.user.write(writer);
        self.wallet.write(writer);
        self.asset.write(writer);
        self.sequence.write(writer);
        self.is_winner.write(writer);
        self.is_npc.write(writer);
        self.cooldown_ms.write(writer);
        self.cooldown_adjusted.write(writer);
    }
}

impl Read for Participant {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            user: UserId::read(reader)?,
            wallet: Wallet::read(reader)?,
            asset: AssetId::read(reader)?,
            sequence: RoundSequence::read(reader)?,
            is_winner: bool::read(reader)?,
            is_npc: bool::read(reader)?,
            cooldown_ms: u64::read(reader)?,
            cooldown_adjusted: bool::read(reader)?,
        })
    }
}

impl EncodeSize for Participant {
    fn encode_size(&self) -> usize {
        self.user.encode_size()
            + self.wallet.encode_size()
            + self.asset.encode_size()
            + self.sequence.encode_size()
            + self.is_winner.encode_size()
            + self.is_npc.encode_size()
            + self.cooldown_ms.encode_size()
            + self.cooldown_adjusted.encode_size()
    }
}
