use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

/// Lifecycle states of a channel's game instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum GameStateValue {
    /// Lobby open, collecting participants.
    #[default]
    WaitingRoom = 0,
    /// Pre-simulated sequences are being stepped through.
    ActiveGame = 1,
    /// A winner was determined; announcement side effects pending.
    Win = 2,
    /// Rewards settled; awaiting reset into a fresh waiting room.
    Finished = 3,
    /// Waiting rooms suppressed by the maintenance flag.
    Maintenance = 4,
}

impl Write for GameStateValue {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GameStateValue {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::WaitingRoom),
            1 => Ok(Self::ActiveGame),
            2 => Ok(Self::Win),
            3 => Ok(Self::Finished),
            4 => Ok(Self::Maintenance),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for GameStateValue {
    const SIZE: usize = 1;
}
