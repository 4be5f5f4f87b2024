use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

/// Time-boxed global payout multiplier.
///
/// Persisted by an administrative setter; read-only everywhere else. The
/// multiplier only applies while the current time falls strictly inside the
/// window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoostState {
    pub starts_at_ms: u64,
    pub expires_at_ms: u64,
    pub multiplier: u64,
}

impl Write for BoostState {
    fn write(&self, writer: &mut impl BufMut) {
        self.starts_at_ms.write(writer);
        self.expires_at_ms.write(writer);
        self.multiplier.write(writer);
    }
}

impl Read for BoostState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            starts_at_ms: u64::read(reader)?,
            expires_at_ms: u64::read(reader)?,
            multiplier: u64::read(reader)?,
        })
    }
}

impl FixedSize for BoostState {
    const SIZE: usize = u64::SIZE * 3;
}
