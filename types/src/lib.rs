//! Common types used throughout dicepit.
//!
//! Identifiers reference records owned by external collaborators (the chat
//! platform, the asset store, the reward ledger). The engine never inspects
//! their contents; it only threads them through persistence and rendering.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

pub mod game;

/// Maximum length of a wallet address.
pub const MAX_WALLET_LENGTH: usize = 64;

/// Identifier of a chat channel hosting one game instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

/// Identifier of an external user record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

/// Identifier of a playable in-game asset (the avatar a participant fields).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

/// Reference to a message rendered into a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef(pub u64);

macro_rules! id_codec {
    ($name:ident) => {
        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                self.0.write(writer);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                Ok(Self(u64::read(reader)?))
            }
        }

        impl FixedSize for $name {
            const SIZE: usize = u64::SIZE;
        }
    };
}

id_codec!(ChannelId);
id_codec!(UserId);
id_codec!(AssetId);
id_codec!(MessageRef);

/// Wallet address credited with temporary token balances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Wallet(pub String);

impl Write for Wallet {
    fn write(&self, writer: &mut impl BufMut) {
        let bytes = self.0.as_bytes();
        (bytes.len() as u32).write(writer);
        writer.put_slice(bytes);
    }
}

impl Read for Wallet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_WALLET_LENGTH {
            return Err(Error::Invalid("Wallet", "too long"));
        }
        if reader.remaining() < len {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = vec![0u8; len];
        reader.copy_to_slice(&mut bytes);
        let address =
            String::from_utf8(bytes).map_err(|_| Error::Invalid("Wallet", "invalid UTF-8"))?;
        Ok(Self(address))
    }
}

impl EncodeSize for Wallet {
    fn encode_size(&self) -> usize {
        4 + self.0.len()
    }
}
