mod actor;
mod ingress;

pub use actor::Actor;
pub use ingress::{Mailbox, Message};

use dicepit_types::ChannelId;

use crate::board::RenderMode;

/// Configuration for one channel's game instance actor.
pub struct Config<P, S, L, R> {
    pub channel: ChannelId,
    pub persistence: P,
    pub participants: S,
    pub ledger: L,
    pub renderer: R,
    pub render_mode: RenderMode,
    pub mailbox_size: usize,
}
