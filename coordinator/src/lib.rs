//! Per-channel matchmaking and combat coordination for dicepit.
//!
//! Each chat channel owns exactly one game instance, driven by its own actor:
//! state transitions and round stepping are serialized through the actor's
//! mailbox, so no two transitions ever race for the same channel. Instances
//! across channels are fully independent and run concurrently.
//!
//! All contact with the outside world goes through the traits in
//! [`interfaces`]: persistence, the participant data source, the reward
//! ledger, and the render sink. Render and persistence hiccups degrade to
//! safe defaults instead of aborting the state machine.

use thiserror::Error as ThisError;

use dicepit_execution::{PayoutError, RosterError, SimulationError, TransitionError};
use dicepit_types::{game::SettingsError, AssetId, ChannelId, UserId};

pub mod board;
pub mod instance;
pub mod interfaces;
pub mod manager;
pub mod scheduler;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod tests;

pub use board::{BoardContent, RenderMode};
pub use instance::{Actor, Mailbox};
pub use manager::Manager;
pub use scheduler::Scheduler;

/// Coordination failure.
///
/// Configuration problems are fatal to their channel only; illegal
/// transitions and registration conflicts are surfaced to the caller;
/// external I/O failures never appear here because they are degraded at the
/// point of use.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("no settings available for channel {0:?}")]
    SettingsUnavailable(ChannelId),
    #[error("invalid settings for channel {channel:?}")]
    InvalidSettings {
        channel: ChannelId,
        #[source]
        source: SettingsError,
    },
    #[error("channel {0:?} already has a game instance")]
    InstanceExists(ChannelId),
    #[error("no game instance for channel {0:?}")]
    InstanceUnknown(ChannelId),
    #[error("game instance stopped")]
    InstanceStopped,
    #[error("waiting room is under maintenance")]
    UnderMaintenance,
    #[error("registry is locked while a game is active")]
    RegistryLocked,
    #[error("user {user:?} does not own asset {asset:?}")]
    AssetNotOwned { user: UserId, asset: AssetId },
    #[error("participant data source unavailable")]
    SourceUnavailable,
    #[error("persistence unavailable")]
    PersistenceUnavailable,
    #[error(transparent)]
    AlreadyRegistered(#[from] RosterError),
    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Payout(#[from] PayoutError),
}
