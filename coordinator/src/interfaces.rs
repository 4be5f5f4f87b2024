//! Abstract operations consumed from excluded collaborators.
//!
//! The engine never depends on concrete chat, storage, or wallet
//! implementations; it is a logic layer invoked through, and invoking,
//! these contracts. Implementations must be cheap to clone (handles over
//! shared state).

use std::future::Future;

use dicepit_types::{
    game::{AssetStats, BoostState, EncounterRecord, GameSettings, PopulationStats},
    AssetId, ChannelId, MessageRef, UserId, Wallet,
};

use crate::board::BoardContent;

/// Persisted channel and game state.
pub trait Persistence: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Settings backing a channel's next waiting room.
    fn load_channel_settings(
        &self,
        channel: ChannelId,
    ) -> impl Future<Output = Result<GameSettings, Self::Error>> + Send;

    /// Remember the rendered waiting-room message for restart recovery.
    fn save_message_reference(
        &self,
        channel: ChannelId,
        message: MessageRef,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Persist a finished game and its per-participant outcomes.
    fn record_encounter(
        &self,
        record: EncounterRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Current global boost state, if one was ever set.
    fn read_boost_state(
        &self,
    ) -> impl Future<Output = Result<Option<BoostState>, Self::Error>> + Send;

    /// Administrative boost setter.
    fn write_boost_state(
        &self,
        boost: BoostState,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Whether waiting rooms are currently suppressed.
    fn read_maintenance_flag(&self) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

/// External source of playable assets and their aggregate statistics.
pub trait ParticipantSource: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Assets a user may field.
    fn owned_playable_assets(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<AssetId>, Self::Error>> + Send;

    /// Lifetime statistics for one asset.
    fn aggregate_stats(
        &self,
        asset: AssetId,
    ) -> impl Future<Output = Result<AssetStats, Self::Error>> + Send;

    /// Population-wide averages over all assets.
    fn population_stats(
        &self,
    ) -> impl Future<Output = Result<PopulationStats, Self::Error>> + Send;
}

/// Sink for temporary (unclaimed) token balances.
pub trait RewardLedger: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn issue_temporary_tokens(
        &self,
        user: UserId,
        wallet: Wallet,
        asset: AssetId,
        amount: u64,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Sink for rendered channel content.
///
/// Every operation may fail (the channel can vanish at any time); callers
/// log and continue rather than propagate.
pub trait RenderSink: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send_to_channel(
        &self,
        channel: ChannelId,
        content: BoardContent,
    ) -> impl Future<Output = Result<MessageRef, Self::Error>> + Send;

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageRef,
        content: BoardContent,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageRef,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Most recent live message in a channel bearing a title marker.
    /// Used to sweep stale waiting rooms after a process restart.
    fn find_latest_by_title(
        &self,
        channel: ChannelId,
        title: String,
    ) -> impl Future<Output = Result<Option<MessageRef>, Self::Error>> + Send;
}
