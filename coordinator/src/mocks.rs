//! In-memory collaborators for tests and local development.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use dicepit_types::{
    game::{AssetStats, BoostState, EncounterRecord, GameSettings, PopulationStats},
    AssetId, ChannelId, MessageRef, UserId, Wallet,
};

use crate::{
    board::BoardContent,
    interfaces::{ParticipantSource, Persistence, RenderSink, RewardLedger},
};

/// Failure injected by a mock collaborator.
#[derive(Clone, Copy, Debug, Error)]
pub enum MockError {
    #[error("collaborator unavailable")]
    Unavailable,
    #[error("record not found")]
    NotFound,
}

/// In-memory persistence.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    settings: HashMap<ChannelId, GameSettings>,
    message_refs: HashMap<ChannelId, MessageRef>,
    encounters: Vec<EncounterRecord>,
    boost: Option<BoostState>,
    maintenance: bool,
    fail_boost_reads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_settings(&self, settings: GameSettings) {
        let mut inner = self.inner.lock().unwrap();
        inner.settings.insert(settings.channel, settings);
    }

    pub fn set_maintenance(&self, flag: bool) {
        self.inner.lock().unwrap().maintenance = flag;
    }

    pub fn set_boost(&self, boost: BoostState) {
        self.inner.lock().unwrap().boost = Some(boost);
    }

    pub fn fail_boost_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_boost_reads = fail;
    }

    pub fn encounters(&self) -> Vec<EncounterRecord> {
        self.inner.lock().unwrap().encounters.clone()
    }

    pub fn message_reference(&self, channel: ChannelId) -> Option<MessageRef> {
        self.inner.lock().unwrap().message_refs.get(&channel).copied()
    }
}

impl Persistence for MemoryStore {
    type Error = MockError;

    async fn load_channel_settings(&self, channel: ChannelId) -> Result<GameSettings, MockError> {
        self.inner
            .lock()
            .unwrap()
            .settings
            .get(&channel)
            .cloned()
            .ok_or(MockError::NotFound)
    }

    async fn save_message_reference(
        &self,
        channel: ChannelId,
        message: MessageRef,
    ) -> Result<(), MockError> {
        self.inner.lock().unwrap().message_refs.insert(channel, message);
        Ok(())
    }

    async fn record_encounter(&self, record: EncounterRecord) -> Result<(), MockError> {
        self.inner.lock().unwrap().encounters.push(record);
        Ok(())
    }

    async fn read_boost_state(&self) -> Result<Option<BoostState>, MockError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_boost_reads {
            return Err(MockError::Unavailable);
        }
        Ok(inner.boost)
    }

    async fn write_boost_state(&self, boost: BoostState) -> Result<(), MockError> {
        self.inner.lock().unwrap().boost = Some(boost);
        Ok(())
    }

    async fn read_maintenance_flag(&self) -> Result<bool, MockError> {
        Ok(self.inner.lock().unwrap().maintenance)
    }
}

/// In-memory asset ownership and statistics.
#[derive(Clone, Default)]
pub struct StaticAssets {
    inner: Arc<Mutex<AssetsInner>>,
}

#[derive(Default)]
struct AssetsInner {
    owned: HashMap<UserId, Vec<AssetId>>,
    stats: HashMap<AssetId, AssetStats>,
    population: PopulationStats,
    fail_stats: bool,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user: UserId, asset: AssetId, stats: AssetStats) {
        let mut inner = self.inner.lock().unwrap();
        inner.owned.entry(user).or_default().push(asset);
        inner.stats.insert(asset, stats);
    }

    pub fn set_population(&self, population: PopulationStats) {
        self.inner.lock().unwrap().population = population;
    }

    pub fn fail_stats(&self, fail: bool) {
        self.inner.lock().unwrap().fail_stats = fail;
    }
}

impl ParticipantSource for StaticAssets {
    type Error = MockError;

    async fn owned_playable_assets(&self, user: UserId) -> Result<Vec<AssetId>, MockError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .owned
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn aggregate_stats(&self, asset: AssetId) -> Result<AssetStats, MockError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_stats {
            return Err(MockError::Unavailable);
        }
        inner.stats.get(&asset).copied().ok_or(MockError::NotFound)
    }

    async fn population_stats(&self) -> Result<PopulationStats, MockError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_stats {
            return Err(MockError::Unavailable);
        }
        Ok(inner.population)
    }
}

/// In-memory reward ledger.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

#[derive(Default)]
struct LedgerInner {
    issued: Vec<(UserId, Wallet, AssetId, u64)>,
    fail: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> Vec<(UserId, Wallet, AssetId, u64)> {
        self.inner.lock().unwrap().issued.clone()
    }

    pub fn fail(&self, fail: bool) {
        self.inner.lock().unwrap().fail = fail;
    }
}

impl RewardLedger for MemoryLedger {
    type Error = MockError;

    async fn issue_temporary_tokens(
        &self,
        user: UserId,
        wallet: Wallet,
        asset: AssetId,
        amount: u64,
    ) -> Result<(), MockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail {
            return Err(MockError::Unavailable);
        }
        inner.issued.push((user, wallet, asset, amount));
        Ok(())
    }
}

/// In-memory render sink that keeps full message history.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<SinkInner>>,
}

#[derive(Default)]
struct SinkInner {
    next_ref: u64,
    messages: Vec<SinkMessage>,
    fail_sends: bool,
}

#[derive(Clone, Debug)]
pub struct SinkMessage {
    pub message: MessageRef,
    pub channel: ChannelId,
    pub content: BoardContent,
    pub alive: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a pre-existing message (e.g. a stale waiting room from a
    /// previous process).
    pub fn seed_message(&self, channel: ChannelId, content: BoardContent) -> MessageRef {
        let mut inner = self.inner.lock().unwrap();
        inner.next_ref += 1;
        let message = MessageRef(inner.next_ref);
        inner.messages.push(SinkMessage {
            message,
            channel,
            content,
            alive: true,
        });
        message
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.lock().unwrap().fail_sends = fail;
    }

    /// Live messages in a channel bearing a title.
    pub fn alive_with_title(&self, channel: ChannelId, title: &str) -> Vec<MessageRef> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.alive && m.channel == channel && m.content.title == title)
            .map(|m| m.message)
            .collect()
    }

    pub fn content_of(&self, message: MessageRef) -> Option<BoardContent> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|m| m.message == message)
            .map(|m| m.content.clone())
    }

    pub fn is_alive(&self, message: MessageRef) -> bool {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .any(|m| m.message == message && m.alive)
    }

    pub fn sends(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }
}

impl RenderSink for MemorySink {
    type Error = MockError;

    async fn send_to_channel(
        &self,
        channel: ChannelId,
        content: BoardContent,
    ) -> Result<MessageRef, MockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sends {
            return Err(MockError::Unavailable);
        }
        inner.next_ref += 1;
        let message = MessageRef(inner.next_ref);
        inner.messages.push(SinkMessage {
            message,
            channel,
            content,
            alive: true,
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageRef,
        content: BoardContent,
    ) -> Result<(), MockError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .messages
            .iter_mut()
            .find(|m| m.alive && m.message == message && m.channel == channel)
        {
            Some(existing) => {
                existing.content = content;
                Ok(())
            }
            None => Err(MockError::NotFound),
        }
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageRef,
    ) -> Result<(), MockError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .messages
            .iter_mut()
            .find(|m| m.alive && m.message == message && m.channel == channel)
        {
            Some(existing) => {
                existing.alive = false;
                Ok(())
            }
            None => Err(MockError::NotFound),
        }
    }

    async fn find_latest_by_title(
        &self,
        channel: ChannelId,
        title: String,
    ) -> Result<Option<MessageRef>, MockError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.alive && m.channel == channel && m.content.title == title)
            .map(|m| m.message)
            .max_by_key(|m| m.0))
    }
}
