//! Top-level registry of game instances, keyed by channel.

use std::collections::HashMap;

use commonware_runtime::{Clock, Handle, Metrics, Spawner};
use futures::future::join_all;
use rand::Rng;
use tracing::{info, warn};

use dicepit_execution::payout;
use dicepit_types::{
    game::{BoostState, GameStateValue},
    AssetId, ChannelId, UserId, Wallet,
};

use crate::{
    board::RenderMode,
    instance::{self, Actor, Mailbox},
    interfaces::{ParticipantSource, Persistence, RenderSink, RewardLedger},
    Error,
};

/// Shared collaborators and tuning for every instance the manager spawns.
pub struct Config<P, S, L, R> {
    pub persistence: P,
    pub participants: S,
    pub ledger: L,
    pub renderer: R,
    pub render_mode: RenderMode,
    pub mailbox_size: usize,
}

struct Instance {
    mailbox: Mailbox,
    _handle: Handle<()>,
}

/// Owns every channel's game instance. Exactly one instance may exist per
/// channel; instances run concurrently and share no mutable state.
pub struct Manager<E, P, S, L, R>
where
    E: Rng + Spawner + Metrics + Clock + Clone,
    P: Persistence,
    S: ParticipantSource,
    L: RewardLedger,
    R: RenderSink,
{
    context: E,
    persistence: P,
    participants: S,
    ledger: L,
    renderer: R,
    render_mode: RenderMode,
    mailbox_size: usize,
    instances: HashMap<ChannelId, Instance>,
}

impl<E, P, S, L, R> Manager<E, P, S, L, R>
where
    E: Rng + Spawner + Metrics + Clock + Clone,
    P: Persistence,
    S: ParticipantSource,
    L: RewardLedger,
    R: RenderSink,
{
    pub fn new(context: E, config: Config<P, S, L, R>) -> Self {
        Self {
            context,
            persistence: config.persistence,
            participants: config.participants,
            ledger: config.ledger,
            renderer: config.renderer,
            render_mode: config.render_mode,
            mailbox_size: config.mailbox_size,
            instances: HashMap::new(),
        }
    }

    /// Spawn the actor for a channel. The waiting room is not opened yet;
    /// callers follow up with [`Mailbox::open`] (or use [`Self::start_all`]).
    pub fn register(&mut self, channel: ChannelId) -> Result<Mailbox, Error> {
        if self.instances.contains_key(&channel) {
            return Err(Error::InstanceExists(channel));
        }
        let label = format!("instance_{}", channel.0);
        let (actor, mailbox) = Actor::new(
            self.context.with_label(&label),
            instance::Config {
                channel,
                persistence: self.persistence.clone(),
                participants: self.participants.clone(),
                ledger: self.ledger.clone(),
                renderer: self.renderer.clone(),
                render_mode: self.render_mode,
                mailbox_size: self.mailbox_size,
            },
        );
        let handle = actor.start();
        self.instances.insert(
            channel,
            Instance {
                mailbox: mailbox.clone(),
                _handle: handle,
            },
        );
        Ok(mailbox)
    }

    /// Open waiting rooms for every channel concurrently. One channel's
    /// failure never aborts the others; all failures are returned.
    pub async fn start_all(&mut self, channels: Vec<ChannelId>) -> Vec<(ChannelId, Error)> {
        let mut failures = Vec::new();
        let mut pending = Vec::new();
        for channel in channels {
            match self.register(channel) {
                Ok(mut mailbox) => pending.push(async move { (channel, mailbox.open().await) }),
                Err(e) => failures.push((channel, e)),
            }
        }
        for (channel, result) in join_all(pending).await {
            match result {
                Ok(state) => info!(channel = channel.0, ?state, "waiting room ready"),
                Err(e) => {
                    warn!(channel = channel.0, %e, "failed to open waiting room");
                    failures.push((channel, e));
                }
            }
        }
        failures
    }

    /// Mailbox of a channel's instance.
    pub fn mailbox(&self, channel: ChannelId) -> Result<Mailbox, Error> {
        self.instances
            .get(&channel)
            .map(|instance| instance.mailbox.clone())
            .ok_or(Error::InstanceUnknown(channel))
    }

    pub async fn join(
        &self,
        channel: ChannelId,
        user: UserId,
        wallet: Wallet,
        asset: AssetId,
    ) -> Result<(), Error> {
        self.mailbox(channel)?.join(user, wallet, asset).await
    }

    pub async fn withdraw(&self, channel: ChannelId, user: UserId) -> Result<bool, Error> {
        self.mailbox(channel)?.withdraw(user).await
    }

    pub async fn reset(&self, channel: ChannelId) -> Result<(), Error> {
        self.mailbox(channel)?.reset().await
    }

    pub async fn state(&self, channel: ChannelId) -> Result<GameStateValue, Error> {
        self.mailbox(channel)?.state().await
    }

    /// Administrative boost setter; the window is validated before it is
    /// written.
    pub async fn set_boost(&self, boost: BoostState) -> Result<(), Error> {
        payout::validate_boost(&boost)?;
        self.persistence.write_boost_state(boost).await.map_err(|e| {
            warn!(?e, "failed to write boost state");
            Error::PersistenceUnavailable
        })
    }

    /// Retry opening any instance parked in maintenance. Wired to the
    /// scheduler at startup so cleared flags are picked up.
    pub async fn sweep_maintenance(&self) -> Vec<(ChannelId, Error)> {
        let mut failures = Vec::new();
        for (channel, instance) in &self.instances {
            let mut mailbox = instance.mailbox.clone();
            match mailbox.state().await {
                Ok(GameStateValue::Maintenance) => {
                    if let Err(e) = mailbox.reset().await {
                        failures.push((*channel, e));
                    }
                }
                Ok(_) => {}
                Err(e) => failures.push((*channel, e)),
            }
        }
        failures
    }

    /// Drop a channel's instance. Closing the mailbox lets the actor clean
    /// up its renders and exit.
    pub fn shutdown(&mut self, channel: ChannelId) -> bool {
        self.instances.remove(&channel).is_some()
    }

    pub fn channels(&self) -> usize {
        self.instances.len()
    }
}
