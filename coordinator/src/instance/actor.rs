use std::{
    sync::atomic::AtomicU64,
    time::{Duration, SystemTime},
};

use commonware_macros::select;
use commonware_runtime::{Clock, Handle, Metrics, Spawner};
use futures::{channel::mpsc, StreamExt};
use prometheus_client::metrics::counter::Counter;
use rand::Rng;
use tracing::{debug, info, warn};

use dicepit_execution::{cooldown, payout, simulate, DiceRng, Machine, Roster, SimulationError};
use dicepit_types::{
    game::{
        AssetStats, EncounterOutcome, EncounterRecord, GameSettings, GameStateValue, Participant,
        PopulationStats, ROLLS_PER_ROUND,
    },
    AssetId, ChannelId, MessageRef, UserId, Wallet,
};

use super::{
    ingress::{Mailbox, Message},
    Config,
};
use crate::{
    board::{self, BoardContent, RenderMode, StepPhase},
    interfaces::{ParticipantSource, Persistence, RenderSink, RewardLedger},
    Error,
};

/// Base identity for NPC seats; never collides with platform user ids.
const NPC_USER_BASE: u64 = u64::MAX - 64;

/// Base identity for the house assets NPCs field.
const NPC_ASSET_BASE: u64 = u64::MAX - 64;

/// Outcome of one pacing suspension during round stepping.
enum Pace {
    /// The step delay elapsed undisturbed.
    Elapsed,
    /// A message arrived first (`None` when the mailbox closed).
    Message(Option<Message>),
}

/// Game instance actor for one channel.
///
/// All mutation of the machine and roster happens on this actor's task;
/// the mailbox serializes external events, so transitions never race.
pub struct Actor<E, P, S, L, R>
where
    E: Rng + Spawner + Metrics + Clock + Clone,
    P: Persistence,
    S: ParticipantSource,
    L: RewardLedger,
    R: RenderSink,
{
    context: E,
    channel: ChannelId,
    persistence: P,
    participants: S,
    ledger: L,
    renderer: R,
    render_mode: RenderMode,
    mailbox: mpsc::Receiver<Message>,

    machine: Machine,
    roster: Roster,
    settings: Option<GameSettings>,
    room_message: Option<MessageRef>,
    board_message: Option<MessageRef>,
    /// Bumped for every waiting room opened; seeds that game's dice.
    game_nonce: u64,

    games_started: Counter<u64, AtomicU64>,
    games_completed: Counter<u64, AtomicU64>,
    render_failures: Counter<u64, AtomicU64>,
}

fn system_time_ms(now: SystemTime) -> u64 {
    match now.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as u64,
        Err(_) => 0,
    }
}

impl<E, P, S, L, R> Actor<E, P, S, L, R>
where
    E: Rng + Spawner + Metrics + Clock + Clone,
    P: Persistence,
    S: ParticipantSource,
    L: RewardLedger,
    R: RenderSink,
{
    /// Create a new game instance actor.
    pub fn new(context: E, config: Config<P, S, L, R>) -> (Self, Mailbox) {
        let (sender, mailbox) = mpsc::channel(config.mailbox_size);
        let inbound = Mailbox::new(sender);

        let games_started: Counter<u64, AtomicU64> = Counter::default();
        let games_completed: Counter<u64, AtomicU64> = Counter::default();
        let render_failures: Counter<u64, AtomicU64> = Counter::default();
        context.register(
            "games_started",
            "Number of games started",
            games_started.clone(),
        );
        context.register(
            "games_completed",
            "Number of games completed",
            games_completed.clone(),
        );
        context.register(
            "render_failures",
            "Number of render operations that failed",
            render_failures.clone(),
        );

        (
            Self {
                context,
                channel: config.channel,
                persistence: config.persistence,
                participants: config.participants,
                ledger: config.ledger,
                renderer: config.renderer,
                render_mode: config.render_mode,
                mailbox,
                machine: Machine::new(),
                roster: Roster::new(),
                settings: None,
                room_message: None,
                board_message: None,
                game_nonce: 0,
                games_started,
                games_completed,
                render_failures,
            },
            inbound,
        )
    }

    pub fn start(mut self) -> Handle<()> {
        self.context.spawn_ref()(self.run())
    }

    async fn run(mut self) {
        loop {
            let Some(message) = self.mailbox.next().await else {
                debug!(channel = self.channel.0, "mailbox closed");
                self.clear_board().await;
                return;
            };
            match message {
                Message::Open { response } => {
                    let result = self.open_room().await;
                    let _ = response.send(result);
                }
                Message::Join {
                    user,
                    wallet,
                    asset,
                    response,
                } => {
                    let result = self.handle_join(user, wallet, asset).await;
                    let joined = result.is_ok();
                    let _ = response.send(result);
                    if joined && self.capacity_reached() {
                        if let Err(e) = self.run_game().await {
                            warn!(channel = self.channel.0, %e, "game failed");
                        }
                    }
                }
                Message::Withdraw { user, response } => {
                    let result = self.handle_withdraw(user).await;
                    let _ = response.send(result);
                }
                Message::Reset { response } => {
                    let result = self.handle_reset().await;
                    let _ = response.send(result);
                }
                Message::State { response } => {
                    let _ = response.send(self.machine.state());
                }
            }
        }
    }

    fn capacity_reached(&self) -> bool {
        match &self.settings {
            Some(settings) => self.roster.count() as u32 >= settings.max_capacity,
            None => false,
        }
    }

    fn now_ms(&self) -> u64 {
        system_time_ms(self.context.current())
    }

    /// Open a fresh waiting room, or park in maintenance if the flag is set.
    async fn open_room(&mut self) -> Result<GameStateValue, Error> {
        // The previous game board (if any) comes down first.
        self.clear_board().await;

        // Sweep any stale waiting room left behind by an earlier process.
        // Matching is by title marker, not stored reference, so recovery
        // works across restarts.
        match self
            .renderer
            .find_latest_by_title(self.channel, board::WAITING_ROOM_TITLE.to_string())
            .await
        {
            Ok(Some(stale)) if Some(stale) != self.room_message => {
                if let Err(e) = self.renderer.delete_message(self.channel, stale).await {
                    warn!(channel = self.channel.0, ?e, "failed to remove stale room");
                    self.render_failures.inc();
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(channel = self.channel.0, ?e, "stale room lookup failed");
                self.render_failures.inc();
            }
        }

        // Maintenance wins over opening a room.
        let maintenance = match self.persistence.read_maintenance_flag().await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(channel = self.channel.0, ?e, "maintenance flag unavailable, assuming clear");
                false
            }
        };
        if maintenance {
            self.machine.transition(GameStateValue::Maintenance)?;
            info!(channel = self.channel.0, "waiting room suppressed by maintenance");
            return Ok(GameStateValue::Maintenance);
        }

        // Re-entrant open with a live room is a no-op.
        if self.machine.state() == GameStateValue::WaitingRoom
            && self.room_message.is_some()
            && self.settings.is_some()
        {
            return Ok(GameStateValue::WaitingRoom);
        }

        // Fresh settings for the new room; never mutated once loaded.
        let settings = self
            .persistence
            .load_channel_settings(self.channel)
            .await
            .map_err(|e| {
                warn!(channel = self.channel.0, ?e, "settings unavailable");
                Error::SettingsUnavailable(self.channel)
            })?;
        settings.validate().map_err(|source| Error::InvalidSettings {
            channel: self.channel,
            source,
        })?;

        self.machine.transition(GameStateValue::WaitingRoom)?;
        self.roster.clear();
        self.game_nonce += 1;

        let content = board::waiting_room(&settings, 0);
        self.settings = Some(settings);
        match self.renderer.send_to_channel(self.channel, content).await {
            Ok(message) => {
                self.room_message = Some(message);
                if let Err(e) = self
                    .persistence
                    .save_message_reference(self.channel, message)
                    .await
                {
                    warn!(channel = self.channel.0, ?e, "failed to persist room reference");
                }
            }
            Err(e) => {
                warn!(channel = self.channel.0, ?e, "failed to render waiting room");
                self.render_failures.inc();
                self.room_message = None;
            }
        }
        info!(channel = self.channel.0, nonce = self.game_nonce, "waiting room open");
        Ok(GameStateValue::WaitingRoom)
    }

    async fn handle_join(
        &mut self,
        user: UserId,
        wallet: Wallet,
        asset: AssetId,
    ) -> Result<(), Error> {
        match self.machine.state() {
            GameStateValue::WaitingRoom => {}
            GameStateValue::Maintenance => return Err(Error::UnderMaintenance),
            _ => return Err(Error::RegistryLocked),
        }
        if self.settings.is_none() {
            return Err(Error::SettingsUnavailable(self.channel));
        }

        // Ownership is checked through the participant source; a lookup
        // failure rejects the join rather than trusting the request.
        let owned = self
            .participants
            .owned_playable_assets(user)
            .await
            .map_err(|e| {
                warn!(channel = self.channel.0, ?e, "asset lookup failed");
                Error::SourceUnavailable
            })?;
        if !owned.contains(&asset) {
            return Err(Error::AssetNotOwned { user, asset });
        }

        // The entire game is simulated eagerly at registration.
        let mut rng = DiceRng::new(self.channel, self.game_nonce, user.0);
        let sequence = simulate(&mut rng)?;
        self.roster
            .add(Participant::human(user, wallet, asset, sequence))?;
        debug!(
            channel = self.channel.0,
            user = user.0,
            joined = self.roster.count(),
            "participant registered"
        );
        self.update_room().await;
        Ok(())
    }

    async fn handle_withdraw(&mut self, user: UserId) -> Result<bool, Error> {
        if self.machine.state() != GameStateValue::WaitingRoom {
            return Err(Error::RegistryLocked);
        }
        let removed = self.roster.remove(user);
        if removed {
            debug!(channel = self.channel.0, user = user.0, "participant withdrew");
            self.update_room().await;
        }
        Ok(removed)
    }

    async fn handle_reset(&mut self) -> Result<(), Error> {
        // Re-entrant reset: already in a waiting room, no duplicate side
        // effects.
        if self.machine.state() == GameStateValue::WaitingRoom {
            return Ok(());
        }
        self.open_room().await.map(|_| ())
    }

    /// Run one full game: seat NPCs, step every pre-simulated sequence in
    /// lockstep, settle rewards, and reopen the waiting room.
    async fn run_game(&mut self) -> Result<(), Error> {
        let settings = self
            .settings
            .clone()
            .ok_or(Error::SettingsUnavailable(self.channel))?;
        self.machine.transition(GameStateValue::ActiveGame)?;
        self.games_started.inc();
        info!(channel = self.channel.0, nonce = self.game_nonce, "game started");

        // Seat the house.
        for i in 0..settings.game_type.npc_count() as u64 {
            let user = UserId(NPC_USER_BASE + i);
            let asset = AssetId(NPC_ASSET_BASE + i);
            let mut rng = DiceRng::new(self.channel, self.game_nonce, user.0);
            let sequence = simulate(&mut rng)?;
            self.roster.add(Participant::npc(user, asset, sequence))?;
        }

        // Swap the waiting room for the live board.
        self.clear_room().await;
        let content = board::game_board(self.roster.all(), 0, 0, 0);
        match self.renderer.send_to_channel(self.channel, content).await {
            Ok(message) => self.board_message = Some(message),
            Err(e) => {
                // The game continues without a board.
                warn!(channel = self.channel.0, ?e, "failed to render board");
                self.render_failures.inc();
                self.board_message = None;
            }
        }

        // Pure NPC seats cannot produce a payable winner.
        if self.roster.all_npc() {
            self.machine.transition(GameStateValue::Finished)?;
            let record = self.settle(None, &settings).await;
            self.record(record).await;
            self.games_completed.inc();
            info!(channel = self.channel.0, "no contest, npc seats only");
            self.reopen().await;
            return Ok(());
        }

        let Some((win_round, win_roll, winner_index)) = self.find_winner() else {
            // Every sequence ends in a win, so an empty scan is a breach.
            return Err(Error::Simulation(SimulationError::WinNotReached));
        };

        // Step the sequences in lockstep, pausing between reveals. The
        // mailbox stays live throughout so a reset can cancel mid-game.
        'steps: for round in 0..=win_round {
            for roll in 0..ROLLS_PER_ROUND {
                for index in 0..self.roster.count() {
                    if self.roster.all()[index].sequence.roll_at(round, roll).is_none() {
                        continue;
                    }
                    let is_final = (round, roll, index) == (win_round, win_roll, winner_index);
                    let phase = if is_final {
                        StepPhase::FinalReveal
                    } else if roll == ROLLS_PER_ROUND - 1 {
                        StepPhase::RoundBoundary
                    } else {
                        StepPhase::Roll
                    };
                    let delay = self.render_mode.step_delay(phase);
                    loop {
                        match self.pace(delay).await {
                            Pace::Elapsed => break,
                            Pace::Message(None) => {
                                self.cancel_game().await;
                                return Ok(());
                            }
                            Pace::Message(Some(message)) => {
                                if self.interrupt(message) {
                                    self.cancel_game().await;
                                    return Ok(());
                                }
                            }
                        }
                    }
                    let content = board::game_board(self.roster.all(), round, roll, index + 1);
                    self.update_board(content).await;
                    if is_final {
                        break 'steps;
                    }
                }
            }
        }

        // Winner determined.
        self.machine.transition(GameStateValue::Win)?;
        if let Some(winner) = self.roster.all_mut().get_mut(winner_index) {
            winner.is_winner = true;
        }
        let zen = self.roster.all()[winner_index].sequence.zen;
        info!(
            channel = self.channel.0,
            winner = self.roster.all()[winner_index].user.0,
            win_round,
            zen,
            "winner determined"
        );

        // Rewards and stats settle before the machine may finish.
        let record = self
            .settle(Some((winner_index, win_round as u32, zen)), &settings)
            .await;
        let paid = record
            .outcomes
            .iter()
            .find(|o| o.is_winner)
            .map(|o| o.payout)
            .unwrap_or(0);

        // Announce, then freeze the board in its final state.
        let announcement = board::win_announcement(&self.roster.all()[winner_index], paid);
        if let Err(e) = self.renderer.send_to_channel(self.channel, announcement).await {
            warn!(channel = self.channel.0, ?e, "failed to render announcement");
            self.render_failures.inc();
        }
        let content = board::final_board(self.roster.all());
        self.update_board(content).await;

        self.record(record).await;
        self.machine.transition(GameStateValue::Finished)?;
        self.games_completed.inc();
        self.reopen().await;
        Ok(())
    }

    /// First (round, roll, combatant) position whose roll lands the win.
    fn find_winner(&self) -> Option<(usize, usize, usize)> {
        let participants = self.roster.all();
        let max_rounds = participants
            .iter()
            .map(|p| p.sequence.rounds.len())
            .max()?;
        for round in 0..max_rounds {
            for roll in 0..ROLLS_PER_ROUND {
                for (index, participant) in participants.iter().enumerate() {
                    if participant.sequence.wins_at(round, roll) {
                        return Some((round, roll, index));
                    }
                }
            }
        }
        None
    }

    /// Suspend between steps while staying responsive to the mailbox.
    async fn pace(&mut self, delay: Duration) -> Pace {
        let context = self.context.clone();
        select! {
            message = self.mailbox.next() => { Pace::Message(message) },
            _ = context.sleep(delay) => { Pace::Elapsed },
        }
    }

    /// Handle a message that arrived mid-game. Returns true when the game
    /// must be canceled. A handled message restarts the current step delay.
    fn interrupt(&mut self, message: Message) -> bool {
        match message {
            Message::Reset { response } => {
                let _ = response.send(Ok(()));
                true
            }
            Message::Join { response, .. } => {
                // The registry is frozen once the game is active.
                let _ = response.send(Err(Error::RegistryLocked));
                false
            }
            Message::Withdraw { response, .. } => {
                let _ = response.send(Err(Error::RegistryLocked));
                false
            }
            Message::Open { response } => {
                let _ = response.send(Err(Error::RegistryLocked));
                false
            }
            Message::State { response } => {
                let _ = response.send(self.machine.state());
                false
            }
        }
    }

    /// Cancellation still removes the board before returning.
    async fn cancel_game(&mut self) {
        info!(channel = self.channel.0, "game canceled");
        self.clear_board().await;
        if let Err(e) = self.machine.transition(GameStateValue::Finished) {
            warn!(channel = self.channel.0, %e, "cancel transition rejected");
        }
        self.reopen().await;
    }

    /// Settle cooldowns, payouts, and stats for every participant.
    ///
    /// Per participant the outcome is transactional: if the winner's token
    /// issuance fails, that participant's stat record is skipped too.
    async fn settle(
        &mut self,
        winner: Option<(usize, u32, bool)>,
        settings: &GameSettings,
    ) -> EncounterRecord {
        let population = match self.participants.population_stats().await {
            Ok(population) => population,
            Err(e) => {
                warn!(channel = self.channel.0, ?e, "population stats unavailable, bias neutral");
                PopulationStats::default()
            }
        };
        let boost = self.active_boost().await;

        let mut outcomes = Vec::with_capacity(self.roster.count());
        for index in 0..self.roster.count() {
            let (user, wallet, asset, is_npc) = {
                let participant = &self.roster.all()[index];
                (
                    participant.user,
                    participant.wallet.clone(),
                    participant.asset,
                    participant.is_npc,
                )
            };
            let is_winner = winner.map(|(i, _, _)| i == index).unwrap_or(false);

            // NPC seats are recorded but never mutated: no cooldown, no
            // payout, no stats.
            if is_npc {
                outcomes.push(EncounterOutcome {
                    user,
                    asset,
                    is_winner,
                    is_npc: true,
                    payout: 0,
                    cooldown_ms: 0,
                    cooldown_adjusted: false,
                });
                continue;
            }

            let stats = match self.participants.aggregate_stats(asset).await {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(channel = self.channel.0, ?e, asset = asset.0, "stats unavailable");
                    AssetStats::default()
                }
            };
            let bias = cooldown::bias(&stats, &population);
            let roll = cooldown::apply(settings.cooldown_base_ms, &bias, &mut self.context);

            let mut paid = 0;
            if is_winner {
                let (_, win_round, zen) = winner.unwrap();
                let amount = payout::winner_payout(&settings.token, win_round, zen)
                    .and_then(|amount| payout::boosted(amount, boost));
                match amount {
                    Ok(amount) => {
                        if let Err(e) = self
                            .ledger
                            .issue_temporary_tokens(user, wallet, asset, amount)
                            .await
                        {
                            warn!(
                                channel = self.channel.0,
                                user = user.0,
                                ?e,
                                "token issuance failed, skipping stat mutation"
                            );
                            continue;
                        }
                        paid = amount;
                    }
                    Err(e) => {
                        warn!(channel = self.channel.0, %e, "payout rejected");
                        continue;
                    }
                }
            }

            if let Some(participant) = self.roster.all_mut().get_mut(index) {
                participant.cooldown_ms = roll.cooldown_ms;
                participant.cooldown_adjusted = roll.adjusted;
            }
            outcomes.push(EncounterOutcome {
                user,
                asset,
                is_winner,
                is_npc: false,
                payout: paid,
                cooldown_ms: roll.cooldown_ms,
                cooldown_adjusted: roll.adjusted,
            });
        }

        EncounterRecord {
            channel: self.channel,
            game_type: settings.game_type,
            win_round: winner.map(|(_, round, _)| round),
            outcomes,
        }
    }

    /// Boost multiplier active right now; every failure degrades to none.
    async fn active_boost(&self) -> Option<u64> {
        let boost = match self.persistence.read_boost_state().await {
            Ok(Some(boost)) => boost,
            Ok(None) => return None,
            Err(e) => {
                warn!(channel = self.channel.0, ?e, "boost state unavailable, no modifier");
                return None;
            }
        };
        match payout::active_boost(&boost, self.now_ms()) {
            Ok(multiplier) => multiplier,
            Err(e) => {
                warn!(channel = self.channel.0, %e, "malformed boost state, no modifier");
                None
            }
        }
    }

    async fn record(&mut self, record: EncounterRecord) {
        if let Err(e) = self.persistence.record_encounter(record).await {
            warn!(channel = self.channel.0, ?e, "failed to record encounter");
        }
    }

    /// Drive back into a fresh waiting room after a finished or canceled
    /// game; a failure leaves the instance parked until the next reset.
    async fn reopen(&mut self) {
        if let Err(e) = self.open_room().await {
            warn!(channel = self.channel.0, %e, "failed to reopen waiting room");
        }
    }

    async fn update_room(&mut self) {
        let Some(settings) = &self.settings else {
            return;
        };
        let Some(message) = self.room_message else {
            return;
        };
        let content = board::waiting_room(settings, self.roster.count());
        if let Err(e) = self.renderer.edit_message(self.channel, message, content).await {
            warn!(channel = self.channel.0, ?e, "failed to update waiting room");
            self.render_failures.inc();
        }
    }

    async fn update_board(&mut self, content: BoardContent) {
        let Some(message) = self.board_message else {
            return;
        };
        if let Err(e) = self.renderer.edit_message(self.channel, message, content).await {
            warn!(channel = self.channel.0, ?e, "failed to update board");
            self.render_failures.inc();
        }
    }

    async fn clear_room(&mut self) {
        if let Some(message) = self.room_message.take() {
            if let Err(e) = self.renderer.delete_message(self.channel, message).await {
                warn!(channel = self.channel.0, ?e, "failed to remove waiting room");
                self.render_failures.inc();
            }
        }
    }

    async fn clear_board(&mut self) {
        if let Some(message) = self.board_message.take() {
            if let Err(e) = self.renderer.delete_message(self.channel, message).await {
                warn!(channel = self.channel.0, ?e, "failed to remove board");
                self.render_failures.inc();
            }
        }
    }
}
