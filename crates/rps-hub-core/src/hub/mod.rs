//! The hub: factory and registry for game instances.
//!
//! All state-changing operations go through one mutex, which is the
//! single global serializer of the execution model: operations against
//! the hub and its games are totally ordered and atomic from the caller's
//! perspective. Time is read from the injected [`Clock`], payouts leave
//! through the injected [`Settlement`] seam.

mod params;

pub use params::{GameParams, HubConfig};

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::crypto::{MoveCommitment, Secret};
use crate::error::{HubError, Result};
use crate::event::{EventKind, EventRecord};
use crate::game::{GameInstance, GameSnapshot, Move};
use crate::ledger::{Clock, Settlement};
use crate::types::{Amount, GameId, PlayerId};

struct TrackedGame {
    instance: GameInstance,
    running: bool,
    created_at: DateTime<Utc>,
}

struct HubInner {
    owner: PlayerId,
    paused: bool,
    fee_balance: Amount,
    games: HashMap<GameId, TrackedGame>,
    events: Vec<EventRecord>,
}

impl HubInner {
    fn emit(&mut self, at: DateTime<Utc>, game: Option<GameId>, kind: EventKind) {
        let seq = self.events.len() as u64;
        self.events.push(EventRecord {
            seq,
            at,
            game,
            kind,
        });
    }

    fn ensure_owner(&self, caller: PlayerId) -> Result<()> {
        if caller != self.owner {
            Err(HubError::Unauthorized(caller))
        } else {
            Ok(())
        }
    }
}

/// Hub-side view of a tracked game
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameView {
    pub snapshot: GameSnapshot,
    pub running: bool,
    pub created_at: DateTime<Utc>,
}

/// Factory and registry owning the lifecycle of many game instances.
///
/// Cheap to clone; clones share the same serialized state.
#[derive(Clone)]
pub struct GameHub {
    inner: Arc<Mutex<HubInner>>,
    clock: Arc<dyn Clock>,
    settlement: Arc<dyn Settlement>,
    fee: Amount,
    timeout: Duration,
}

impl GameHub {
    /// Create a hub owned by `owner` with the given fixed configuration.
    pub fn new(
        owner: PlayerId,
        config: HubConfig,
        clock: Arc<dyn Clock>,
        settlement: Arc<dyn Settlement>,
    ) -> Result<Self> {
        if owner.is_zero() {
            return Err(HubError::ZeroAddressPlayer);
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(HubInner {
                owner,
                paused: config.start_paused,
                fee_balance: 0,
                games: HashMap::new(),
                events: Vec::new(),
            })),
            clock,
            settlement,
            fee: config.fee,
            timeout: config.timeout,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap()
    }

    // ---- Creation ----

    /// Create a new game instance from pre-validated parameters.
    ///
    /// The caller must be one of the two designated players and must pay
    /// at least the creation fee; the whole amount sent is retained by
    /// the hub. Returns the new instance's reference.
    pub fn create_game(
        &self,
        caller: PlayerId,
        params: GameParams,
        fee_paid: Amount,
    ) -> Result<GameId> {
        let mut inner = self.lock();
        let now = self.clock.now();
        if inner.paused {
            return Err(HubError::HubPaused);
        }
        if fee_paid < self.fee {
            return Err(HubError::InsufficientFee {
                paid: fee_paid,
                required: self.fee,
            });
        }
        if !params.includes(caller) {
            return Err(HubError::UnauthorizedCaller(caller));
        }

        let id = GameId::new();
        let instance = GameInstance::new(id, &params, self.timeout, now);
        inner.games.insert(
            id,
            TrackedGame {
                instance,
                running: true,
                created_at: now,
            },
        );
        inner.fee_balance += fee_paid;
        inner.emit(
            now,
            Some(id),
            EventKind::InstanceCreated {
                creator: caller,
                player_a: params.player_a(),
                player_b: params.player_b(),
                stake: params.stake(),
            },
        );
        tracing::info!(game = %id, stake = params.stake(), "game created");
        Ok(id)
    }

    /// Raw-argument creation path: validates into a [`GameParams`] first,
    /// then proceeds identically to [`create_game`](Self::create_game).
    pub fn create_game_raw(
        &self,
        caller: PlayerId,
        player_a: PlayerId,
        player_b: PlayerId,
        stake: Amount,
        fee_paid: Amount,
    ) -> Result<GameId> {
        let params = GameParams::new(player_a, player_b, stake)?;
        self.create_game(caller, params, fee_paid)
    }

    // ---- Game operations, addressed by instance reference ----

    pub fn play(
        &self,
        id: GameId,
        caller: PlayerId,
        commitment: MoveCommitment,
        stake_sent: Amount,
    ) -> Result<()> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let tracked = inner.games.get_mut(&id).ok_or(HubError::UnknownGame(id))?;
        tracked.instance.play(caller, commitment, stake_sent, now)?;
        inner.emit(now, Some(id), EventKind::Played { player: caller });
        tracing::debug!(game = %id, player = %caller, "commitment stored");
        Ok(())
    }

    pub fn reveal(&self, id: GameId, caller: PlayerId, secret: &Secret, mv: Move) -> Result<()> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let tracked = inner.games.get_mut(&id).ok_or(HubError::UnknownGame(id))?;
        tracked.instance.reveal(caller, secret, mv, now)?;
        inner.emit(now, Some(id), EventKind::Revealed { player: caller });
        tracing::debug!(game = %id, player = %caller, "move revealed");
        Ok(())
    }

    /// Claim the full pot as the winner. Returns the amount paid out.
    pub fn claim_winner(&self, id: GameId, caller: PlayerId) -> Result<Amount> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let tracked = inner.games.get_mut(&id).ok_or(HubError::UnknownGame(id))?;
        let amount = tracked.instance.claim_winner(caller, now, &*self.settlement)?;
        inner.emit(
            now,
            Some(id),
            EventKind::WinnerClaimed {
                winner: caller,
                amount,
            },
        );
        tracing::info!(game = %id, winner = %caller, amount, "winner claimed");
        Ok(amount)
    }

    /// Claim one stake back on a draw. Returns the amount paid out.
    pub fn claim_draw(&self, id: GameId, caller: PlayerId) -> Result<Amount> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let tracked = inner.games.get_mut(&id).ok_or(HubError::UnknownGame(id))?;
        let (amount, _finished) = tracked.instance.claim_draw(caller, now, &*self.settlement)?;
        inner.emit(
            now,
            Some(id),
            EventKind::DrawClaimed {
                player: caller,
                amount,
            },
        );
        tracing::info!(game = %id, player = %caller, amount, "draw claimed");
        Ok(amount)
    }

    /// Claim the remaining escrow after the counterparty stalled past the
    /// inactivity window. Returns the amount paid out.
    pub fn claim_timeout(&self, id: GameId, caller: PlayerId) -> Result<Amount> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let tracked = inner.games.get_mut(&id).ok_or(HubError::UnknownGame(id))?;
        let amount = tracked.instance.claim_timeout(caller, now, &*self.settlement)?;
        inner.emit(
            now,
            Some(id),
            EventKind::TimeoutClaimed {
                player: caller,
                amount,
            },
        );
        tracing::info!(game = %id, player = %caller, amount, "timeout claimed");
        Ok(amount)
    }

    // ---- Owner-only lifecycle operations ----

    /// Mark a tracked game as no longer running. Hub-side bookkeeping
    /// only; the instance's own fund custody is unaffected.
    pub fn kill_game(&self, caller: PlayerId, id: GameId) -> Result<()> {
        let mut inner = self.lock();
        let now = self.clock.now();
        inner.ensure_owner(caller)?;
        let tracked = inner.games.get_mut(&id).ok_or(HubError::UnknownGame(id))?;
        tracked.running = false;
        inner.emit(now, Some(id), EventKind::InstanceKilled);
        tracing::info!(game = %id, "game killed");
        Ok(())
    }

    /// Transfer the accumulated creation fees to the owner. Returns the
    /// amount transferred.
    pub fn reclaim_fees(&self, caller: PlayerId) -> Result<Amount> {
        let mut inner = self.lock();
        let now = self.clock.now();
        inner.ensure_owner(caller)?;

        let amount = inner.fee_balance;
        inner.fee_balance = 0;
        if let Err(e) = self.settlement.payout(caller, amount) {
            inner.fee_balance = amount;
            return Err(HubError::TransferFailed(e.to_string()));
        }
        inner.emit(now, None, EventKind::FeesReclaimed { amount });
        tracing::info!(amount, "fees reclaimed");
        Ok(amount)
    }

    /// Pause game creation. Running games are unaffected.
    pub fn pause(&self, caller: PlayerId) -> Result<()> {
        self.set_paused(caller, true)
    }

    /// Resume game creation.
    pub fn unpause(&self, caller: PlayerId) -> Result<()> {
        self.set_paused(caller, false)
    }

    fn set_paused(&self, caller: PlayerId, paused: bool) -> Result<()> {
        let mut inner = self.lock();
        let now = self.clock.now();
        inner.ensure_owner(caller)?;
        inner.paused = paused;
        inner.emit(now, None, EventKind::PausedChanged { paused });
        tracing::info!(paused, "creation pause changed");
        Ok(())
    }

    /// Hand the hub over to a new owner.
    pub fn set_owner(&self, caller: PlayerId, new_owner: PlayerId) -> Result<()> {
        let mut inner = self.lock();
        let now = self.clock.now();
        inner.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(HubError::ZeroAddressPlayer);
        }
        let previous = inner.owner;
        inner.owner = new_owner;
        inner.emit(
            now,
            None,
            EventKind::OwnerChanged {
                previous,
                new: new_owner,
            },
        );
        tracing::info!(previous = %previous, new = %new_owner, "owner changed");
        Ok(())
    }

    // ---- Read surface ----

    pub fn owner(&self) -> PlayerId {
        self.lock().owner
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn required_fee(&self) -> Amount {
        self.fee
    }

    pub fn fee_balance(&self) -> Amount {
        self.lock().fee_balance
    }

    /// Snapshot of a tracked game, if known
    pub fn game(&self, id: GameId) -> Option<GameView> {
        let inner = self.lock();
        inner.games.get(&id).map(|t| GameView {
            snapshot: t.instance.snapshot(),
            running: t.running,
            created_at: t.created_at,
        })
    }

    /// All tracked games, including killed and finished ones
    pub fn list_games(&self) -> Vec<GameView> {
        let inner = self.lock();
        let mut views: Vec<GameView> = inner
            .games
            .values()
            .map(|t| GameView {
                snapshot: t.instance.snapshot(),
                running: t.running,
                created_at: t.created_at,
            })
            .collect();
        views.sort_by_key(|v| v.created_at);
        views
    }

    /// Events from sequence number `seq` onward. The log is append-only,
    /// so consumers can poll with their last-seen sequence plus one.
    pub fn events_since(&self, seq: u64) -> Vec<EventRecord> {
        let inner = self.lock();
        inner
            .events
            .iter()
            .skip(seq as usize)
            .cloned()
            .collect()
    }

    /// All events concerning one game
    pub fn events_for_game(&self, id: GameId) -> Vec<EventRecord> {
        let inner = self.lock();
        inner
            .events
            .iter()
            .filter(|e| e.game == Some(id))
            .cloned()
            .collect()
    }
}
