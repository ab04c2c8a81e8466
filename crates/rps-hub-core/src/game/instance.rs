//! Single-round game instance state machine.
//!
//! Each slot independently transitions Empty -> Committed -> Revealed; the
//! game finishes exactly once, through a winner claim, the second draw
//! claim, or a timeout claim. Slot assignment is by caller identity, never
//! by arrival order.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::moves::{judge, Move, Outcome};
use crate::crypto::{MoveCommitment, Secret};
use crate::error::{HubError, Result};
use crate::hub::GameParams;
use crate::ledger::Settlement;
use crate::types::{Amount, GameId, PlayerId};

/// Per-player slot state
#[derive(Clone, Debug)]
struct PlayerSlot {
    player: PlayerId,
    commitment: Option<MoveCommitment>,
    revealed: Option<Move>,
    draw_claimed: bool,
    last_action_at: Option<DateTime<Utc>>,
}

impl PlayerSlot {
    fn new(player: PlayerId) -> Self {
        Self {
            player,
            commitment: None,
            revealed: None,
            draw_claimed: false,
            last_action_at: None,
        }
    }
}

/// State machine for a single RPS round between two fixed players.
///
/// The escrow balance always equals the sum of stakes paid in by slots
/// that have played and not yet been paid out. Once finished, no
/// balance-changing operation succeeds.
pub struct GameInstance {
    id: GameId,
    slots: [PlayerSlot; 2],
    stake: Amount,
    escrow: Amount,
    finished: bool,
    timeout: Duration,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Serializable read-only view of an instance, for the UI layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: GameId,
    pub players: [PlayerId; 2],
    pub stake: Amount,
    pub escrow: Amount,
    pub finished: bool,
    pub committed: [bool; 2],
    pub revealed: [Option<Move>; 2],
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl GameInstance {
    /// Create a new instance from validated parameters.
    ///
    /// Topology is immutable from here on: players, stake and timeout
    /// never change.
    pub fn new(id: GameId, params: &GameParams, timeout: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id,
            slots: [
                PlayerSlot::new(params.player_a()),
                PlayerSlot::new(params.player_b()),
            ],
            stake: params.stake(),
            escrow: 0,
            finished: false,
            timeout,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn escrow(&self) -> Amount {
        self.escrow
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn players(&self) -> [PlayerId; 2] {
        [self.slots[0].player, self.slots[1].player]
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id,
            players: self.players(),
            stake: self.stake,
            escrow: self.escrow,
            finished: self.finished,
            committed: [
                self.slots[0].commitment.is_some(),
                self.slots[1].commitment.is_some(),
            ],
            revealed: [self.slots[0].revealed, self.slots[1].revealed],
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }

    fn slot_index(&self, caller: PlayerId) -> Option<usize> {
        self.slots.iter().position(|s| s.player == caller)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            Err(HubError::GameAlreadyFinished)
        } else {
            Ok(())
        }
    }

    /// Store the caller's commitment and escrow their stake.
    pub fn play(
        &mut self,
        caller: PlayerId,
        commitment: MoveCommitment,
        stake_sent: Amount,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active()?;
        let idx = self
            .slot_index(caller)
            .ok_or(HubError::UnauthorizedCaller(caller))?;
        if self.slots[idx].commitment.is_some() {
            return Err(HubError::AlreadyPlayed);
        }
        if stake_sent != self.stake {
            return Err(HubError::WrongStake {
                sent: stake_sent,
                expected: self.stake,
            });
        }

        self.slots[idx].commitment = Some(commitment);
        self.slots[idx].last_action_at = Some(now);
        self.escrow += stake_sent;
        self.last_activity = now;
        Ok(())
    }

    /// Verify the caller's reveal against their stored commitment and
    /// record the decoded move.
    ///
    /// A reveal is rejected while the opponent has no commitment, so a
    /// revealed move can never inform the opponent's decision to commit.
    pub fn reveal(
        &mut self,
        caller: PlayerId,
        secret: &Secret,
        mv: Move,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active()?;
        let idx = self.slot_index(caller).ok_or(HubError::NotAPlayer(caller))?;
        let commitment = self.slots[idx]
            .commitment
            .ok_or(HubError::HasNotPlayed)?;
        if self.slots[(idx + 1) % 2].commitment.is_none() {
            return Err(HubError::OpponentHasNotPlayed);
        }
        if self.slots[idx].revealed.is_some() {
            return Err(HubError::AlreadyRevealed);
        }
        if !commitment.verify(caller, secret, mv) {
            return Err(HubError::RevealMismatch);
        }

        self.slots[idx].revealed = Some(mv);
        self.slots[idx].last_action_at = Some(now);
        self.last_activity = now;
        Ok(())
    }

    /// Pay the full escrow to the caller if their revealed move beats the
    /// opponent's. Returns the amount paid out.
    pub fn claim_winner(
        &mut self,
        caller: PlayerId,
        now: DateTime<Utc>,
        settlement: &dyn Settlement,
    ) -> Result<Amount> {
        self.ensure_active()?;
        let idx = self.slot_index(caller).ok_or(HubError::NotAPlayer(caller))?;
        let (mine, theirs) = match (self.slots[idx].revealed, self.slots[(idx + 1) % 2].revealed) {
            (Some(mine), Some(theirs)) => (mine, theirs),
            _ => return Err(HubError::MovesNotRevealed),
        };
        if judge(mine, theirs) != Outcome::FirstWins {
            return Err(HubError::NotWinner);
        }

        let amount = self.escrow;
        self.pay_and_finish(caller, amount, now, settlement)?;
        Ok(amount)
    }

    /// Pay the caller's own stake back on a draw. Each player may claim
    /// exactly once; the game finishes on the second claim. Returns the
    /// amount paid and whether the game is now finished.
    pub fn claim_draw(
        &mut self,
        caller: PlayerId,
        now: DateTime<Utc>,
        settlement: &dyn Settlement,
    ) -> Result<(Amount, bool)> {
        self.ensure_active()?;
        let idx = self.slot_index(caller).ok_or(HubError::NotAPlayer(caller))?;
        let (mine, theirs) = match (self.slots[idx].revealed, self.slots[(idx + 1) % 2].revealed) {
            (Some(mine), Some(theirs)) => (mine, theirs),
            _ => return Err(HubError::MovesNotRevealed),
        };
        if mine != theirs {
            return Err(HubError::NotADraw);
        }
        if self.slots[idx].draw_claimed {
            return Err(HubError::AlreadyClaimed);
        }

        let amount = self.stake;
        let finishes = self.slots[(idx + 1) % 2].draw_claimed;

        // State first, transfer last; roll everything back on failure.
        self.slots[idx].draw_claimed = true;
        self.escrow -= amount;
        self.finished = finishes;
        let prev_activity = self.last_activity;
        self.last_activity = now;

        if let Err(e) = settlement.payout(caller, amount) {
            self.slots[idx].draw_claimed = false;
            self.escrow += amount;
            self.finished = false;
            self.last_activity = prev_activity;
            return Err(HubError::TransferFailed(e.to_string()));
        }
        Ok((amount, finishes))
    }

    /// Unilateral fund recovery after the inactivity window.
    ///
    /// Available to a player whose counterparty is in default: either the
    /// opponent never played, or both played and only the caller revealed.
    /// Pays the entire remaining escrow, so stake conservation holds on
    /// this path too. Returns the amount paid out.
    pub fn claim_timeout(
        &mut self,
        caller: PlayerId,
        now: DateTime<Utc>,
        settlement: &dyn Settlement,
    ) -> Result<Amount> {
        self.ensure_active()?;
        let idx = self.slot_index(caller).ok_or(HubError::NotAPlayer(caller))?;
        let mine = &self.slots[idx];
        let theirs = &self.slots[(idx + 1) % 2];
        if mine.commitment.is_none() {
            return Err(HubError::HasNotPlayed);
        }
        if theirs.commitment.is_some() && (mine.revealed.is_none() || theirs.revealed.is_some()) {
            return Err(HubError::OpponentNotInDefault);
        }
        if now - self.last_activity < self.timeout {
            return Err(HubError::TimeoutNotElapsed);
        }

        let amount = self.escrow;
        self.pay_and_finish(caller, amount, now, settlement)?;
        Ok(amount)
    }

    /// Finish the game and pay out the given amount, with the transfer as
    /// the last effect. A failed transfer rolls the state change back.
    fn pay_and_finish(
        &mut self,
        to: PlayerId,
        amount: Amount,
        now: DateTime<Utc>,
        settlement: &dyn Settlement,
    ) -> Result<()> {
        let prev_escrow = self.escrow;
        let prev_activity = self.last_activity;
        self.finished = true;
        self.escrow = 0;
        self.last_activity = now;

        if let Err(e) = settlement.payout(to, amount) {
            self.finished = false;
            self.escrow = prev_escrow;
            self.last_activity = prev_activity;
            return Err(HubError::TransferFailed(e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockSettlement;
    use chrono::Utc;

    const STAKE: Amount = 100;

    fn player(byte: u8) -> PlayerId {
        PlayerId::from_bytes([byte; 20])
    }

    fn new_game(stake: Amount) -> GameInstance {
        let params = GameParams::new(player(1), player(2), stake).unwrap();
        GameInstance::new(GameId::new(), &params, Duration::hours(1), Utc::now())
    }

    fn commit(p: PlayerId, mv: Move) -> (MoveCommitment, Secret) {
        let secret = Secret::new("12345678");
        (MoveCommitment::new(p, &secret, mv), secret)
    }

    /// Play and reveal both moves, leaving the game ready for claims
    fn play_out(game: &mut GameInstance, move_a: Move, move_b: Move) {
        let now = Utc::now();
        let (commit_a, secret_a) = commit(player(1), move_a);
        let (commit_b, secret_b) = commit(player(2), move_b);
        game.play(player(1), commit_a, game.stake(), now).unwrap();
        game.play(player(2), commit_b, game.stake(), now).unwrap();
        game.reveal(player(1), &secret_a, move_a, now).unwrap();
        game.reveal(player(2), &secret_b, move_b, now).unwrap();
    }

    #[test]
    fn test_play_either_order() {
        for order in [[1u8, 2u8], [2u8, 1u8]] {
            let mut game = new_game(STAKE);
            let now = Utc::now();
            for byte in order {
                let (c, _) = commit(player(byte), Move::Rock);
                game.play(player(byte), c, STAKE, now).unwrap();
            }
            assert_eq!(game.escrow(), 2 * STAKE);
            assert_eq!(game.snapshot().committed, [true, true]);
        }
    }

    #[test]
    fn test_play_unknown_caller_rejected() {
        let mut game = new_game(STAKE);
        let (c, _) = commit(player(3), Move::Rock);
        assert_eq!(
            game.play(player(3), c, STAKE, Utc::now()),
            Err(HubError::UnauthorizedCaller(player(3)))
        );
    }

    #[test]
    fn test_play_twice_rejected() {
        let mut game = new_game(STAKE);
        let now = Utc::now();
        let (c, _) = commit(player(1), Move::Rock);
        game.play(player(1), c, STAKE, now).unwrap();
        assert_eq!(
            game.play(player(1), c, STAKE, now),
            Err(HubError::AlreadyPlayed)
        );
    }

    #[test]
    fn test_play_wrong_stake_rejected() {
        let mut game = new_game(STAKE);
        let (c, _) = commit(player(1), Move::Rock);
        assert_eq!(
            game.play(player(1), c, 99, Utc::now()),
            Err(HubError::WrongStake {
                sent: 99,
                expected: STAKE
            })
        );
        assert_eq!(game.escrow(), 0);
    }

    #[test]
    fn test_reveal_before_playing_rejected() {
        let mut game = new_game(STAKE);
        let secret = Secret::new("pwd");
        assert_eq!(
            game.reveal(player(1), &secret, Move::Rock, Utc::now()),
            Err(HubError::HasNotPlayed)
        );
    }

    #[test]
    fn test_reveal_before_opponent_played_rejected() {
        let mut game = new_game(STAKE);
        let now = Utc::now();
        let (c, secret) = commit(player(1), Move::Rock);
        game.play(player(1), c, STAKE, now).unwrap();
        assert_eq!(
            game.reveal(player(1), &secret, Move::Rock, now),
            Err(HubError::OpponentHasNotPlayed)
        );
    }

    #[test]
    fn test_reveal_wrong_move_rejected() {
        let mut game = new_game(STAKE);
        let now = Utc::now();
        let (commit_a, secret_a) = commit(player(1), Move::Rock);
        let (commit_b, _) = commit(player(2), Move::Paper);
        game.play(player(1), commit_a, STAKE, now).unwrap();
        game.play(player(2), commit_b, STAKE, now).unwrap();

        // Committed to Rock, claims Paper with the same secret
        assert_eq!(
            game.reveal(player(1), &secret_a, Move::Paper, now),
            Err(HubError::RevealMismatch)
        );
        assert_eq!(game.snapshot().revealed, [None, None]);
    }

    #[test]
    fn test_double_reveal_rejected() {
        let mut game = new_game(STAKE);
        let now = Utc::now();
        let (commit_a, secret_a) = commit(player(1), Move::Rock);
        let (commit_b, _) = commit(player(2), Move::Paper);
        game.play(player(1), commit_a, STAKE, now).unwrap();
        game.play(player(2), commit_b, STAKE, now).unwrap();
        game.reveal(player(1), &secret_a, Move::Rock, now).unwrap();
        assert_eq!(
            game.reveal(player(1), &secret_a, Move::Rock, now),
            Err(HubError::AlreadyRevealed)
        );
    }

    #[test]
    fn test_winner_claims_double_stake() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Scissors, Move::Paper);

        let paid = game
            .claim_winner(player(1), Utc::now(), &settlement)
            .unwrap();
        assert_eq!(paid, 200);
        assert_eq!(settlement.credited(player(1)), 200);
        assert!(game.is_finished());
        assert_eq!(game.escrow(), 0);
    }

    #[test]
    fn test_loser_cannot_claim() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Scissors, Move::Paper);

        assert_eq!(
            game.claim_winner(player(2), Utc::now(), &settlement),
            Err(HubError::NotWinner)
        );
    }

    #[test]
    fn test_claim_winner_on_draw_rejected() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Rock, Move::Rock);

        assert_eq!(
            game.claim_winner(player(1), Utc::now(), &settlement),
            Err(HubError::NotWinner)
        );
    }

    #[test]
    fn test_claim_winner_before_reveals_rejected() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        let now = Utc::now();
        let (commit_a, _) = commit(player(1), Move::Rock);
        game.play(player(1), commit_a, STAKE, now).unwrap();
        assert_eq!(
            game.claim_winner(player(1), now, &settlement),
            Err(HubError::MovesNotRevealed)
        );
    }

    #[test]
    fn test_draw_pays_each_player_once() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Rock, Move::Rock);
        let now = Utc::now();

        let (paid, finished) = game.claim_draw(player(1), now, &settlement).unwrap();
        assert_eq!(paid, STAKE);
        assert!(!finished);
        assert!(!game.is_finished());

        assert_eq!(
            game.claim_draw(player(1), now, &settlement),
            Err(HubError::AlreadyClaimed)
        );

        let (paid, finished) = game.claim_draw(player(2), now, &settlement).unwrap();
        assert_eq!(paid, STAKE);
        assert!(finished);
        assert!(game.is_finished());
        assert_eq!(settlement.total_credited(), 2 * STAKE);
        assert_eq!(game.escrow(), 0);
    }

    #[test]
    fn test_claim_draw_on_decisive_game_rejected() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Scissors, Move::Paper);

        assert_eq!(
            game.claim_draw(player(1), Utc::now(), &settlement),
            Err(HubError::NotADraw)
        );
    }

    #[test]
    fn test_zero_stake_game() {
        let settlement = MockSettlement::new();
        let mut game = new_game(0);
        play_out(&mut game, Move::Paper, Move::Rock);

        let paid = game
            .claim_winner(player(1), Utc::now(), &settlement)
            .unwrap();
        assert_eq!(paid, 0);
        assert!(game.is_finished());
    }

    #[test]
    fn test_finished_game_rejects_everything() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Scissors, Move::Paper);
        game.claim_winner(player(1), Utc::now(), &settlement)
            .unwrap();

        let (c, secret) = commit(player(2), Move::Rock);
        let now = Utc::now();
        assert_eq!(
            game.play(player(2), c, STAKE, now),
            Err(HubError::GameAlreadyFinished)
        );
        assert_eq!(
            game.reveal(player(2), &secret, Move::Rock, now),
            Err(HubError::GameAlreadyFinished)
        );
        assert_eq!(
            game.claim_winner(player(1), now, &settlement),
            Err(HubError::GameAlreadyFinished)
        );
        assert_eq!(
            game.claim_draw(player(1), now, &settlement),
            Err(HubError::GameAlreadyFinished)
        );
        assert_eq!(
            game.claim_timeout(player(1), now, &settlement),
            Err(HubError::GameAlreadyFinished)
        );
    }

    #[test]
    fn test_transfer_failure_rolls_back_winner_claim() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Scissors, Move::Paper);

        settlement.set_failing(true);
        let result = game.claim_winner(player(1), Utc::now(), &settlement);
        assert!(matches!(result, Err(HubError::TransferFailed(_))));
        assert!(!game.is_finished());
        assert_eq!(game.escrow(), 2 * STAKE);

        // A later valid claim still succeeds
        settlement.set_failing(false);
        let paid = game
            .claim_winner(player(1), Utc::now(), &settlement)
            .unwrap();
        assert_eq!(paid, 2 * STAKE);
    }

    #[test]
    fn test_transfer_failure_rolls_back_draw_claim() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        play_out(&mut game, Move::Rock, Move::Rock);

        settlement.set_failing(true);
        let result = game.claim_draw(player(1), Utc::now(), &settlement);
        assert!(matches!(result, Err(HubError::TransferFailed(_))));
        assert_eq!(game.escrow(), 2 * STAKE);

        settlement.set_failing(false);
        game.claim_draw(player(1), Utc::now(), &settlement).unwrap();
        game.claim_draw(player(2), Utc::now(), &settlement).unwrap();
        assert_eq!(settlement.total_credited(), 2 * STAKE);
    }

    #[test]
    fn test_timeout_claim_when_opponent_never_played() {
        let settlement = MockSettlement::new();
        let start = Utc::now();
        let params = GameParams::new(player(1), player(2), STAKE).unwrap();
        let mut game = GameInstance::new(GameId::new(), &params, Duration::hours(1), start);

        let (c, _) = commit(player(1), Move::Rock);
        game.play(player(1), c, STAKE, start).unwrap();

        // Window not elapsed yet
        assert_eq!(
            game.claim_timeout(player(1), start + Duration::minutes(30), &settlement),
            Err(HubError::TimeoutNotElapsed)
        );

        let paid = game
            .claim_timeout(player(1), start + Duration::hours(2), &settlement)
            .unwrap();
        assert_eq!(paid, STAKE);
        assert!(game.is_finished());
    }

    #[test]
    fn test_timeout_claim_when_opponent_never_revealed() {
        let settlement = MockSettlement::new();
        let start = Utc::now();
        let params = GameParams::new(player(1), player(2), STAKE).unwrap();
        let mut game = GameInstance::new(GameId::new(), &params, Duration::hours(1), start);

        let (commit_a, secret_a) = commit(player(1), Move::Rock);
        let (commit_b, _) = commit(player(2), Move::Paper);
        game.play(player(1), commit_a, STAKE, start).unwrap();
        game.play(player(2), commit_b, STAKE, start).unwrap();
        game.reveal(player(1), &secret_a, Move::Rock, start).unwrap();

        // The revealed party takes the full escrow once the window elapses
        let paid = game
            .claim_timeout(player(1), start + Duration::hours(2), &settlement)
            .unwrap();
        assert_eq!(paid, 2 * STAKE);
        assert_eq!(settlement.credited(player(1)), 2 * STAKE);
    }

    #[test]
    fn test_timeout_claim_requires_own_reveal_when_both_played() {
        let settlement = MockSettlement::new();
        let start = Utc::now();
        let params = GameParams::new(player(1), player(2), STAKE).unwrap();
        let mut game = GameInstance::new(GameId::new(), &params, Duration::hours(1), start);

        let (commit_a, _) = commit(player(1), Move::Rock);
        let (commit_b, _) = commit(player(2), Move::Paper);
        game.play(player(1), commit_a, STAKE, start).unwrap();
        game.play(player(2), commit_b, STAKE, start).unwrap();

        assert_eq!(
            game.claim_timeout(player(1), start + Duration::hours(2), &settlement),
            Err(HubError::OpponentNotInDefault)
        );
    }

    #[test]
    fn test_timeout_claim_without_playing_rejected() {
        let settlement = MockSettlement::new();
        let mut game = new_game(STAKE);
        assert_eq!(
            game.claim_timeout(player(1), Utc::now() + Duration::days(1), &settlement),
            Err(HubError::HasNotPlayed)
        );
    }

    #[test]
    fn test_reveal_resets_inactivity_window() {
        let settlement = MockSettlement::new();
        let start = Utc::now();
        let params = GameParams::new(player(1), player(2), STAKE).unwrap();
        let mut game = GameInstance::new(GameId::new(), &params, Duration::hours(1), start);

        let (commit_a, secret_a) = commit(player(1), Move::Rock);
        let (commit_b, _) = commit(player(2), Move::Paper);
        game.play(player(1), commit_a, STAKE, start).unwrap();
        game.play(player(2), commit_b, STAKE, start).unwrap();

        // Reveal 50 minutes in: the window restarts from the reveal
        let reveal_at = start + Duration::minutes(50);
        game.reveal(player(1), &secret_a, Move::Rock, reveal_at)
            .unwrap();
        assert_eq!(
            game.claim_timeout(player(1), start + Duration::minutes(80), &settlement),
            Err(HubError::TimeoutNotElapsed)
        );
        assert!(game
            .claim_timeout(player(1), reveal_at + Duration::hours(1), &settlement)
            .is_ok());
    }
}
