//! HTTP API handlers.
//!
//! Thin glue only: each handler parses the request, forwards to the hub,
//! and renders the result. The caller identity comes from the
//! `X-Player-Id` header; in a real deployment the execution environment
//! supplies it unforgeably.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use rps_hub_core::{
    GameHub, GameId, HubError, ManualClock, MockSettlement, Move, MoveCommitment, PlayerId, Secret,
};

/// Shared service state
#[derive(Clone)]
pub struct AppState {
    pub hub: GameHub,
    /// Settlement backend; the service keeps balances in memory
    pub settlement: Arc<MockSettlement>,
    /// Set when the service runs with a simulated clock
    pub manual_clock: Option<Arc<ManualClock>>,
}

// ============ Request/Response types ============

#[derive(Deserialize)]
pub struct CreateGameRequest {
    pub player_a: PlayerId,
    pub player_b: PlayerId,
    pub stake: u64,
    pub fee_paid: u64,
}

#[derive(Deserialize)]
pub struct PlayRequest {
    /// Hex-encoded 32-byte commitment
    pub commitment: String,
    pub stake: u64,
}

#[derive(Deserialize)]
pub struct RevealRequest {
    pub secret: String,
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Deserialize)]
pub struct CommitmentRequest {
    pub player: PlayerId,
    pub secret: String,
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Deserialize)]
pub struct SetOwnerRequest {
    pub new_owner: PlayerId,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

#[derive(Deserialize)]
pub struct TickRequest {
    pub seconds: i64,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub amount: u64,
}

// ============ Helpers ============

fn caller_from_header(headers: &axum::http::HeaderMap) -> Option<PlayerId> {
    headers
        .get("X-Player-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

fn missing_caller() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Missing or invalid X-Player-Id header"})),
    )
}

fn error_response(e: HubError) -> (StatusCode, Json<serde_json::Value>) {
    use HubError::*;
    let status = match &e {
        UnauthorizedCaller(_) | NotAPlayer(_) | Unauthorized(_) => StatusCode::FORBIDDEN,
        PlayersIdentical | ZeroAddressPlayer | WrongStake { .. } | InsufficientFee { .. }
        | InvalidMove(_) => StatusCode::BAD_REQUEST,
        UnknownGame(_) => StatusCode::NOT_FOUND,
        TransferFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::CONFLICT,
    };
    (
        status,
        Json(serde_json::json!({
            "error_kind": error_kind(&e),
            "error": e.to_string(),
        })),
    )
}

/// Machine-readable error kind for UI dispatch
fn error_kind(e: &HubError) -> &'static str {
    use HubError::*;
    match e {
        UnauthorizedCaller(_) => "unauthorized_caller",
        NotAPlayer(_) => "not_a_player",
        Unauthorized(_) => "unauthorized",
        PlayersIdentical => "players_identical",
        ZeroAddressPlayer => "zero_address_player",
        WrongStake { .. } => "wrong_stake",
        InsufficientFee { .. } => "insufficient_fee",
        InvalidMove(_) => "invalid_move",
        AlreadyPlayed => "already_played",
        HasNotPlayed => "has_not_played",
        AlreadyRevealed => "already_revealed",
        AlreadyClaimed => "already_claimed",
        OpponentHasNotPlayed => "opponent_has_not_played",
        MovesNotRevealed => "moves_not_revealed",
        GameAlreadyFinished => "game_already_finished",
        HubPaused => "hub_paused",
        TimeoutNotElapsed => "timeout_not_elapsed",
        OpponentNotInDefault => "opponent_not_in_default",
        UnknownGame(_) => "unknown_game",
        RevealMismatch => "reveal_mismatch",
        NotWinner => "not_winner",
        NotADraw => "not_a_draw",
        TransferFailed(_) => "transfer_failed",
    }
}

// ============ Game handlers ============

pub async fn create_game(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CreateGameRequest>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };

    match state
        .hub
        .create_game_raw(caller, req.player_a, req.player_b, req.stake, req.fee_paid)
    {
        Ok(id) => (
            StatusCode::OK,
            Json(serde_json::json!({"game_id": id})),
        ),
        Err(e) => error_response(e),
    }
}

pub async fn list_games(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"games": state.hub.list_games()}))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> impl IntoResponse {
    match state.hub.game(id) {
        Some(view) => (StatusCode::OK, Json(serde_json::json!(view))),
        None => error_response(HubError::UnknownGame(id)),
    }
}

pub async fn play(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<GameId>,
    Json(req): Json<PlayRequest>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    let commitment: MoveCommitment = match req.commitment.parse() {
        Ok(c) => c,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "commitment must be 32 hex-encoded bytes"})),
            );
        }
    };

    match state.hub.play(id, caller, commitment, req.stake) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "played"}))),
        Err(e) => error_response(e),
    }
}

pub async fn reveal(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<GameId>,
    Json(req): Json<RevealRequest>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    let mv: Move = match req.mv.parse() {
        Ok(mv) => mv,
        Err(e) => return error_response(e),
    };
    let secret = Secret::new(req.secret.into_bytes());

    match state.hub.reveal(id, caller, &secret, mv) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "revealed"})),
        ),
        Err(e) => error_response(e),
    }
}

pub async fn claim_winner(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<GameId>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.claim_winner(id, caller) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!(ClaimResponse { amount })),
        ),
        Err(e) => error_response(e),
    }
}

pub async fn claim_draw(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<GameId>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.claim_draw(id, caller) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!(ClaimResponse { amount })),
        ),
        Err(e) => error_response(e),
    }
}

pub async fn claim_timeout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<GameId>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.claim_timeout(id, caller) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!(ClaimResponse { amount })),
        ),
        Err(e) => error_response(e),
    }
}

// ============ Off-ledger helper ============

/// Compute a move commitment for the caller, the way the UI would before
/// submitting `play`.
pub async fn make_commitment(Json(req): Json<CommitmentRequest>) -> impl IntoResponse {
    let mv: Move = match req.mv.parse() {
        Ok(mv) => mv,
        Err(e) => return error_response(e),
    };
    let secret = Secret::new(req.secret.into_bytes());
    let commitment = MoveCommitment::new(req.player, &secret, mv);
    (
        StatusCode::OK,
        Json(serde_json::json!({"commitment": commitment.to_string()})),
    )
}

// ============ Event handlers ============

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    Json(serde_json::json!({"events": state.hub.events_since(query.since)}))
}

pub async fn game_events(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> impl IntoResponse {
    Json(serde_json::json!({"events": state.hub.events_for_game(id)}))
}

// ============ Owner handlers ============

pub async fn kill_game(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<GameId>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.kill_game(caller, id) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "killed"}))),
        Err(e) => error_response(e),
    }
}

pub async fn pause(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.pause(caller) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"paused": true}))),
        Err(e) => error_response(e),
    }
}

pub async fn unpause(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.unpause(caller) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"paused": false}))),
        Err(e) => error_response(e),
    }
}

pub async fn reclaim_fees(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.reclaim_fees(caller) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!(ClaimResponse { amount })),
        ),
        Err(e) => error_response(e),
    }
}

pub async fn set_owner(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<SetOwnerRequest>,
) -> impl IntoResponse {
    let caller = match caller_from_header(&headers) {
        Some(caller) => caller,
        None => return missing_caller(),
    };
    match state.hub.set_owner(caller, req.new_owner) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"owner": req.new_owner})),
        ),
        Err(e) => error_response(e),
    }
}

// ============ System handlers ============

pub async fn balance(
    State(state): State<AppState>,
    Path(player): Path<PlayerId>,
) -> impl IntoResponse {
    Json(serde_json::json!({"credited": state.settlement.credited(player)}))
}

/// Advance the simulated clock (only available with SIMULATED_CLOCK=1)
pub async fn tick(
    State(state): State<AppState>,
    Json(req): Json<TickRequest>,
) -> impl IntoResponse {
    match &state.manual_clock {
        Some(clock) => {
            clock.advance(chrono::Duration::seconds(req.seconds));
            (
                StatusCode::OK,
                Json(serde_json::json!({"advanced_secs": req.seconds})),
            )
        }
        None => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "service is running on the system clock"})),
        ),
    }
}
