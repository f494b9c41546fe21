use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Query, State as AxumState},
    http::HeaderMap,
};
use bank::SimilarityEntry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    state::State,
    stats::GuessStats,
    utils::session_id,
    verify::GuessOutcome,
};

#[derive(Deserialize)]
pub struct GuessRequest {
    guess: Option<String>,
}

#[derive(Serialize)]
pub struct GuessResponse {
    #[serde(flatten)]
    outcome: GuessOutcome,
    attempts: u32,
}

pub async fn guess_handler(
    AxumState(state): AxumState<Arc<State>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GuessResponse>, AppError> {
    let client = peer.ip().to_string();
    let session = session_id(&headers, peer);

    if !state.limiter.allow(&client) {
        return Err(AppError::RateLimited {
            retry_after: state.limiter.retry_after(&client),
        });
    }

    let request: GuessRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::MalformedPayload)?;
    let guess = request.guess.ok_or(AppError::MissingGuess)?;

    let (date, outcome) = state.verifier.verify_on(&guess).await?;
    let attempts = state.guesses.record(date, &client, &session, outcome.is_correct);

    Ok(Json(GuessResponse { outcome, attempts }))
}

#[derive(Deserialize)]
pub struct TopQuery {
    limit: Option<usize>,
    proof: Option<String>,
}

pub async fn top_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<SimilarityEntry>>, AppError> {
    let limit = query.limit.unwrap_or(state.config.top_cap);
    let top = state.verifier.top(limit, query.proof.as_deref()).await?;

    Ok(Json(top))
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    date: Option<NaiveDate>,
}

pub async fn health_handler(AxumState(state): AxumState<Arc<State>>) -> Json<Health> {
    let phase = state.verifier.cache().phase();

    Json(Health {
        status: phase.status(),
        date: phase.date(),
    })
}

pub async fn stats_handler(AxumState(state): AxumState<Arc<State>>) -> Json<GuessStats> {
    Json(state.guesses.stats())
}
