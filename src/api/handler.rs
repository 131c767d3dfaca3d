use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::server::{AppState, JsonResult, RouteError};
use crate::constants::{DEFAULT_TOP_LIMIT, MAX_TOP_LIMIT};
use crate::db::models::parse_instant;
use crate::db::prelude::*;

/// `{ success, message?, data? }` wrapper used by the leaderboard routes
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_owned()),
            data: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopQuery {
    pub time_frame: TimeFrame,
    pub date: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub username: String,
    pub score: i64,
    pub datetime: String,
}

fn instant(field: &str, raw: &str) -> Result<DateTime<Utc>, RouteError> {
    parse_instant(raw).ok_or_else(|| {
        RouteError::MalformedRequest(format!(
            "invalid {field} '{raw}', expected an RFC 3339 timestamp or YYYY-MM-DD"
        ))
    })
}

#[instrument(skip(state))]
pub async fn score_snapshot(State(state): State<Arc<AppState>>) -> JsonResult<Snapshot> {
    let snapshot = state.leaderboard.snapshot(state.now()).await?;
    Ok(Json(snapshot))
}

#[instrument(skip(state, body))]
pub async fn submit_score(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> JsonResult<Envelope<()>> {
    let Json(body) = body?;
    state
        .leaderboard
        .save(&body.username, body.score, state.now())
        .await?;

    Ok(Json(Envelope::ok()))
}

#[instrument(skip(state, body))]
pub async fn save_result(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> JsonResult<Envelope<()>> {
    let Json(body) = body?;
    state
        .leaderboard
        .save(&body.username, body.score, state.now())
        .await?;

    Ok(Json(Envelope::message("Result saved")))
}

#[instrument(skip(state, query))]
pub async fn top_results(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TopQuery>, QueryRejection>,
) -> JsonResult<Envelope<Vec<LeaderboardEntry>>> {
    let Query(query) = query?;

    let at = match query.date.as_deref() {
        Some(raw) => instant("date", raw)?,
        None => state.now(),
    };

    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    if !(1..=MAX_TOP_LIMIT).contains(&limit) {
        return Err(RouteError::MalformedRequest(format!(
            "invalid limit {limit}, expected 1..={MAX_TOP_LIMIT}"
        )));
    }

    let records = state.leaderboard.top(query.time_frame, at, limit).await?;
    let entries = records.into_iter().map(LeaderboardEntry::from).collect();

    Ok(Json(Envelope::data(entries)))
}

#[instrument(skip(state, query))]
pub async fn score_position(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PositionQuery>, QueryRejection>,
) -> JsonResult<Envelope<Positions>> {
    let Query(query) = query?;
    let at = instant("datetime", &query.datetime)?;

    tracing::debug!(username = %query.username, score = query.score, "position lookup");
    let positions = state.leaderboard.rank(query.score, at).await?;

    Ok(Json(Envelope::data(positions)))
}
