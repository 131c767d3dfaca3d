use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::db::prelude::StoreError;
use crate::leaderboard::{Leaderboard, LeaderboardError, ValidationError};

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub leaderboard: Leaderboard,
    /// Source of "now" for stamping submissions and defaulting query dates
    pub clock: fn() -> DateTime<Utc>,
}

impl AppState {
    pub fn new(leaderboard: Leaderboard) -> Self {
        Self {
            leaderboard,
            clock: Utc::now,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        //
        // snapshot + plain append
        .route("/scores", get(score_snapshot).post(submit_score))
        //
        // leaderboard
        .route("/leaderboard/save", post(save_result))
        .route("/leaderboard/top", get(top_results))
        .route("/leaderboard/position", get(score_position))
        //
        // general
        .route("/checkhealth", get(|| async { "SERVER_OK" }))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors)
        .with_state(state)
}

/// Logs any `RouteError` a handler attached to its response.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

/// Binds the API port and spawns the server plus a task that reports readiness.
#[instrument(skip(state, cors))]
pub async fn start_server(
    state: Arc<AppState>,
    cors: CorsLayer,
    port: u16,
) -> Result<Vec<JoinHandle<()>>, RouteError> {
    tracing::info!("starting server");

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;
    let bound = listener.local_addr()?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SocketAddr>();
    let app = router(state, cors);

    let server_handle = tokio::task::spawn(async move {
        _ = tx.send(bound);
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = ?e, "server exited with error");
        }
    });

    let logging_handle = tokio::task::spawn(async move {
        if let Some(addr) = rx.recv().await {
            tracing::info!(
                server_url = &format!("http://127.0.0.1:{}", addr.port()),
                "server ready"
            );
        }
    });

    Ok(vec![server_handle, logging_handle])
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    MalformedRequest(String),

    #[error(transparent)]
    QueryRejection(#[from] QueryRejection),

    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    #[error("failed to bind api socket: {0}")]
    Bind(#[from] std::io::Error),
}

impl From<LeaderboardError> for RouteError {
    fn from(value: LeaderboardError) -> Self {
        match value {
            LeaderboardError::Validation(e) => RouteError::Validation(e),
            LeaderboardError::Store(e) => RouteError::Store(e),
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: String,
        }

        let (status, message, err) = match &self {
            // client mistakes aren't something the server needs to log
            RouteError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string(), None),
            RouteError::MalformedRequest(reason) => {
                (StatusCode::BAD_REQUEST, reason.to_owned(), None)
            }
            RouteError::QueryRejection(rejection) => {
                (StatusCode::BAD_REQUEST, rejection.body_text(), None)
            }
            RouteError::JsonRejection(rejection) => {
                (StatusCode::BAD_REQUEST, rejection.body_text(), None)
            }

            RouteError::Store(StoreError::Unavailable(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("score store is unavailable"),
                Some(self),
            ),
            RouteError::Store(StoreError::Corrupt { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("score store returned an unreadable entry"),
                Some(self),
            ),
            RouteError::Bind(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
                Some(self),
            ),
        };

        let body = ErrorResponse {
            success: false,
            message,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(err) = err {
            response.extensions_mut().insert(Arc::new(err));
        }

        response
    }
}
