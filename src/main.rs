use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;

use crate::api::server::{AppState, RouteError};
use crate::args::{AutoplayArgs, Command};
use crate::db::StoreError;
use crate::game::session::{self, Input, SessionHandle};
use crate::game::{Game, Status, autopilot};
use crate::leaderboard::{Leaderboard, LeaderboardError};
use crate::util::env::{Env, EnvErr};

mod api;
mod args;
mod constants;
mod db;
mod game;
mod leaderboard;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = args::parse_cli_args();

    let (mut env, dotenv) = Env::load()?;
    cli.apply(&mut env);
    util::tracing::init_subscriber(&env.log_filter, env.log_json);

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }

    tracing::info!(backend = ?env.store_backend, "starting main application");

    let store = db::connect(&env).await?;
    let leaderboard = Leaderboard::new(store, env.backoff());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(leaderboard, &env).await,
        Command::Autoplay(args) => autoplay(leaderboard, args).await,
    }
}

async fn serve(leaderboard: Leaderboard, env: &Env) -> Result<()> {
    let state = Arc::new(AppState::new(leaderboard));
    let cors = api::cors::cors_layer(&env.cors_allow_origins);

    let handles = api::server::start_server(state, cors, env.server_api_port).await?;
    _ = join_all(handles).await;

    Ok(())
}

async fn autoplay(leaderboard: Leaderboard, args: AutoplayArgs) -> Result<()> {
    let game = match args.seed {
        Some(seed) => Game::seeded(seed),
        None => Game::default(),
    };

    let (score, ticks) = if args.instant {
        let mut game = game;
        let (outcome, ticks) = autopilot::play_out(&mut game, args.max_ticks);
        tracing::info!(?outcome, "autopilot finished");

        (game.score(), ticks)
    } else {
        let SessionHandle {
            inputs,
            mut frames,
            task,
        } = session::spawn(game);

        _ = inputs.send(Input::Start).await;

        let mut seen = 0u64;
        while frames.changed().await.is_ok() {
            let frame = frames.borrow_and_update().clone();
            if frame.status != Status::Running {
                continue;
            }

            seen += 1;
            let input = if seen >= args.max_ticks {
                Input::Quit
            } else {
                Input::Steer(autopilot::steer(&frame))
            };

            if inputs.send(input).await.is_err() {
                break;
            }
        }

        let summary = task.await?;
        tracing::info!(reason = ?summary.reason, length = summary.length, "session ended");

        (summary.score, summary.ticks)
    };

    tracing::info!(score, ticks, "game over");

    let Some(username) = args.submit_as else {
        return Ok(());
    };

    if score == 0 {
        tracing::warn!(username = %username, "nothing to submit for a zero score");
        return Ok(());
    }

    let record = leaderboard
        .save(&username, i64::from(score), Utc::now())
        .await?;
    let positions = leaderboard.rank(record.score, record.recorded_at).await?;

    tracing::info!(
        username = %record.username,
        score = record.score,
        daily = positions.daily,
        monthly = positions.monthly,
        yearly = positions.yearly,
        "score submitted"
    );

    Ok(())
}
