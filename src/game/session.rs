//! Timer-driven game session.
//!
//! One task owns the [`Game`]. Inputs arrive on an `mpsc` channel and only queue state for the
//! next tick; every tick (and every visible change from an input) publishes a [`Frame`] on a
//! `watch` channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::instrument;

use super::direction::Direction;
use super::state::{Frame, Game, Status, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Start,
    Steer(Direction),
    Reset,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Collided,
    BoardFull,
    Quit,
    /// Every input sender was dropped
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub score: u32,
    pub ticks: u64,
    pub length: usize,
    pub reason: EndReason,
}

pub struct SessionHandle {
    pub inputs: mpsc::Sender<Input>,
    pub frames: watch::Receiver<Frame>,
    pub task: JoinHandle<SessionSummary>,
}

const INPUT_BUFFER: usize = 32;

/// Spawns a task that runs `game` until it terminates or is told to quit.
pub fn spawn(game: Game) -> SessionHandle {
    let (inputs, rx_inputs) = mpsc::channel(INPUT_BUFFER);
    let (tx_frames, frames) = watch::channel(game.frame());

    let task = tokio::task::spawn(run(game, rx_inputs, tx_frames));

    SessionHandle {
        inputs,
        frames,
        task,
    }
}

#[instrument(skip_all)]
async fn run(
    mut game: Game,
    mut inputs: mpsc::Receiver<Input>,
    frames: watch::Sender<Frame>,
) -> SessionSummary {
    let mut ticks = 0u64;
    let mut deadline = Instant::now() + game.tick_interval();

    let summary = |game: &Game, ticks: u64, reason: EndReason| SessionSummary {
        score: game.score(),
        ticks,
        length: game.frame().snake.len(),
        reason,
    };

    loop {
        let running = game.status() == Status::Running;

        tokio::select! {
            _ = sleep_until(deadline), if running => {
                let outcome = game.tick();
                ticks += 1;
                // receivers going away doesn't stop the game
                _ = frames.send(game.frame());

                match outcome {
                    TickOutcome::Collided => {
                        tracing::info!(score = game.score(), ticks, "game over");
                        return summary(&game, ticks, EndReason::Collided);
                    }
                    TickOutcome::BoardFull => {
                        tracing::info!(score = game.score(), ticks, "board filled");
                        return summary(&game, ticks, EndReason::BoardFull);
                    }
                    TickOutcome::Ate => {
                        let tick_ms = game.tick_interval().as_millis() as u64;
                        tracing::debug!(score = game.score(), tick_ms, "food eaten");
                    }
                    TickOutcome::Moved | TickOutcome::Skipped => (),
                }

                deadline += game.tick_interval();
            }

            input = inputs.recv() => match input {
                Some(Input::Start) => {
                    if game.start() {
                        tracing::debug!("game started");
                        deadline = Instant::now() + game.tick_interval();
                        _ = frames.send(game.frame());
                    }
                }
                Some(Input::Steer(direction)) => {
                    if !game.steer(direction) {
                        tracing::trace!(?direction, "reverse turn ignored");
                    }
                }
                Some(Input::Reset) => {
                    game.reset();
                    ticks = 0;
                    _ = frames.send(game.frame());
                }
                Some(Input::Quit) => return summary(&game, ticks, EndReason::Quit),
                None => return summary(&game, ticks, EndReason::Disconnected),
            },
        }
    }
}
