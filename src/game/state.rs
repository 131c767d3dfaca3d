use std::collections::VecDeque;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::direction::Direction;
use crate::constants::{
    GRID_SIZE, INITIAL_TICK_MS, MIN_TICK_MS, SPEEDUP_EVERY, SPEEDUP_STEP_MS, START_CELL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Running,
    Terminated,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The game wasn't running; nothing moved.
    Skipped,
    Moved,
    Ate,
    /// Hit a wall or the body. The snake is left where it was.
    Collided,
    /// Ate the last free cell; there is nowhere to put food.
    BoardFull,
}

/// Read-only copy of the board, published after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub size: i32,
    /// Head first
    pub snake: Vec<Cell>,
    pub food: Option<Cell>,
    pub direction: Direction,
    pub status: Status,
    pub score: u32,
    pub tick_ms: u64,
}

impl Frame {
    pub fn head(&self) -> Cell {
        self.snake[0]
    }
}

/// Snake on a square grid, advanced one step per [`Game::tick`].
#[derive(Debug)]
pub struct Game {
    size: i32,
    snake: VecDeque<Cell>,
    food: Option<Cell>,
    /// Direction of the last applied move
    direction: Direction,
    /// Applied at the next tick
    pending: Direction,
    status: Status,
    score: u32,
    rng: StdRng,
}

impl Default for Game {
    fn default() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Game {
    /// Reproducible food placement
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let start = Cell::from(START_CELL);
        let mut game = Self {
            size: GRID_SIZE,
            snake: VecDeque::from([start]),
            food: None,
            direction: Direction::Right,
            pending: Direction::Right,
            status: Status::Idle,
            score: 0,
            rng,
        };

        game.food = game.place_food();
        game
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn head(&self) -> Cell {
        // never empty: moves push before they pop and collisions leave the body as is
        self.snake[0]
    }

    /// Idle -> Running. Returns whether the status changed.
    pub fn start(&mut self) -> bool {
        if self.status != Status::Idle {
            return false;
        }

        self.status = Status::Running;
        true
    }

    /// Queues a turn for the next tick. Turning back onto the direction of the last move is
    /// refused, whatever the length of the snake.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if direction.is_opposite(self.direction) {
            return false;
        }

        self.pending = direction;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != Status::Running {
            return TickOutcome::Skipped;
        }

        self.direction = self.pending;
        let head = self.head().step(self.direction);

        // the tail still counts: it only moves out of the way after the head is placed
        if !head.in_bounds(self.size) || self.snake.contains(&head) {
            self.status = Status::Terminated;
            return TickOutcome::Collided;
        }

        self.snake.push_front(head);
        if self.food != Some(head) {
            self.snake.pop_back();
            return TickOutcome::Moved;
        }

        self.score += 1;
        self.food = self.place_food();
        if self.food.is_none() {
            self.status = Status::Terminated;
            return TickOutcome::BoardFull;
        }

        TickOutcome::Ate
    }

    /// Starts at 150ms and drops by 20ms every 5 points, never below 50ms.
    pub fn tick_interval(&self) -> Duration {
        let steps = u64::from(self.score / SPEEDUP_EVERY);
        let ms = INITIAL_TICK_MS
            .saturating_sub(steps.saturating_mul(SPEEDUP_STEP_MS))
            .max(MIN_TICK_MS);

        Duration::from_millis(ms)
    }

    /// Back to the initial board. The random source carries on.
    pub fn reset(&mut self) {
        let start = Cell::from(START_CELL);

        self.snake = VecDeque::from([start]);
        self.direction = Direction::Right;
        self.pending = Direction::Right;
        self.status = Status::Idle;
        self.score = 0;
        self.food = self.place_food();
    }

    pub fn frame(&self) -> Frame {
        Frame {
            size: self.size,
            snake: self.snake.iter().copied().collect(),
            food: self.food,
            direction: self.direction,
            status: self.status,
            score: self.score,
            tick_ms: self.tick_interval().as_millis() as u64,
        }
    }

    /// Uniformly random free cell, `None` once the snake covers the board.
    fn place_food(&mut self) -> Option<Cell> {
        let size = self.size;
        let snake = &self.snake;

        (0..size * size)
            .map(|i| Cell::new(i % size, i / size))
            .filter(|cell| !snake.contains(cell))
            .choose(&mut self.rng)
    }

    /// Running game with an explicit body (head first), direction and food.
    #[cfg(test)]
    pub fn from_layout(
        size: i32,
        snake: &[(i32, i32)],
        direction: Direction,
        food: (i32, i32),
    ) -> Self {
        Self {
            size,
            snake: snake.iter().copied().map(Cell::from).collect(),
            food: Some(Cell::from(food)),
            direction,
            pending: direction,
            status: Status::Running,
            score: 0,
            rng: StdRng::seed_from_u64(0),
        }
    }
}
