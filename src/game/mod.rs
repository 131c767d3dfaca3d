//! Snake simulation, its timer-driven session runner and a headless autopilot.

pub mod autopilot;
pub mod cell;
pub mod direction;
pub mod session;
pub mod state;

pub use state::{Game, Status};
