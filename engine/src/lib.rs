//! Tic-tac-toe with a computer opponent.
//!
//! [`board`] holds the board and the win/draw evaluator, [`engine`] picks computer moves
//! (random, minimax, or a blend of both), [`game`] tracks one local game, and [`server`]
//! serves games to browser clients over WebSocket.

pub mod board;
pub mod engine;
pub mod game;
pub mod server;

pub use board::{Board, Cell, Mark, Outcome};
pub use engine::{Difficulty, Engine, EngineError};
pub use game::{Game, Mode};
