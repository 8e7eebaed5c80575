use crate::board::{Board, Mark, Outcome};
use crate::engine::{Difficulty, Engine};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::{Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Single,
    Multi,
}

/// One local game: the authoritative board plus turn, mode and difficulty bookkeeping.
/// In single-player mode the human plays `X` and the engine plays `O`.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    x_is_next: bool,
    mode: Option<Mode>,
    difficulty: Option<Difficulty>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            x_is_next: true,
            mode: None,
            difficulty: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn next_mark(&self) -> Mark {
        if self.x_is_next { Mark::X } else { Mark::O }
    }

    pub fn outcome(&self) -> Outcome {
        self.board.evaluate()
    }

    pub fn is_started(&self) -> bool {
        self.mode.is_some()
    }

    /// Starts a fresh game. Single player without a difficulty falls back to `Easy`.
    pub fn start(&mut self, mode: Mode, difficulty: Option<Difficulty>) {
        self.mode = Some(mode);
        self.difficulty = match mode {
            Mode::Single => Some(difficulty.unwrap_or(Difficulty::Easy)),
            Mode::Multi => None,
        };
        self.board = Board::new();
        self.x_is_next = true;
        info!("Started {:?} game (difficulty {:?})", mode, self.difficulty);
    }

    /// Back to mode selection.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn awaiting_engine(&self) -> bool {
        self.mode == Some(Mode::Single) && !self.x_is_next && !self.outcome().is_over()
    }

    /// Human move for whichever mark is next.
    pub fn play(&mut self, idx: usize) -> Result<(), Error> {
        if !self.is_started() {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        if self.outcome().is_over() {
            return Err(Error::new(ErrorKind::InvalidInput, "Game is over"));
        }
        if self.awaiting_engine() {
            return Err(Error::new(ErrorKind::InvalidInput, "Waiting for the computer to move"));
        }
        self.apply(idx)
    }

    /// Computer move in single-player mode. Returns the chosen cell.
    pub fn play_engine<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, Error> {
        if !self.awaiting_engine() {
            return Err(Error::new(ErrorKind::InvalidInput, "Not the computer's turn"));
        }
        let difficulty = self.difficulty.unwrap_or(Difficulty::Easy);
        let idx = Engine::new().select_move(&self.board, difficulty, rng)?;
        self.apply(idx)?;
        Ok(idx)
    }

    /// Best move for the mark to move.
    pub fn hint(&self) -> Result<usize, Error> {
        if !self.is_started() {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        Ok(Engine::for_mark(self.next_mark()).best_move(&self.board)?)
    }

    pub fn status(&self) -> String {
        match self.outcome() {
            Outcome::Win(mark) => format!("Winner: {}", mark),
            Outcome::Draw => "It's a draw!".to_string(),
            Outcome::InProgress => format!("Next player: {}", self.next_mark()),
        }
    }

    fn apply(&mut self, idx: usize) -> Result<(), Error> {
        self.board = self.board.make_move(idx, self.next_mark())?;
        self.x_is_next = !self.x_is_next;
        Ok(())
    }
}
