use crate::board::{Board, Cell, Mark, Outcome, CELLS};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Error, ErrorKind};

const WIN_SCORE: i32 = 10;
const MEDIUM_MINIMAX_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// Asked to move on a board with no empty cell or with the game already decided.
    InvalidState,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::InvalidState => f.write_str("no move available: board is full or game is over"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::new(ErrorKind::InvalidInput, err)
    }
}

/// Move selection for one side. Holds no state between calls; search runs on a private copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    mark: Mark,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine playing `O`, the computer's mark in single-player games.
    pub fn new() -> Self {
        Self::for_mark(Mark::O)
    }

    pub fn for_mark(mark: Mark) -> Self {
        Self { mark }
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn select_move<R: Rng + ?Sized>(
            &self,
            board: &Board,
            difficulty: Difficulty,
            rng: &mut R,
    ) -> Result<usize, EngineError> {
        check_playable(board)?;
        let selected = match difficulty {
            Difficulty::Easy => random_move(board, rng)?,
            Difficulty::Hard => self.best_move(board)?,
            Difficulty::Medium => {
                if rng.gen_bool(MEDIUM_MINIMAX_PROBABILITY) {
                    self.best_move(board)?
                } else {
                    random_move(board, rng)?
                }
            }
        };
        debug!("{} ({:?}) selected cell {}", self.mark, difficulty, selected);
        Ok(selected)
    }

    /// Optimal move for this engine's mark. Ties go to the lowest cell index.
    pub fn best_move(&self, board: &Board) -> Result<usize, EngineError> {
        check_playable(board)?;
        let mut scratch = *board;
        let mut best: Option<(usize, i32)> = None;
        for idx in 0..CELLS {
            if !scratch.is_empty(idx) {
                continue;
            }
            scratch.set(idx, self.mark.into());
            let score = self.minimax(&mut scratch, 0, false);
            scratch.set(idx, Cell::Empty);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }
        best.map(|(idx, _)| idx).ok_or(EngineError::InvalidState)
    }

    fn minimax(&self, board: &mut Board, depth: i32, maximizing: bool) -> i32 {
        match board.evaluate() {
            Outcome::Win(mark) if mark == self.mark => return WIN_SCORE - depth,
            Outcome::Win(_) => return depth - WIN_SCORE,
            Outcome::Draw => return 0,
            Outcome::InProgress => {}
        }

        let mover = if maximizing { self.mark } else { self.mark.other() };
        let mut best = if maximizing { i32::MIN } else { i32::MAX };
        for idx in 0..CELLS {
            if !board.is_empty(idx) {
                continue;
            }
            board.set(idx, mover.into());
            let score = self.minimax(board, depth + 1, !maximizing);
            board.set(idx, Cell::Empty);
            best = if maximizing { best.max(score) } else { best.min(score) };
        }
        best
    }
}

/// Uniformly random empty cell.
pub fn random_move<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Result<usize, EngineError> {
    board.empty_cells()
        .choose(rng)
        .copied()
        .ok_or(EngineError::InvalidState)
}

fn check_playable(board: &Board) -> Result<(), EngineError> {
    if board.evaluate().is_over() {
        Err(EngineError::InvalidState)
    } else {
        Ok(())
    }
}
