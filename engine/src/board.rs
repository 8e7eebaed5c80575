use bitvec::prelude::*;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use lazy_static::lazy_static;
use std::fmt;
use std::io::{Error, ErrorKind};

const SIDE: usize = 3;
pub const CELLS: usize = SIDE * SIDE;
pub type BitBoard = BitArr!(for CELLS, in u16, Lsb0);
// cell i sits at row i / 3, column i % 3

/// Winning lines in scan order: rows, columns, then diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub trait BitCells {
    fn empty() -> Self;
    fn from_cells(cells: &[usize]) -> Self;
}

impl BitCells for BitBoard {
    fn empty() -> Self {
        bitarr!(u16, Lsb0; 0; CELLS)
    }

    fn from_cells(cells: &[usize]) -> Self {
        let mut squares = BitBoard::empty();
        for &idx in cells {
            squares.set(idx, true);
        }
        squares
    }
}

lazy_static! {
    static ref LINE_MASKS: Vec<BitBoard> = LINES.iter()
        .map(|line| BitBoard::from_cells(line))
        .collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mark::X => f.write_str("X"),
            Mark::O => f.write_str("O"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

/// Result of scanning a board. Never stored, always recomputed from the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Win(Mark),
    Draw,
}

impl Outcome {
    pub fn is_over(&self) -> bool {
        *self != Outcome::InProgress
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    x_squares: BitBoard,
    o_squares: BitBoard,
}

impl Board {
    pub fn new() -> Self {
        Self {
            x_squares: BitBoard::empty(),
            o_squares: BitBoard::empty(),
        }
    }

    pub fn from_cells(cells: [Cell; CELLS]) -> Self {
        let mut board = Self::new();
        for (idx, cell) in cells.into_iter().enumerate() {
            board.set(idx, cell);
        }
        board
    }

    pub fn get(&self, idx: usize) -> Cell {
        if self.x_squares[idx] {
            Cell::X
        } else if self.o_squares[idx] {
            Cell::O
        } else {
            Cell::Empty
        }
    }

    pub fn cells(&self) -> [Cell; CELLS] {
        std::array::from_fn(|idx| self.get(idx))
    }

    /// Overwrites a cell without any legality check. Used for search scratch boards.
    pub(crate) fn set(&mut self, idx: usize, cell: Cell) {
        self.x_squares.set(idx, cell == Cell::X);
        self.o_squares.set(idx, cell == Cell::O);
    }

    pub fn is_empty(&self, idx: usize) -> bool {
        !self.x_squares[idx] && !self.o_squares[idx]
    }

    /// Empty cell indices in increasing order.
    pub fn empty_cells(&self) -> Vec<usize> {
        (0..CELLS).filter(|&idx| self.is_empty(idx)).collect()
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.squares(mark).count_ones()
    }

    pub fn is_full(&self) -> bool {
        (self.x_squares | self.o_squares).count_ones() == CELLS
    }

    fn squares(&self, mark: Mark) -> BitBoard {
        match mark {
            Mark::X => self.x_squares,
            Mark::O => self.o_squares,
        }
    }

    /// Scans the winning lines in `LINES` order; the first completed line decides the winner.
    pub fn evaluate(&self) -> Outcome {
        for mask in LINE_MASKS.iter() {
            if *mask & self.x_squares == *mask {
                return Outcome::Win(Mark::X);
            }
            if *mask & self.o_squares == *mask {
                return Outcome::Win(Mark::O);
            }
        }
        if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::InProgress
        }
    }

    pub fn make_move(&self, idx: usize, mark: Mark) -> Result<Self, Error> {
        if idx >= CELLS || !self.is_empty(idx) {
            return Err(Error::new(ErrorKind::InvalidInput, format!("Illegal move: {}", idx)));
        }
        let mut board = *self;
        board.set(idx, mark.into());
        Ok(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let mut s = serializer.serialize_seq(Some(CELLS))?;
        for cell in self.cells() {
            s.serialize_element(&cell.mark())?;
        }
        s.end()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.cells()).finish()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..SIDE {
            let line: Vec<&str> = (0..SIDE)
                .map(|col| match self.get(row * SIDE + col) {
                    Cell::Empty => ".",
                    Cell::X => "X",
                    Cell::O => "O",
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Cell::{Empty as E, O, X};

    #[test]
    fn empty_board_is_in_progress() {
        let board = Board::new();
        assert_eq!(board.evaluate(), Outcome::InProgress);
        assert_eq!(board.empty_cells(), (0..CELLS).collect::<Vec<_>>());
    }

    #[test]
    fn every_line_wins_for_either_mark() {
        for line in LINES {
            for mark in [Mark::X, Mark::O] {
                let mut board = Board::new();
                for idx in line {
                    board.set(idx, mark.into());
                }
                assert_eq!(board.evaluate(), Outcome::Win(mark), "line {:?}", line);
            }
        }
    }

    #[test]
    fn full_board_without_line_is_draw() {
        let board = Board::from_cells([
            X, O, X,
            X, O, O,
            O, X, X,
        ]);
        assert!(board.is_full());
        assert_eq!(board.evaluate(), Outcome::Draw);
    }

    #[test]
    fn full_board_with_line_is_win() {
        let board = Board::from_cells([
            X, X, X,
            O, O, X,
            X, O, O,
        ]);
        assert_eq!(board.evaluate(), Outcome::Win(Mark::X));
    }

    #[test]
    fn first_line_in_scan_order_wins() {
        // not reachable in a legal game, but the scan order must stay fixed
        let board = Board::from_cells([
            O, O, O,
            X, X, X,
            E, E, E,
        ]);
        assert_eq!(board.evaluate(), Outcome::Win(Mark::O));
    }

    #[test]
    fn incomplete_line_is_in_progress() {
        let board = Board::from_cells([
            X, X, E,
            O, O, E,
            E, E, E,
        ]);
        assert_eq!(board.evaluate(), Outcome::InProgress);
        assert_eq!(board.evaluate(), board.evaluate());
    }

    #[test]
    fn make_move_rejects_occupied_and_out_of_range() {
        let board = Board::new().make_move(4, Mark::X).unwrap();
        assert_eq!(board.get(4), Cell::X);
        assert_eq!(board.count(Mark::X), 1);
        assert!(board.make_move(4, Mark::O).is_err());
        assert!(board.make_move(CELLS, Mark::O).is_err());
    }

    #[test]
    fn make_move_returns_a_new_board() {
        let board = Board::new();
        let next = board.make_move(0, Mark::X).unwrap();
        assert_eq!(board, Board::new());
        assert_ne!(board, next);
    }

    #[test]
    fn cells_round_trip_through_bitboards() {
        let cells = [X, E, O, E, X, E, O, E, E];
        assert_eq!(Board::from_cells(cells).cells(), cells);
    }

    #[test]
    fn serializes_as_nullable_marks() {
        let board = Board::from_cells([X, E, O, E, E, E, E, E, E]);
        let value = serde_json::to_value(board).unwrap();
        assert_eq!(value, serde_json::json!(["X", null, "O", null, null, null, null, null, null]));
    }

    #[test]
    fn displays_as_grid() {
        let board = Board::from_cells([X, E, O, E, X, E, E, E, O]);
        assert_eq!(board.to_string(), "X . O\n. X .\n. . O\n");
    }
}
