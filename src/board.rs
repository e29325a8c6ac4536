//! Board value type and terminal-condition evaluation.
//!
//! [`BoardState`] is a plain `Copy` value: every accepted move produces a new
//! board via [`BoardState::with_move`]. Cells are addressed in row-major order,
//! `0..=8`, through the validated [`CellIndex`] newtype.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// The 8 winning lines, in evaluation order: rows, columns, then diagonals.
const LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// One of the two player marks. `X` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Returns the other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    /// Returns the display character for this symbol.
    pub fn as_char(self) -> char {
        match self {
            Symbol::X => 'X',
            Symbol::O => 'O',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A validated cell index in `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex(u8);

impl CellIndex {
    /// Validate a raw index.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidIndex`] if `raw` is not in `0..=8`.
    pub fn new(raw: usize) -> Result<Self> {
        match u8::try_from(raw) {
            Ok(value) if raw < CELL_COUNT => Ok(Self(value)),
            _ => Err(SessionError::InvalidIndex(raw)),
        }
    }

    /// Returns the raw index.
    pub fn get(self) -> usize {
        usize::from(self.0)
    }

    /// Iterates all 9 indices in row-major order.
    pub fn all() -> impl Iterator<Item = CellIndex> {
        (0..CELL_COUNT as u8).map(CellIndex)
    }
}

impl TryFrom<u8> for CellIndex {
    type Error = SessionError;

    fn try_from(raw: u8) -> Result<Self> {
        Self::new(usize::from(raw))
    }
}

impl From<CellIndex> for u8 {
    fn from(index: CellIndex) -> Self {
        index.0
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Mark(Symbol),
}

impl Cell {
    /// Returns the symbol in this cell, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::Mark(symbol) => Some(symbol),
        }
    }
}

/// The 3x3 grid, stored in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoardState {
    cells: [Cell; CELL_COUNT],
}

impl BoardState {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `index`.
    pub fn get(&self, index: CellIndex) -> Cell {
        self.cells.get(index.get()).copied().unwrap_or_default()
    }

    /// Returns all cells in row-major order.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Returns `true` if the cell at `index` is empty.
    ///
    /// Out-of-range indices are never empty.
    pub fn is_empty(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(Cell::Empty))
    }

    /// Returns a new board with `index` marked by `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IllegalOverwrite`] if the cell is already marked.
    pub fn with_move(&self, index: CellIndex, symbol: Symbol) -> Result<Self> {
        if !self.is_empty(index.get()) {
            return Err(SessionError::IllegalOverwrite { index: index.get() });
        }
        Ok(self.with_overwrite(index, symbol))
    }

    /// Marks `index` regardless of its current content. Only the desync path
    /// uses this, to mirror the authority's claimed board.
    pub(crate) fn with_overwrite(&self, index: CellIndex, symbol: Symbol) -> Self {
        let mut next = *self;
        if let Some(cell) = next.cells.get_mut(index.get()) {
            *cell = Cell::Mark(symbol);
        }
        next
    }

    /// Returns the symbol owning the first complete line, if any.
    pub fn winner(&self) -> Option<Symbol> {
        LINES.iter().find_map(|line| {
            let [a, b, c] = line.map(|i| self.cells.get(i).copied().unwrap_or_default());
            match a {
                Cell::Mark(symbol) if a == b && a == c => Some(symbol),
                _ => None,
            }
        })
    }

    /// Returns `true` if no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| *cell != Cell::Empty)
    }

    /// Returns `true` if the board has a winner or is full.
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    /// Iterates the indices of empty cells.
    pub fn empty_cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        CellIndex::all().filter(|index| self.is_empty(index.get()))
    }

    /// Number of cells marked by `symbol`.
    pub fn mark_count(&self, symbol: Symbol) -> usize {
        self.cells
            .iter()
            .filter(|cell| **cell == Cell::Mark(symbol))
            .count()
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for cell in chunk {
                let c = cell.symbol().map_or('.', Symbol::as_char);
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn idx(raw: usize) -> CellIndex {
        CellIndex::new(raw).unwrap()
    }

    fn board_from(moves: &[(usize, Symbol)]) -> BoardState {
        moves.iter().fold(BoardState::new(), |board, (i, s)| {
            board.with_move(idx(*i), *s).unwrap()
        })
    }

    #[test]
    fn cell_index_rejects_out_of_range() {
        assert!(CellIndex::new(8).is_ok());
        assert!(matches!(
            CellIndex::new(9),
            Err(SessionError::InvalidIndex(9))
        ));
        assert!(matches!(
            CellIndex::try_from(255u8),
            Err(SessionError::InvalidIndex(255))
        ));
        assert_eq!(CellIndex::all().count(), CELL_COUNT);
    }

    #[test]
    fn empty_board_has_no_winner() {
        let board = BoardState::new();
        assert_eq!(board.winner(), None);
        assert!(!board.is_full());
        assert!(!board.is_terminal());
        assert_eq!(board.empty_cells().count(), 9);
    }

    #[test]
    fn is_empty_is_false_out_of_range() {
        let board = BoardState::new();
        assert!(board.is_empty(0));
        assert!(!board.is_empty(9));
        assert!(!board.is_empty(usize::MAX));
    }

    #[test]
    fn with_move_returns_new_board() {
        let board = BoardState::new();
        let next = board.with_move(idx(4), Symbol::X).unwrap();
        assert!(board.is_empty(4));
        assert_eq!(next.get(idx(4)), Cell::Mark(Symbol::X));
        assert_eq!(next.mark_count(Symbol::X), 1);
    }

    #[test]
    fn with_move_rejects_overwrite() {
        let board = board_from(&[(0, Symbol::X)]);
        assert!(matches!(
            board.with_move(idx(0), Symbol::O),
            Err(SessionError::IllegalOverwrite { index: 0 })
        ));
    }

    #[test]
    fn every_line_is_detected() {
        for line in LINES {
            let moves: Vec<_> = line.iter().map(|i| (*i, Symbol::O)).collect();
            let board = board_from(&moves);
            assert_eq!(board.winner(), Some(Symbol::O), "line {line:?}");
            assert!(board.is_terminal());
        }
    }

    #[test]
    fn partial_line_is_not_a_win() {
        let board = board_from(&[(0, Symbol::X), (1, Symbol::X), (2, Symbol::O)]);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn winner_stays_none_until_line_completes() {
        // X: 0, 4, 8 diagonal; O: 1, 2
        let sequence = [
            (0, Symbol::X),
            (1, Symbol::O),
            (4, Symbol::X),
            (2, Symbol::O),
            (8, Symbol::X),
        ];
        let mut board = BoardState::new();
        for (n, (i, s)) in sequence.iter().enumerate() {
            board = board.with_move(idx(*i), *s).unwrap();
            if n + 1 < sequence.len() {
                assert_eq!(board.winner(), None, "after move {n}");
            }
        }
        assert_eq!(board.winner(), Some(Symbol::X));
    }

    #[test]
    fn full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        let board = board_from(&[
            (0, Symbol::X),
            (1, Symbol::O),
            (2, Symbol::X),
            (4, Symbol::O),
            (3, Symbol::X),
            (5, Symbol::O),
            (7, Symbol::X),
            (6, Symbol::O),
            (8, Symbol::X),
        ]);
        assert!(board.is_full());
        assert_eq!(board.winner(), None);
        assert!(board.is_terminal());
    }

    #[test]
    fn display_renders_grid() {
        let board = board_from(&[(0, Symbol::X), (4, Symbol::O)]);
        assert_eq!(board.to_string(), "X..\n.O.\n...");
    }

    #[test]
    fn symbol_opponent_flips() {
        assert_eq!(Symbol::X.opponent(), Symbol::O);
        assert_eq!(Symbol::O.opponent(), Symbol::X);
        assert_eq!(Symbol::O.to_string(), "O");
    }
}
