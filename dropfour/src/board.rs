//! Grid, pieces and the rules that read them: landing rows, wins, draws,
//! run counting and the heuristic score used by the search.
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::GameError;

pub const ROWS: usize = 7;
pub const COLS: usize = 9;
/// Pieces in a line needed to win.
pub const CONNECT: usize = 4;
/// Score of a position already won by the evaluated piece.
pub const WIN_SCORE: i64 = 100_000_000_000;

const THREE_WEIGHT: i64 = 4;
const TWO_WEIGHT: i64 = 2;

/// Start cells of every in-bounds window, indexed by window length, then by
/// direction in `Direction::ALL` order.
static WINDOW_STARTS: Lazy<Vec<[Vec<(usize, usize)>; 4]>> = Lazy::new(|| {
    (0..=CONNECT)
        .map(|len| Direction::ALL.map(|direction| window_starts(direction, len)))
        .collect()
});

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Piece {
    A,
    B,
}

impl Piece {
    pub fn enemy(self) -> Piece {
        match self {
            Piece::A => Piece::B,
            Piece::B => Piece::A,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Piece::A => 'A',
            Piece::B => 'B',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Piece> {
        match symbol {
            'A' | 'a' => Some(Piece::A),
            'B' | 'b' => Some(Piece::B),
            _ => None,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The four line orientations a connection can take.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Horizontal,
    Vertical,
    /// Towards the top-right corner (row decreases, column increases).
    DiagonalUpRight,
    /// Towards the top-left corner.
    DiagonalUpLeft,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalUpRight,
        Direction::DiagonalUpLeft,
    ];

    /// `(row, column)` delta between consecutive cells of a line.
    fn step(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::DiagonalUpRight => (-1, 1),
            Direction::DiagonalUpLeft => (-1, -1),
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::Horizontal => 0,
            Direction::Vertical => 1,
            Direction::DiagonalUpRight => 2,
            Direction::DiagonalUpLeft => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub piece: Piece,
    pub column: usize,
    pub row: usize,
    pub won: bool,
}

/// A 7x9 grid. Row 0 is the top, row `ROWS - 1` the bottom. Every
/// constructor keeps pieces stacked from the bottom of their column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Option<Piece>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    /// Parses a grid written top row first, one string per row, using `.`
    /// for empty cells and `A`/`B` for pieces.
    pub fn from_rows(rows: &[&str]) -> Result<Self, GameError> {
        if rows.len() != ROWS {
            return Err(GameError::ParseBoard {
                reason: format!("expected {ROWS} rows, found {}", rows.len()),
            });
        }
        let mut board = Self::new();
        for (row, line) in rows.iter().enumerate() {
            let symbols: Vec<char> = line.trim().chars().collect();
            if symbols.len() != COLS {
                return Err(GameError::ParseBoard {
                    reason: format!("row {row} has {} cells, expected {COLS}", symbols.len()),
                });
            }
            for (col, symbol) in symbols.into_iter().enumerate() {
                board.cells[row][col] = match symbol {
                    '.' => None,
                    other => Some(Piece::from_symbol(other).ok_or_else(|| {
                        GameError::ParseBoard {
                            reason: format!("unknown symbol {other} at row {row}, column {col}"),
                        }
                    })?),
                };
            }
        }
        for col in 0..COLS {
            for row in 1..ROWS {
                if board.cells[row][col].is_none() && board.cells[row - 1][col].is_some() {
                    return Err(GameError::ParseBoard {
                        reason: format!("piece at row {}, column {col} is floating", row - 1),
                    });
                }
            }
        }
        Ok(board)
    }

    /// # Panics
    ///
    /// Panics if `row >= ROWS` or `col >= COLS`.
    pub fn get(&self, row: usize, col: usize) -> Option<Piece> {
        self.cells[row][col]
    }

    pub fn move_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_some()).count()
    }

    /// Columns off the board count as full.
    pub fn is_column_full(&self, col: usize) -> bool {
        col >= COLS || self.cells[0][col].is_some()
    }

    /// Row a piece dropped into `col` settles in, or `None` if the column is full.
    pub fn landing_row(&self, col: usize) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_none())
    }

    pub fn apply_move(&mut self, col: usize, piece: Piece) -> Result<MoveOutcome, GameError> {
        if col >= COLS {
            return Err(GameError::ColumnOutOfBounds { column: col });
        }
        let row = self
            .landing_row(col)
            .ok_or(GameError::ColumnFull { column: col })?;
        self.cells[row][col] = Some(piece);
        Ok(MoveOutcome {
            piece,
            column: col,
            row,
            won: self.has_won(piece),
        })
    }

    pub fn valid_columns(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| !self.is_column_full(col)).collect()
    }

    pub fn has_won(&self, piece: Piece) -> bool {
        Direction::ALL
            .iter()
            .any(|&direction| self.count_runs_along(piece, CONNECT, direction) > 0)
    }

    pub fn is_draw(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_some())
    }

    pub fn is_terminal(&self) -> bool {
        self.has_won(Piece::A) || self.has_won(Piece::B) || self.is_draw()
    }

    /// Number of windows of exactly `len` consecutive cells, in any
    /// direction, all holding `piece`. Overlapping windows count separately.
    pub fn count_runs(&self, piece: Piece, len: usize) -> usize {
        Direction::ALL
            .iter()
            .map(|&direction| self.count_runs_along(piece, len, direction))
            .sum()
    }

    pub fn count_runs_along(&self, piece: Piece, len: usize, direction: Direction) -> usize {
        if len == 0 || len > ROWS.max(COLS) {
            return 0;
        }
        let count = |starts: &[(usize, usize)]| {
            starts
                .iter()
                .filter(|&&(row, col)| {
                    window_cells(row, col, direction, len).all(|(r, c)| self.cells[r][c] == Some(piece))
                })
                .count()
        };
        match WINDOW_STARTS.get(len) {
            Some(by_direction) => count(&by_direction[direction.index()]),
            None => count(&window_starts(direction, len)),
        }
    }

    /// Heuristic value of the position for `piece`. Decided games return
    /// `WIN_SCORE` or its negation.
    pub fn score(&self, piece: Piece) -> i64 {
        let enemy = piece.enemy();
        if self.has_won(piece) {
            return WIN_SCORE;
        }
        if self.has_won(enemy) {
            return -WIN_SCORE;
        }
        let runs = |p: Piece, len: usize| self.count_runs(p, len) as i64;
        THREE_WEIGHT * runs(piece, 3) + TWO_WEIGHT * runs(piece, 2)
            - THREE_WEIGHT * runs(enemy, 3)
            - TWO_WEIGHT * runs(enemy, 2)
    }

    /// Left-right reflection.
    pub fn mirrored(&self) -> Board {
        let mut mirrored = Board::new();
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                mirrored.cells[row][COLS - 1 - col] = *cell;
            }
        }
        mirrored
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cells in &self.cells {
            for cell in cells {
                write!(f, "{}", cell.map_or('.', Piece::symbol))?;
            }
            writeln!(f)?;
        }
        for col in 0..COLS {
            write!(f, "{col}")?;
        }
        Ok(())
    }
}

fn window_starts(direction: Direction, len: usize) -> Vec<(usize, usize)> {
    if len == 0 {
        return Vec::new();
    }
    let (dr, dc) = direction.step();
    let span = len as isize - 1;
    let mut starts = Vec::new();
    for row in 0..ROWS {
        for col in 0..COLS {
            let end_row = row as isize + dr * span;
            let end_col = col as isize + dc * span;
            if (0..ROWS as isize).contains(&end_row) && (0..COLS as isize).contains(&end_col) {
                starts.push((row, col));
            }
        }
    }
    starts
}

fn window_cells(
    row: usize,
    col: usize,
    direction: Direction,
    len: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let (dr, dc) = direction.step();
    (0..len as isize).map(move |i| {
        (
            (row as isize + dr * i) as usize,
            (col as isize + dc * i) as usize,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: [&str; ROWS]) -> Board {
        Board::from_rows(&rows).unwrap()
    }

    #[test]
    fn drops_to_lowest_empty_row() {
        let mut b = Board::new();
        let first = b.apply_move(4, Piece::A).unwrap();
        let second = b.apply_move(4, Piece::B).unwrap();
        assert_eq!(first.row, ROWS - 1);
        assert_eq!(second.row, ROWS - 2);
        assert_eq!(b.get(ROWS - 1, 4), Some(Piece::A));
        assert_eq!(b.get(ROWS - 2, 4), Some(Piece::B));
        assert_eq!(b.landing_row(4), Some(ROWS - 3));
    }

    #[test]
    fn stacking_fills_column_then_rejects() {
        let mut b = Board::new();
        for expected_row in (0..ROWS).rev() {
            let outcome = b.apply_move(2, Piece::A).unwrap();
            assert_eq!(outcome.row, expected_row);
        }
        assert!(b.is_column_full(2));
        assert_eq!(b.landing_row(2), None);
        let before = b;
        assert!(matches!(
            b.apply_move(2, Piece::A),
            Err(GameError::ColumnFull { column: 2 })
        ));
        assert_eq!(b, before);
    }

    #[test]
    fn rejects_out_of_bounds_column() {
        let mut b = Board::new();
        assert!(matches!(
            b.apply_move(COLS, Piece::B),
            Err(GameError::ColumnOutOfBounds { column: COLS })
        ));
    }

    #[test]
    fn completing_bottom_row_wins() {
        let mut b = Board::new();
        for col in 0..3 {
            b.apply_move(col, Piece::A).unwrap();
        }
        assert!(!b.has_won(Piece::A));
        let outcome = b.apply_move(3, Piece::A).unwrap();
        assert!(outcome.won);
        assert!(b.has_won(Piece::A));
        assert!(!b.has_won(Piece::B));
        assert!(b.is_terminal());
    }

    #[test]
    fn detects_horizontal_win() {
        let b = board([
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".....BBB.",
            "..AAAABBA",
        ]);
        assert!(b.has_won(Piece::A));
        assert!(!b.has_won(Piece::B));
    }

    #[test]
    fn detects_vertical_win() {
        let b = board([
            ".........",
            ".........",
            "........B",
            "........B",
            "........B",
            "A.......B",
            "AA.A....A",
        ]);
        assert!(b.has_won(Piece::B));
        assert!(!b.has_won(Piece::A));
    }

    #[test]
    fn detects_diagonal_up_right_win() {
        let b = board([
            ".........",
            ".........",
            ".........",
            "...A.....",
            "..AB.....",
            ".ABB.....",
            "ABBA.....",
        ]);
        assert!(b.has_won(Piece::A));
        assert_eq!(b.count_runs_along(Piece::A, 4, Direction::DiagonalUpRight), 1);
        assert_eq!(b.count_runs_along(Piece::A, 4, Direction::DiagonalUpLeft), 0);
        assert!(!b.has_won(Piece::B));
    }

    #[test]
    fn detects_diagonal_up_left_win() {
        let b = board([
            ".........",
            ".........",
            ".........",
            ".....B...",
            ".....AB..",
            ".....ABB.",
            ".....AAAB",
        ]);
        assert!(b.has_won(Piece::B));
        assert_eq!(b.count_runs_along(Piece::B, 4, Direction::DiagonalUpLeft), 1);
        assert!(!b.has_won(Piece::A));
    }

    #[test]
    fn three_in_a_row_is_not_a_win() {
        let b = board([
            ".........",
            ".........",
            ".........",
            ".........",
            "A........",
            "A........",
            "A.BBB....",
        ]);
        assert!(!b.has_won(Piece::A));
        assert!(!b.has_won(Piece::B));
        assert!(!b.is_terminal());
    }

    #[test]
    fn full_board_without_win_is_draw() {
        let b = board([
            "AABBAABBA",
            "BBAABBAAB",
            "AABBAABBA",
            "BBAABBAAB",
            "AABBAABBA",
            "BBAABBAAB",
            "AABBAABBA",
        ]);
        assert!(!b.has_won(Piece::A));
        assert!(!b.has_won(Piece::B));
        assert!(b.is_draw());
        assert!(b.is_terminal());
        assert!(b.valid_columns().is_empty());
    }

    #[test]
    fn valid_columns_skip_full_ones() {
        let b = board([
            ".A......B",
            ".B......A",
            ".A......B",
            ".B......A",
            ".A......B",
            ".B......A",
            ".A......B",
        ]);
        assert_eq!(b.valid_columns(), vec![0, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn counts_overlapping_windows() {
        let b = board([
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            "AAAA.....",
        ]);
        assert_eq!(b.count_runs(Piece::A, 2), 3);
        assert_eq!(b.count_runs(Piece::A, 3), 2);
        assert_eq!(b.count_runs(Piece::A, 4), 1);
        assert_eq!(b.count_runs(Piece::A, 5), 0);
        assert_eq!(b.count_runs(Piece::A, 0), 0);
        assert_eq!(b.count_runs(Piece::B, 2), 0);
    }

    #[test]
    fn runs_longer_than_the_board_never_match() {
        let full = board([
            "AAAAAAAAA",
            "AAAAAAAAA",
            "AAAAAAAAA",
            "AAAAAAAAA",
            "AAAAAAAAA",
            "AAAAAAAAA",
            "AAAAAAAAA",
        ]);
        assert_eq!(full.count_runs_along(Piece::A, COLS, Direction::Horizontal), ROWS);
        assert_eq!(full.count_runs(Piece::A, COLS + 1), 0);
        assert_eq!(Board::new().count_runs(Piece::A, usize::MAX), 0);
        assert_eq!(full.count_runs(Piece::A, usize::MAX), 0);
    }

    #[test]
    fn off_board_columns_are_full() {
        let b = Board::new();
        assert!(b.is_column_full(COLS));
        assert_eq!(b.landing_row(COLS), None);
        assert_eq!(b.landing_row(usize::MAX), None);
        assert!(!b.valid_columns().contains(&COLS));
    }

    #[test]
    fn scores_runs_with_fixed_weights() {
        let empty = Board::new();
        assert_eq!(empty.score(Piece::A), 0);

        let b = board([
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            "AAA......",
        ]);
        // one window of three, two windows of two
        assert_eq!(b.score(Piece::A), 4 + 2 * 2);
        assert_eq!(b.score(Piece::B), -(4 + 2 * 2));

        let balanced = board([
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            "BB.......",
            "AA.......",
        ]);
        assert_eq!(balanced.score(Piece::A), 0);
    }

    #[test]
    fn score_returns_win_sentinels() {
        let b = board([
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            "BBB......",
            "AAAA.....",
        ]);
        assert_eq!(b.score(Piece::A), WIN_SCORE);
        assert_eq!(b.score(Piece::B), -WIN_SCORE);
    }

    #[test]
    fn rejects_floating_pieces() {
        let res = Board::from_rows(&[
            ".........",
            ".........",
            ".........",
            ".........",
            "....A....",
            ".........",
            ".........",
        ]);
        assert!(matches!(res, Err(GameError::ParseBoard { .. })));
    }

    #[test]
    fn rejects_bad_dimensions_and_symbols() {
        assert!(Board::from_rows(&["........."]).is_err());
        let res = Board::from_rows(&[
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            "....X....",
        ]);
        assert!(matches!(res, Err(GameError::ParseBoard { .. })));
    }

    #[test]
    fn display_round_trips_through_from_rows() {
        let mut b = Board::new();
        b.apply_move(0, Piece::A).unwrap();
        b.apply_move(8, Piece::B).unwrap();
        b.apply_move(8, Piece::A).unwrap();
        let text = b.to_string();
        let rows: Vec<&str> = text.lines().take(ROWS).collect();
        assert_eq!(Board::from_rows(&rows).unwrap(), b);
        assert_eq!(text.lines().last(), Some("012345678"));
    }

    #[test]
    fn enemy_is_involutive() {
        for piece in [Piece::A, Piece::B] {
            assert_ne!(piece.enemy(), piece);
            assert_eq!(piece.enemy().enemy(), piece);
        }
    }
}
