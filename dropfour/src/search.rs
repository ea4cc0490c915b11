//! Depth-limited minimax with alpha-beta pruning.
//!
//! Leaves are always scored from the point of view of the piece that started
//! the search (`root`), on both maximizing and minimizing plies. Children are
//! visited in ascending column order, so the first column reaching the best
//! value wins ties.
use rand::Rng;
use tracing::debug;

use crate::board::{Board, Piece};
use crate::GameError;

/// Finite stand-in for infinity. Larger than any score `Board::score` returns.
pub const SEARCH_BOUND: i64 = 1_000_000_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchNode {
    pub board: Board,
    pub depth: usize,
    pub maximizing: bool,
    /// Column played to reach this node; `None` at the root.
    pub last_move: Option<usize>,
}

impl SearchNode {
    pub fn root(board: Board) -> Self {
        Self {
            board,
            depth: 0,
            maximizing: true,
            last_move: None,
        }
    }

    fn child(&self, column: usize, piece: Piece) -> Result<Self, GameError> {
        let mut board = self.board;
        board.apply_move(column, piece)?;
        Ok(Self {
            board,
            depth: self.depth + 1,
            maximizing: !self.maximizing,
            last_move: Some(column),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    pub score: i64,
    /// Best column at an inner node, or the move that led to a leaf.
    pub column: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Search {
    root: Piece,
    max_depth: usize,
    pruning: bool,
    nodes: u64,
}

impl Search {
    pub fn new(root: Piece, max_depth: usize) -> Self {
        Self {
            root,
            max_depth,
            pruning: true,
            nodes: 0,
        }
    }

    /// Same search without alpha-beta cutoffs.
    pub fn exhaustive(root: Piece, max_depth: usize) -> Self {
        Self {
            pruning: false,
            ..Self::new(root, max_depth)
        }
    }

    /// Nodes visited since construction.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn run(&mut self, board: &Board) -> Result<SearchOutcome, GameError> {
        let outcome = self.minimax(SearchNode::root(*board), -SEARCH_BOUND, SEARCH_BOUND)?;
        debug!(
            piece = %self.root,
            depth = self.max_depth,
            pruning = self.pruning,
            nodes = self.nodes,
            score = outcome.score,
            column = ?outcome.column,
            "search finished"
        );
        Ok(outcome)
    }

    pub fn minimax(
        &mut self,
        node: SearchNode,
        mut alpha: i64,
        mut beta: i64,
    ) -> Result<SearchOutcome, GameError> {
        self.nodes += 1;
        if node.board.is_terminal() || node.depth == self.max_depth {
            return Ok(SearchOutcome {
                score: node.board.score(self.root),
                column: node.last_move,
            });
        }

        let columns = node.board.valid_columns();
        let first = *columns.first().ok_or(GameError::NoMoves)?;
        let mut best_move = first;

        if node.maximizing {
            let mut best = -SEARCH_BOUND;
            for column in columns {
                let child = node.child(column, self.root)?;
                let value = self.minimax(child, alpha, beta)?.score;
                if value > best {
                    best_move = column;
                }
                best = best.max(value);
                alpha = alpha.max(best);
                if self.pruning && beta <= alpha {
                    break;
                }
            }
            Ok(SearchOutcome {
                score: best,
                column: Some(best_move),
            })
        } else {
            let mut best = SEARCH_BOUND;
            for column in columns {
                let child = node.child(column, self.root.enemy())?;
                let value = self.minimax(child, alpha, beta)?.score;
                if value < best {
                    best_move = column;
                }
                best = best.min(value);
                beta = beta.min(best);
                if self.pruning && beta <= alpha {
                    break;
                }
            }
            Ok(SearchOutcome {
                score: best,
                column: Some(best_move),
            })
        }
    }
}

/// Column minimax picks for `piece`. Fails on a decided or full board.
pub fn choose_column(board: &Board, piece: Piece, depth: usize) -> Result<usize, GameError> {
    if board.is_terminal() {
        return Err(GameError::GameOver);
    }
    Search::new(piece, depth)
        .run(board)?
        .column
        .ok_or(GameError::NoMoves)
}

pub fn random_column<R: Rng>(board: &Board, rng: &mut R) -> Result<usize, GameError> {
    let columns = board.valid_columns();
    if columns.is_empty() {
        return Err(GameError::NoMoves);
    }
    Ok(columns[rng.random_range(0..columns.len())])
}

/// With probability `prob` plays a uniformly random legal column, otherwise
/// the minimax column. One draw per call.
pub fn choose_column_stochastic<R: Rng>(
    board: &Board,
    piece: Piece,
    depth: usize,
    prob: f64,
    rng: &mut R,
) -> Result<usize, GameError> {
    let draw: f64 = rng.random();
    if draw > prob {
        choose_column(board, piece, depth)
    } else {
        debug!(draw, prob, "playing a random column");
        random_column(board, rng)
    }
}
