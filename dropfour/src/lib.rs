//! Game engine and minimax agent for a four-in-a-row drop game on a 7x9 grid.
//! Positions are plain values: callers either build a `Board` move by move or
//! replay a compact history string (e.g. `A4B4A5`) and ask a `Player` for the
//! next column.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

pub mod board;
pub mod player;
pub mod search;

pub use board::{Board, Direction, MoveOutcome, Piece, COLS, CONNECT, ROWS, WIN_SCORE};
pub use player::{
    ColumnSource, ConsoleInput, HumanPlayer, MinimaxPlayer, MinimaxProbPlayer, Player,
    RandomPlayer, Strategy, StubPlayer, DEFAULT_DEPTH, DEFAULT_STOCHASTIC_PROB, MAX_DEPTH,
};
pub use search::{
    choose_column, choose_column_stochastic, random_column, Search, SearchNode, SearchOutcome,
    SEARCH_BOUND,
};

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid move string at position {position}: {reason}")]
    ParseMove { position: usize, reason: String },
    #[error("invalid board: {reason}")]
    ParseBoard { reason: String },
    #[error("column {column} is full")]
    ColumnFull { column: usize },
    #[error("column {column} is out of bounds")]
    ColumnOutOfBounds { column: usize },
    #[error("no legal moves remain")]
    NoMoves,
    #[error("the game is already over")]
    GameOver,
    #[error("depth {0} is out of range (1-10)")]
    DepthOutOfRange(u8),
    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("could not read a column: {0}")]
    Input(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedMove {
    pub piece: Piece,
    pub column: usize,
}

/// Parses pairs of piece letter and column digit, e.g. `A4B4A5`.
pub fn parse_history(history: &str) -> Result<Vec<TypedMove>, GameError> {
    let chars: Vec<char> = history.trim().chars().collect();
    let mut moves = Vec::with_capacity(chars.len() / 2);
    let mut idx = 0;
    while idx < chars.len() {
        let symbol = chars[idx];
        let piece = Piece::from_symbol(symbol).ok_or_else(|| GameError::ParseMove {
            position: idx,
            reason: format!("expected A or B, found {symbol}"),
        })?;
        idx += 1;
        let column = match chars.get(idx) {
            None => {
                return Err(GameError::ParseMove {
                    position: idx,
                    reason: "missing column number".to_string(),
                })
            }
            Some(c) => c.to_digit(10).ok_or_else(|| GameError::ParseMove {
                position: idx,
                reason: format!("expected column digit, found {c}"),
            })? as usize,
        };
        if column >= COLS {
            return Err(GameError::ParseMove {
                position: idx,
                reason: format!("column must be 0-{}", COLS - 1),
            });
        }
        moves.push(TypedMove { piece, column });
        idx += 1;
    }
    Ok(moves)
}

impl Board {
    pub fn from_history(moves: &[TypedMove]) -> Result<Self, GameError> {
        let mut board = Board::new();
        for mv in moves {
            let outcome = board.apply_move(mv.column, mv.piece)?;
            trace!(piece = %mv.piece, column = mv.column, row = outcome.row, "replayed move");
        }
        Ok(board)
    }
}

/// Piece to move after `moves`: the other side of the last mover, `A` first.
pub fn side_to_move(moves: &[TypedMove]) -> Piece {
    moves.last().map_or(Piece::A, |mv| mv.piece.enemy())
}

fn default_depth() -> u8 {
    DEFAULT_DEPTH
}

fn default_prob() -> f64 {
    DEFAULT_STOCHASTIC_PROB
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub position: String,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_depth")]
    pub depth: u8,
    #[serde(default = "default_prob")]
    pub prob: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl MoveRequest {
    pub fn minimax(position: impl Into<String>, depth: u8) -> Self {
        Self {
            position: position.into(),
            strategy: Strategy::Minimax,
            depth,
            prob: DEFAULT_STOCHASTIC_PROB,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub column: usize,
    pub piece: Piece,
}

/// Replays the request's history and asks the requested player for the side
/// to move.
pub fn best_move(request: MoveRequest) -> Result<MoveResponse, GameError> {
    let moves = parse_history(&request.position)?;
    let board = Board::from_history(&moves)?;
    if board.is_terminal() {
        return Err(GameError::GameOver);
    }
    let piece = side_to_move(&moves);
    let mut player = request
        .strategy
        .build(piece, request.depth, request.prob, request.seed)?;
    let column = player.play(&board)?;
    Ok(MoveResponse { column, piece })
}
