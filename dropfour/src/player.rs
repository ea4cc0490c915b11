//! Move-choosing strategies. Each variant carries only what it needs: its
//! piece, a search depth, a probability, or an injected random generator.
use std::io::{BufRead, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{Board, Piece, COLS};
use crate::search::{choose_column, choose_column_stochastic, random_column};
use crate::GameError;

pub const DEFAULT_DEPTH: u8 = 5;
pub const MAX_DEPTH: u8 = 10;
pub const DEFAULT_STOCHASTIC_PROB: f64 = 0.1;

/// Anything that can pick a column for a position.
pub trait Player {
    /// Returns the column to play. Callers should treat a column outside
    /// `board.valid_columns()` as a broken contract.
    fn play(&mut self, board: &Board) -> Result<usize, GameError>;

    fn piece(&self) -> Piece;

    fn name(&self) -> &str;
}

fn check_depth(depth: u8) -> Result<usize, GameError> {
    if !(1..=MAX_DEPTH).contains(&depth) {
        return Err(GameError::DepthOutOfRange(depth));
    }
    Ok(depth as usize)
}

/// Always answers column 0.
#[derive(Clone, Debug)]
pub struct StubPlayer {
    piece: Piece,
}

impl StubPlayer {
    pub fn new(piece: Piece) -> Self {
        Self { piece }
    }
}

impl Player for StubPlayer {
    fn play(&mut self, _board: &Board) -> Result<usize, GameError> {
        Ok(0)
    }

    fn piece(&self) -> Piece {
        self.piece
    }

    fn name(&self) -> &str {
        "Stub"
    }
}

pub struct RandomPlayer<R: Rng = StdRng> {
    piece: Piece,
    rng: R,
}

impl RandomPlayer<StdRng> {
    pub fn from_entropy(piece: Piece) -> Self {
        Self::new(piece, StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomPlayer<R> {
    pub fn new(piece: Piece, rng: R) -> Self {
        Self { piece, rng }
    }
}

impl<R: Rng> Player for RandomPlayer<R> {
    fn play(&mut self, board: &Board) -> Result<usize, GameError> {
        random_column(board, &mut self.rng)
    }

    fn piece(&self) -> Piece {
        self.piece
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[derive(Clone, Debug)]
pub struct MinimaxPlayer {
    piece: Piece,
    depth: usize,
}

impl MinimaxPlayer {
    pub fn new(piece: Piece, depth: u8) -> Result<Self, GameError> {
        Ok(Self {
            piece,
            depth: check_depth(depth)?,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Player for MinimaxPlayer {
    fn play(&mut self, board: &Board) -> Result<usize, GameError> {
        choose_column(board, self.piece, self.depth)
    }

    fn piece(&self) -> Piece {
        self.piece
    }

    fn name(&self) -> &str {
        "Minimax"
    }
}

/// Minimax that plays a random legal column with probability `prob`.
pub struct MinimaxProbPlayer<R: Rng = StdRng> {
    piece: Piece,
    depth: usize,
    prob: f64,
    rng: R,
}

impl<R: Rng> MinimaxProbPlayer<R> {
    pub fn new(piece: Piece, depth: u8, prob: f64, rng: R) -> Result<Self, GameError> {
        if !(0.0..=1.0).contains(&prob) {
            return Err(GameError::InvalidProbability(prob));
        }
        Ok(Self {
            piece,
            depth: check_depth(depth)?,
            prob,
            rng,
        })
    }

    pub fn prob(&self) -> f64 {
        self.prob
    }
}

impl<R: Rng> Player for MinimaxProbPlayer<R> {
    fn play(&mut self, board: &Board) -> Result<usize, GameError> {
        choose_column_stochastic(board, self.piece, self.depth, self.prob, &mut self.rng)
    }

    fn piece(&self) -> Piece {
        self.piece
    }

    fn name(&self) -> &str {
        "MinimaxProb"
    }
}

/// Source of columns typed by a person.
pub trait ColumnSource {
    fn read_column(&mut self) -> Result<usize, GameError>;
}

/// Prompts on `output` and reads one line from `input` per move.
pub struct ConsoleInput<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsoleInput<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ColumnSource for ConsoleInput<R, W> {
    fn read_column(&mut self) -> Result<usize, GameError> {
        write!(self.output, "input the next column index 0 to {}:", COLS - 1)
            .and_then(|_| self.output.flush())
            .map_err(|err| GameError::Input(err.to_string()))?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|err| GameError::Input(err.to_string()))?;
        if read == 0 {
            return Err(GameError::Input("input closed".to_string()));
        }
        let column: usize = line
            .trim()
            .parse()
            .map_err(|_| GameError::Input(format!("not a column index: {}", line.trim())))?;
        if column >= COLS {
            return Err(GameError::ColumnOutOfBounds { column });
        }
        Ok(column)
    }
}

/// Plays whatever the column source returns; legality is left to the caller.
pub struct HumanPlayer<S> {
    piece: Piece,
    source: S,
}

impl<S: ColumnSource> HumanPlayer<S> {
    pub fn new(piece: Piece, source: S) -> Self {
        Self { piece, source }
    }
}

impl<S: ColumnSource> Player for HumanPlayer<S> {
    fn play(&mut self, _board: &Board) -> Result<usize, GameError> {
        self.source.read_column()
    }

    fn piece(&self) -> Piece {
        self.piece
    }

    fn name(&self) -> &str {
        "Human"
    }
}

/// Computer strategies selectable at runtime.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Stub,
    Random,
    #[default]
    Minimax,
    Stochastic,
}

impl Strategy {
    /// Builds the player. A `seed` makes the random variants reproducible.
    pub fn build(
        self,
        piece: Piece,
        depth: u8,
        prob: f64,
        seed: Option<u64>,
    ) -> Result<Box<dyn Player + Send>, GameError> {
        let rng = || seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let player: Box<dyn Player + Send> = match self {
            Strategy::Stub => Box::new(StubPlayer::new(piece)),
            Strategy::Random => Box::new(RandomPlayer::new(piece, rng())),
            Strategy::Minimax => Box::new(MinimaxPlayer::new(piece, depth)?),
            Strategy::Stochastic => Box::new(MinimaxProbPlayer::new(piece, depth, prob, rng())?),
        };
        Ok(player)
    }
}
