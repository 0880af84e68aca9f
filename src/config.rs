use crate::arena::{Match, MatchConfig};
use crate::board::{Board, GraphBoard, NodeId, spawn_positions};
use crate::bot::{Bot, HeuristicBot, RandomBot, ScoringWeights};
use crate::game::{GameError, GameState, Team};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest board a config may describe
pub const MAX_NODES: usize = 65_536;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Heuristic,
    Random,
}

impl Strategy {
    pub fn create_bot(&self, team: Team, weights: ScoringWeights) -> Box<dyn Bot> {
        match self {
            Strategy::Heuristic => {
                Box::new(HeuristicBot::with_weights(format!("{} Heuristic", team), weights))
            }
            Strategy::Random => Box::new(RandomBot::new(format!("{} Random", team))),
        }
    }
}

/// Board shape, rosters, bases, seed and per-team strategy.
///
/// Every field has a default matching the classic 4x3 layout, so a JSON config
/// only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub roster_size: usize,
    /// Defaults to node 0
    pub red_base: Option<usize>,
    /// Defaults to the last node
    pub blue_base: Option<usize>,
    pub seed: u64,
    pub max_turns: Option<usize>,
    pub red: Strategy,
    pub blue: Strategy,
    pub scoring: ScoringWeights,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            rows: 4,
            cols: 3,
            roster_size: 3,
            red_base: None,
            blue_base: None,
            seed: 42,
            max_turns: None,
            red: Strategy::Heuristic,
            blue: Strategy::Heuristic,
            scoring: ScoringWeights::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// `None` when `rows * cols` overflows
    fn node_count(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    pub fn bases(&self) -> (NodeId, NodeId) {
        let red = self.red_base.unwrap_or(0);
        let blue = self
            .blue_base
            .unwrap_or_else(|| self.node_count().unwrap_or(0).saturating_sub(1));
        (NodeId(red), NodeId(blue))
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GameError::InvalidSetup(format!(
                "board must have at least one row and column, got {}x{}",
                self.rows, self.cols
            )));
        }
        let node_count = self
            .node_count()
            .filter(|&count| count <= MAX_NODES)
            .ok_or_else(|| {
                GameError::InvalidSetup(format!(
                    "board of {}x{} exceeds {} nodes",
                    self.rows, self.cols, MAX_NODES
                ))
            })?;
        if node_count < 2 {
            return Err(GameError::InvalidSetup(
                "board needs at least two nodes".to_string(),
            ));
        }
        if self.roster_size == 0 {
            return Err(GameError::InvalidSetup("roster size must be positive".to_string()));
        }
        if self.roster_size > node_count {
            return Err(GameError::InvalidSetup(format!(
                "roster of {} does not fit on {} nodes",
                self.roster_size, node_count
            )));
        }

        let (red, blue) = self.bases();
        for base in [red, blue] {
            if base.0 >= node_count {
                return Err(GameError::UnknownNode(base));
            }
        }
        if red == blue {
            return Err(GameError::InvalidSetup(format!(
                "both teams share base node {}",
                red
            )));
        }
        Ok(())
    }

    /// Board plus initial state with both rosters packed around their bases
    pub fn build_state(&self) -> Result<(GraphBoard, GameState), GameError> {
        self.validate()?;

        let board = GraphBoard::grid(self.rows, self.cols);
        let (red_base, blue_base) = self.bases();
        let red_starts = spawn_positions(&board, red_base, self.roster_size);
        let blue_starts = spawn_positions(&board, blue_base, self.roster_size);

        let state = GameState::new(&board, &red_starts, &blue_starts, red_base, blue_base)?;
        Ok((board, state))
    }

    pub fn build_match(&self) -> Result<Match, GameError> {
        let (board, state) = self.build_state()?;
        let board: Box<dyn Board> = Box::new(board);

        Ok(Match::new(
            board,
            state,
            self.red.create_bot(Team::Red, self.scoring),
            self.blue.create_bot(Team::Blue, self.scoring),
            MatchConfig {
                max_turns: self.max_turns,
                seed: self.seed,
            },
        ))
    }
}
