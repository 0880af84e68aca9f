use crate::board::Board;
use crate::bot::Bot;
use crate::config::GameConfig;
use crate::game::{GameError, GameState, Move, Snapshot, Team};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use tracing::{debug, info};

pub struct MatchConfig {
    /// Stop after this many turns even without a winner
    pub max_turns: Option<usize>,
    /// Seed for every random choice made during the match
    pub seed: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            max_turns: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    RedWins { winner_name: String, turns: usize },
    BlueWins { winner_name: String, turns: usize },
    TurnLimit { turns: usize },
}

impl MatchResult {
    pub fn winner(&self) -> Option<Team> {
        match self {
            MatchResult::RedWins { .. } => Some(Team::Red),
            MatchResult::BlueWins { .. } => Some(Team::Blue),
            MatchResult::TurnLimit { .. } => None,
        }
    }

    pub fn turns(&self) -> usize {
        match self {
            MatchResult::RedWins { turns, .. }
            | MatchResult::BlueWins { turns, .. }
            | MatchResult::TurnLimit { turns } => *turns,
        }
    }
}

/// Receives a read-only view of the game once per turn
pub trait Renderer: Send {
    fn render(&mut self, snapshot: &Snapshot);
}

pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &Snapshot) {}
}

/// Prints one line per turn to stdout
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&mut self, snapshot: &Snapshot) {
        println!("{}", snapshot);
    }
}

/// What happened during one call to [`Match::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    pub mv: Move,
    pub winner: Option<Team>,
}

/// One game between two bots on a board
pub struct Match {
    config: MatchConfig,
    board: Box<dyn Board>,
    state: GameState,
    red_bot: Box<dyn Bot>,
    blue_bot: Box<dyn Bot>,
    rng: StdRng,
    renderer: Box<dyn Renderer>,
    started: bool,
}

impl Match {
    pub fn new(
        board: Box<dyn Board>,
        state: GameState,
        red_bot: Box<dyn Bot>,
        blue_bot: Box<dyn Bot>,
        config: MatchConfig,
    ) -> Self {
        Match {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            board,
            state,
            red_bot,
            blue_bot,
            renderer: Box::new(NullRenderer),
            started: false,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &dyn Board {
        self.board.as_ref()
    }

    pub fn bot_name(&self, team: Team) -> &str {
        match team {
            Team::Red => self.red_bot.name(),
            Team::Blue => self.blue_bot.name(),
        }
    }

    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.red_bot.game_start(Team::Red);
        self.blue_bot.game_start(Team::Blue);
        info!(
            red = self.red_bot.name(),
            blue = self.blue_bot.name(),
            seed = self.config.seed,
            "match starting"
        );
        self.renderer.render(&self.state.snapshot());
    }

    /// Play a single turn for whichever team owns it
    pub fn step(&mut self) -> Result<TurnReport, GameError> {
        if self.state.is_game_over() {
            return Err(GameError::GameOver);
        }
        self.start();

        let team = self.state.turn_owner();
        let bot = match team {
            Team::Red => &mut self.red_bot,
            Team::Blue => &mut self.blue_bot,
        };
        let mv = bot.select_move(&self.state, self.board.as_ref(), &mut self.rng)?;
        debug!(turn = self.state.turn_count() + 1, mover = %mv.agent, to = %mv.to, "turn");

        let winner = self.state.apply_move(mv, self.board.as_ref())?;
        self.state.check_invariants()?;

        self.red_bot.notify_move(mv);
        self.blue_bot.notify_move(mv);
        self.renderer.render(&self.state.snapshot());

        if let Some(team) = winner {
            self.red_bot.game_end();
            self.blue_bot.game_end();
            info!(
                winner = %team,
                turns = self.state.turn_count(),
                "{} wins",
                self.bot_name(team)
            );
        }

        Ok(TurnReport { mv, winner })
    }

    /// Run turns until a team captures a flag or the turn cap is hit
    pub fn play(&mut self) -> Result<MatchResult, GameError> {
        self.start();

        while !self.state.is_game_over() {
            if self
                .config
                .max_turns
                .is_some_and(|cap| self.state.turn_count() >= cap)
            {
                self.red_bot.game_end();
                self.blue_bot.game_end();
                info!(turns = self.state.turn_count(), "turn limit reached");
                return Ok(MatchResult::TurnLimit {
                    turns: self.state.turn_count(),
                });
            }
            self.step()?;
        }

        let turns = self.state.turn_count();
        Ok(match self.state.winner() {
            Some(Team::Red) => MatchResult::RedWins {
                winner_name: self.red_bot.name().to_string(),
                turns,
            },
            Some(Team::Blue) => MatchResult::BlueWins {
                winner_name: self.blue_bot.name().to_string(),
                turns,
            },
            None => MatchResult::TurnLimit { turns },
        })
    }
}

/// Many independently seeded matches from one configuration
pub struct Series {
    config: GameConfig,
}

impl Series {
    pub fn new(config: GameConfig) -> Self {
        Series { config }
    }

    /// Play `games` matches; game `i` uses seed `config.seed + i`
    pub fn run(&self, games: usize) -> Result<SeriesResults, GameError> {
        let mut results = SeriesResults::default();

        for i in 0..games {
            let mut config = self.config.clone();
            config.seed = self.config.seed.wrapping_add(i as u64);

            let result = config.build_match()?.play()?;
            debug!(game = i, seed = config.seed, turns = result.turns(), "series game done");
            results.record(&result);
        }

        Ok(results)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeriesResults {
    pub red_wins: usize,
    pub blue_wins: usize,
    pub unfinished: usize,
    pub total_turns: usize,
}

impl SeriesResults {
    pub fn record(&mut self, result: &MatchResult) {
        match result.winner() {
            Some(Team::Red) => self.red_wins += 1,
            Some(Team::Blue) => self.blue_wins += 1,
            None => self.unfinished += 1,
        }
        self.total_turns += result.turns();
    }

    pub fn games(&self) -> usize {
        self.red_wins + self.blue_wins + self.unfinished
    }
}

impl fmt::Display for SeriesResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Series Results:")?;
        writeln!(f, "===============")?;
        writeln!(f, "Games played: {}", self.games())?;
        writeln!(f, "Red wins:     {}", self.red_wins)?;
        writeln!(f, "Blue wins:    {}", self.blue_wins)?;
        writeln!(f, "Unfinished:   {}", self.unfinished)?;
        if self.games() > 0 {
            write!(
                f,
                "Avg turns:    {:.1}",
                self.total_turns as f64 / self.games() as f64
            )?;
        }
        Ok(())
    }
}
