use clap::{Args, Parser, Subcommand};
use flag_arena::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flag-arena")]
#[command(about = "Capture-the-flag bot arena on a graph board")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    setup: SetupArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match (default)
    Play,
    /// Play many seeded matches and print the tally
    Series {
        #[arg(short, long, default_value_t = 100)]
        games: usize,
    },
    /// Serve a spectator API for stepping through a match
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

#[derive(Args)]
struct SetupArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    rows: Option<usize>,

    #[arg(long, global = true)]
    cols: Option<usize>,

    /// Agents per team
    #[arg(long, global = true)]
    roster: Option<usize>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    #[arg(long, global = true)]
    max_turns: Option<usize>,

    #[arg(long, value_enum, global = true)]
    red: Option<Strategy>,

    #[arg(long, value_enum, global = true)]
    blue: Option<Strategy>,

    /// Skip the per-turn board printout
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl SetupArgs {
    fn load(&self) -> Result<GameConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => GameConfig::from_json_file(path)?,
            None => GameConfig::default(),
        };

        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if let Some(roster) = self.roster {
            config.roster_size = roster;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.max_turns.is_some() {
            config.max_turns = self.max_turns;
        }
        if let Some(red) = self.red {
            config.red = red;
        }
        if let Some(blue) = self.blue {
            config.blue = blue;
        }
        Ok(config)
    }
}

fn play(config: &GameConfig, quiet: bool) -> Result<(), GameError> {
    let renderer: Box<dyn Renderer> = if quiet {
        Box::new(NullRenderer)
    } else {
        Box::new(TextRenderer)
    };
    let mut game = config.build_match()?.with_renderer(renderer);
    let result = game.play()?;

    println!("\n========================================");
    println!("Match Result:");
    match result {
        MatchResult::RedWins { winner_name, turns } => {
            println!("  {} wins for Red in {} turns!", winner_name, turns);
        }
        MatchResult::BlueWins { winner_name, turns } => {
            println!("  {} wins for Blue in {} turns!", winner_name, turns);
        }
        MatchResult::TurnLimit { turns } => {
            println!("  No winner after {} turns", turns);
        }
    }
    println!("========================================");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.setup.load()?;

    match cli.command {
        None | Some(Commands::Play) => play(&config, cli.setup.quiet)?,
        Some(Commands::Series { games }) => {
            let results = Series::new(config).run(games)?;
            println!("{}", results);
        }
        Some(Commands::Serve { addr }) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run_server(&addr, config))?;
        }
    }
    Ok(())
}
