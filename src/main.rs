//! Sente: a Go engine speaking GTP over stdio.
//!
//! ## Usage
//!
//! - `sente` - Start the GTP server (default)
//! - `sente gtp` - Start the GTP server explicitly
//! - `sente demo` - Run a short search on an empty board

use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use sente::board::{str_coord, Color, MAX_SIZE};
use sente::gtp::GtpEngine;
use sente::player::{GenMove, Player};
use sente::rules::Rules;
use sente::search::SearchConfig;

/// Sente: a Go MCTS engine
#[derive(Parser)]
#[command(name = "sente")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Board size (2-25)
    #[arg(long, default_value_t = 19)]
    size: usize,

    /// Komi
    #[arg(long, default_value_t = 7.5)]
    komi: f32,

    /// Rule set: chinese, japanese, tromp-taylor
    #[arg(long, default_value = "chinese")]
    rule: String,

    /// Random seed
    #[arg(long, default_value_t = 1)]
    srand: u64,

    /// Number of search threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Maximum simulations per move
    #[arg(long, default_value_t = 10_000)]
    max_games: u64,

    /// Maximum time per move, in seconds
    #[arg(long, default_value_t = 10.0)]
    max_time: f64,

    /// Resign when the root value drops below this
    #[arg(long, default_value_t = 0.1)]
    resign_threshold: f32,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server
    Gtp,
    /// Run a short demo search
    Demo,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !(2..=MAX_SIZE).contains(&cli.size) {
        return Err(anyhow!("board size out of range: {}", cli.size));
    }
    let mut rules = Rules::named(&cli.rule).map_err(|e| anyhow!(e))?;
    rules.komi = cli.komi;

    let config = SearchConfig {
        num_threads: cli.threads,
        seed: cli.srand,
        ..SearchConfig::default()
    };
    let mut player = Player::new(cli.size, rules, config);
    player.config.max_games = cli.max_games;
    player.config.max_time = Duration::try_from_secs_f64(cli.max_time)
        .context("invalid --max-time")?;
    player.config.resign_threshold = cli.resign_threshold;

    match cli.command {
        Some(Commands::Demo) => run_demo(player),
        Some(Commands::Gtp) | None => {
            let mut engine = GtpEngine::new(player);
            engine.run();
        }
    }
    Ok(())
}

fn run_demo(mut player: Player) {
    let size = player.board().size();
    println!("Sente demo: searching the empty {size}x{size} board\n");
    match player.genmove(Color::Black) {
        GenMove::Move(mv) => println!("Best move: {}", str_coord(mv, size)),
        GenMove::Pass => println!("Best move: pass"),
        GenMove::Resign => println!("Engine resigns"),
    }
    println!("\nTop candidates:");
    for v in player.search().move_values().iter().take(5) {
        println!(
            "  {:>4}  count {:>6}  value {:.3}",
            str_coord(v.mv, size),
            v.count,
            v.mean
        );
    }
    println!("{}", player.board());
}
