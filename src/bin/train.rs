use std::fs::File;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use snakeq::{Config, EpisodeLog, Trainer, evaluate, render_frame};

#[derive(Parser)]
#[command(name = "train")]
#[command(version, about = "Train a Q-learning agent to play snake")]
struct Cli {
    /// JSON config file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    episodes: Option<usize>,

    #[arg(long)]
    width: Option<i32>,

    #[arg(long)]
    height: Option<i32>,

    /// Seed for the game and agent; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Draw every Nth episode in the terminal (0 = never)
    #[arg(long)]
    render_every: Option<usize>,

    /// Write one CSV row per episode
    #[arg(long)]
    log_csv: Option<PathBuf>,

    /// Write the learned value table as CSV after training
    #[arg(long)]
    dump_table: Option<PathBuf>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = "snakeq=info".parse() {
        filter = filter.add_directive(d);
    }
    fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(episodes) = cli.episodes {
        config.train.episodes = episodes;
    }
    if let Some(width) = cli.width {
        config.game.width = width;
    }
    if let Some(height) = cli.height {
        config.game.height = height;
    }
    if let Some(render_every) = cli.render_every {
        config.train.render_every = render_every;
    }

    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(seed, width = config.game.width, height = config.game.height, episodes = config.train.episodes, "starting training");

    let mut trainer = Trainer::new(&config, seed).context("failed to build trainer")?;
    let mut log = match &cli.log_csv {
        Some(path) => Some(EpisodeLog::create(path).with_context(|| format!("failed to create {}", path.display()))?),
        None => None,
    };

    let render_every = config.train.render_every;
    let delay = Duration::from_millis(config.train.render_delay_ms);
    let last = config.train.episodes.saturating_sub(1);

    for episode in 0..config.train.episodes {
        let render = render_every > 0 && (episode == 0 || (episode + 1) % render_every == 0 || episode == last);

        let report = trainer.run_episode(episode, |game, progress| {
            if render {
                if let Err(e) = render_frame(&mut std::io::stdout().lock(), game, progress) {
                    warn!(error = %e, "failed to draw frame");
                }
                thread::sleep(delay);
            }
        })?;

        if let Some(log) = log.as_mut() {
            log.write(&report)?;
        }
    }

    if let Some(log) = log {
        log.finish()?;
    }

    let stats = trainer.stats();
    info!(
        episodes = stats.episodes(),
        best_score = stats.best_score(),
        mean_score = stats.mean_score(),
        "training complete"
    );

    let agent = trainer.into_agent();
    if let Some(path) = &cli.dump_table {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        agent.table().write_csv(file)?;
        info!(states = agent.table().len(), path = %path.display(), "wrote value table");
    }

    if config.train.eval_episodes > 0 {
        let summary = evaluate(
            &agent,
            &config.game,
            config.train.eval_episodes,
            seed.wrapping_add(1_000_000),
            config.train.max_steps_per_episode,
        )?;
        info!(
            episodes = summary.episodes,
            mean_score = summary.mean_score,
            max_score = summary.max_score,
            mean_steps = summary.mean_steps,
            states = agent.table().len(),
            "greedy evaluation"
        );
    }

    Ok(())
}
