use std::collections::VecDeque;
use std::io::{self, Write};

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::agent::Agent;
use crate::config::{Config, GameConfig, TrainConfig};
use crate::error::{Result, SnakeError};
use crate::game::{Game, StepEvent};

/// Exponential epsilon decay per episode, floored at `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonSchedule {
    start: f32,
    end: f32,
    decay: f32,
}

impl EpsilonSchedule {
    /// `decay` must lie in `[0, 1]` so epsilon never grows between episodes.
    pub fn new(start: f32, end: f32, decay: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&decay) {
            return Err(SnakeError::InvalidConfig { field: "epsilon_decay", value: decay });
        }
        Ok(Self { start, end, decay })
    }

    pub fn from_config(config: &TrainConfig) -> Result<Self> {
        Self::new(config.epsilon_start, config.epsilon_end, config.epsilon_decay)
    }

    pub fn epsilon(&self, episode: usize) -> f32 {
        let exponent = episode.min(i32::MAX as usize) as i32;
        (self.start * self.decay.powi(exponent)).max(self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub episode: usize,
    pub score: u32,
    pub steps: u64,
    pub total_reward: f32,
    pub epsilon: f32,
    pub learning_rate: f32,
    pub table_size: usize,
    /// Last event of the episode, `Moved` if the step ceiling cut it short
    pub outcome: StepEvent,
}

/// Running totals handed to the per-step observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeProgress {
    pub episode: usize,
    pub step: usize,
    pub total_reward: f32,
}

/// Rolling window over recent episodes.
#[derive(Debug, Clone)]
pub struct RollingStats {
    scores: VecDeque<u32>,
    rewards: VecDeque<f32>,
    window: usize,
    episodes: usize,
    best_score: u32,
}

impl RollingStats {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            scores: VecDeque::with_capacity(window),
            rewards: VecDeque::with_capacity(window),
            window,
            episodes: 0,
            best_score: 0,
        }
    }

    pub fn record(&mut self, score: u32, reward: f32) {
        if self.scores.len() == self.window {
            self.scores.pop_front();
            self.rewards.pop_front();
        }
        self.scores.push_back(score);
        self.rewards.push_back(reward);
        self.episodes += 1;
        self.best_score = self.best_score.max(score);
    }

    pub fn mean_score(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|&s| s as f32).sum::<f32>() / self.scores.len() as f32
    }

    pub fn mean_reward(&self) -> f32 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        self.rewards.iter().sum::<f32>() / self.rewards.len() as f32
    }

    pub fn best_score(&self) -> u32 {self.best_score}
    pub fn episodes(&self) -> usize {self.episodes}
}

/// Drives episodes of one [`Game`] with one [`Agent`].
pub struct Trainer {
    game: Game,
    agent: Agent,
    schedule: EpsilonSchedule,
    stats: RollingStats,
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: &Config, seed: u64) -> Result<Self> {
        let game = Game::new(config.game.clone(), seed)?;
        let agent = Agent::new(config.agent.clone(), seed.wrapping_add(1))?;
        Self::from_parts(game, agent, config.train.clone())
    }

    pub fn from_parts(game: Game, agent: Agent, config: TrainConfig) -> Result<Self> {
        Ok(Self {
            game,
            agent,
            schedule: EpsilonSchedule::from_config(&config)?,
            stats: RollingStats::new(config.stats_window),
            config,
        })
    }

    pub fn game(&self) -> &Game {&self.game}
    pub fn agent(&self) -> &Agent {&self.agent}
    pub fn stats(&self) -> &RollingStats {&self.stats}

    pub fn into_agent(self) -> Agent {
        self.agent
    }

    /// Plays one episode, learning after every step. `observer` sees the game after each step.
    pub fn run_episode<F>(&mut self, episode: usize, mut observer: F) -> Result<EpisodeReport>
    where
        F: FnMut(&Game, &EpisodeProgress),
    {
        let epsilon = self.schedule.epsilon(episode);
        self.agent.set_exploration_rate(epsilon);
        self.game.reset();

        let mut total_reward = 0.0;
        let mut outcome = StepEvent::Moved;
        let mut step = 0;

        while !self.game.is_terminal() && step < self.config.max_steps_per_episode {
            let state = self.game.feature_vector();
            let action = self.agent.decide(&state)?;
            let result = self.game.step_outcome(action);
            let next_state = self.game.feature_vector();

            self.agent.update(&state, action, result.reward, &next_state)?;

            total_reward += result.reward;
            outcome = result.event;
            step += 1;

            observer(&self.game, &EpisodeProgress { episode, step, total_reward });
        }

        self.stats.record(self.game.score(), total_reward);

        let report = EpisodeReport {
            episode,
            score: self.game.score(),
            steps: self.game.steps(),
            total_reward,
            epsilon,
            learning_rate: self.agent.learning_rate(),
            table_size: self.agent.table().len(),
            outcome,
        };

        if self.config.log_every > 0 && (episode + 1) % self.config.log_every == 0 {
            info!(
                episode = episode + 1,
                mean_score = self.stats.mean_score(),
                mean_reward = self.stats.mean_reward(),
                best_score = self.stats.best_score(),
                epsilon,
                states = report.table_size,
                "training progress"
            );
        }

        Ok(report)
    }

    pub fn train(&mut self, episodes: usize) -> Result<Vec<EpisodeReport>> {
        (0..episodes).map(|episode| self.run_episode(episode, |_, _| {})).collect()
    }
}

/// Clears the terminal and draws one frame with an episode header.
pub fn render_frame<W: Write>(out: &mut W, game: &Game, progress: &EpisodeProgress) -> io::Result<()> {
    // clear screen, cursor home
    write!(
        out,
        "\x1b[2J\x1b[H Episode {} | Score: {} | Total Reward: {:.2}\n{}",
        progress.episode + 1,
        game.score(),
        progress.total_reward,
        game
    )?;
    out.flush()
}

/// CSV sink for [`EpisodeReport`] rows.
pub struct EpisodeLog<W: io::Write> {
    writer: csv::Writer<W>,
}

impl EpisodeLog<std::fs::File> {
    pub fn create(path: &std::path::Path) -> Result<Self> {
        Ok(Self { writer: csv::Writer::from_path(path)? })
    }
}

impl<W: io::Write> EpisodeLog<W> {
    pub fn new(inner: W) -> Self {
        Self { writer: csv::Writer::from_writer(inner) }
    }

    pub fn write(&mut self, report: &EpisodeReport) -> Result<()> {
        self.writer.serialize(report)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalSummary {
    pub episodes: usize,
    pub mean_score: f32,
    pub max_score: u32,
    pub mean_steps: f32,
}

/// Greedy rollouts in parallel. Episode `i` runs on a game seeded with `seed + i`.
pub fn evaluate(agent: &Agent, config: &GameConfig, episodes: usize, seed: u64, max_steps: usize) -> Result<EvalSummary> {
    let results: Vec<(u32, u64)> = (0..episodes)
        .into_par_iter()
        .map(|i| -> Result<(u32, u64)> {
            let mut game = Game::new(config.clone(), seed.wrapping_add(i as u64))?;
            let mut step = 0;
            while !game.is_terminal() && step < max_steps {
                let action = agent.greedy_action(&game.feature_vector())?;
                game.step(action);
                step += 1;
            }
            Ok((game.score(), game.steps()))
        })
        .collect::<Result<_>>()?;

    if results.is_empty() {
        return Ok(EvalSummary { episodes: 0, mean_score: 0.0, max_score: 0, mean_steps: 0.0 });
    }

    let n = results.len() as f32;
    Ok(EvalSummary {
        episodes: results.len(),
        mean_score: results.iter().map(|&(score, _)| score as f32).sum::<f32>() / n,
        max_score: results.iter().map(|&(score, _)| score).max().unwrap_or(0),
        mean_steps: results.iter().map(|&(_, steps)| steps as f32).sum::<f32>() / n,
    })
}
