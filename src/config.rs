use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Grid size, reward shaping and termination thresholds for a [`crate::game::Game`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid width in cells, walls included
    pub width: i32,
    /// Grid height in cells, walls included
    pub height: i32,

    // rewards
    pub wall_reward: f32,
    pub self_collision_reward: f32,
    pub food_reward: f32,
    /// Applied every tick that neither kills nor feeds the snake
    pub step_reward: f32,
    pub closer_reward: f32,
    pub farther_reward: f32,
    /// Added on top of the tick reward when the snake starves
    pub stale_reward: f32,
    /// Returned by `step` once the game is over
    pub terminal_reward: f32,

    pub score_increment: u32,
    pub stale_base: u32,
    pub stale_per_segment: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 10,
            wall_reward: -110.0,
            self_collision_reward: -250.0,
            food_reward: 40.0,
            step_reward: -0.03,
            closer_reward: 0.2,
            farther_reward: -0.2,
            stale_reward: -4.0,
            terminal_reward: 0.0,
            score_increment: 10,
            stale_base: 100,
            stale_per_segment: 10,
        }
    }
}

impl GameConfig {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

/// Q-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f32,
    /// Floor for the cooled-down learning rate
    pub min_learning_rate: f32,
    /// 0 keeps the learning rate fixed
    pub learning_rate_decay: f32,
    pub discount: f32,
    pub exploration_rate: f32,
    /// Value every action gets in a freshly created table row
    pub initial_value: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.3,
            min_learning_rate: 0.05,
            learning_rate_decay: 0.0,
            discount: 0.95,
            exploration_rate: 0.2,
            initial_value: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub episodes: usize,
    pub max_steps_per_episode: usize,

    pub epsilon_start: f32,
    pub epsilon_end: f32,
    /// Multiplied into epsilon once per episode
    pub epsilon_decay: f32,

    /// Episodes kept for rolling averages
    pub stats_window: usize,
    pub log_every: usize,
    /// 0 disables rendering
    pub render_every: usize,
    pub render_delay_ms: u64,

    pub eval_episodes: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            max_steps_per_episode: 5_000,
            epsilon_start: 1.0,
            epsilon_end: 0.01,
            epsilon_decay: 0.995,
            stats_window: 100,
            log_every: 100,
            render_every: 0,
            render_delay_ms: 25,
            eval_episodes: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub agent: AgentConfig,
    pub train: TrainConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
