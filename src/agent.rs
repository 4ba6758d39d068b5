pub mod qtable;

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::config::AgentConfig;
use crate::error::{Result, SnakeError};
use crate::game::Action;
use qtable::{ActionValues, QTable, StateKey, best_action, max_value};

/// Tabular Q-learning agent.
///
/// Rows of the value table are created on first reference by either [`Agent::decide`]
/// or [`Agent::update`], filled with `config.initial_value`. The exploration rate is
/// set by the caller; the agent never schedules it.
pub struct Agent {
    table: QTable,
    config: AgentConfig,
    exploration_rate: f32,
    updates: u64,
    rng: StdRng,
}

impl Agent {
    pub fn new(config: AgentConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(config: AgentConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    fn with_rng(config: AgentConfig, rng: StdRng) -> Result<Self> {
        // a negative or NaN decay would let the learning rate grow without bound
        let decay = config.learning_rate_decay;
        if !(decay.is_finite() && decay >= 0.0) {
            return Err(SnakeError::InvalidConfig { field: "learning_rate_decay", value: decay });
        }

        Ok(Self {
            table: QTable::new(),
            exploration_rate: config.exploration_rate.clamp(0.0, 1.0),
            config,
            updates: 0,
            rng,
        })
    }

    pub fn config(&self) -> &AgentConfig {&self.config}
    pub fn table(&self) -> &QTable {&self.table}
    pub fn updates(&self) -> u64 {self.updates}
    pub fn exploration_rate(&self) -> f32 {self.exploration_rate}

    pub fn set_exploration_rate(&mut self, value: f32) {
        self.exploration_rate = value.clamp(0.0, 1.0);
    }

    /// Cooled-down learning rate for the next update. Never increases, never drops below the floor.
    pub fn learning_rate(&self) -> f32 {
        let cooled = self.config.learning_rate / (1.0 + self.config.learning_rate_decay * self.updates as f32);
        cooled.max(self.config.min_learning_rate)
    }

    pub fn discretize(&self, features: &[f32]) -> Result<StateKey> {
        StateKey::quantize(features)
    }

    /// Epsilon-greedy choice. Inserts the state's row if it is new.
    pub fn decide(&mut self, features: &[f32]) -> Result<Action> {
        let key = self.discretize(features)?;
        let values = *self.table.row_mut(key, self.config.initial_value);

        if self.rng.random::<f32>() < self.exploration_rate {
            Ok(Action::ALL[self.rng.random_range(0..Action::ALL.len())])
        } else {
            Ok(best_action(&values))
        }
    }

    /// Greedy choice without touching the table; unseen states use the initial row.
    pub fn greedy_action(&self, features: &[f32]) -> Result<Action> {
        Ok(best_action(&self.values(features)?))
    }

    pub fn values(&self, features: &[f32]) -> Result<ActionValues> {
        let key = self.discretize(features)?;
        Ok(self.table.get(&key).copied().unwrap_or([self.config.initial_value; 3]))
    }

    /// One Q-learning step on `(state, action, reward, next_state)`. Returns the TD error.
    pub fn update(&mut self, state: &[f32], action: Action, reward: f32, next_state: &[f32]) -> Result<f32> {
        let key = self.discretize(state)?;
        let next_key = self.discretize(next_state)?;
        let initial = self.config.initial_value;
        let alpha = self.learning_rate();

        let next_max = max_value(self.table.row_mut(next_key, initial));
        let target = reward + self.config.discount * next_max;

        let row = self.table.row_mut(key, initial);
        let old_value = row[action.index()];
        let td_error = target - old_value;
        row[action.index()] = old_value + alpha * td_error;

        self.updates += 1;
        Ok(td_error)
    }
}
