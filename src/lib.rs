pub mod error;
pub mod config;

pub use error::{Result, SnakeError};
pub use config::{AgentConfig, Config, GameConfig, TrainConfig};

pub mod game;

pub use game::{
    Action,
    Direction,
    Game,
    Point,
    Snake,
    StepEvent,
    StepOutcome,
    turn,
};

pub mod agent;

pub use agent::Agent;
pub use agent::qtable::{QTable, StateKey};

pub mod train;

pub use train::{
    EpisodeLog,
    EpisodeProgress,
    EpisodeReport,
    EpsilonSchedule,
    EvalSummary,
    RollingStats,
    Trainer,
    evaluate,
    render_frame,
};
