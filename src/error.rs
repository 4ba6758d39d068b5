use std::io;

#[derive(thiserror::Error, Debug)]
pub enum SnakeError {
    #[error("grid {width}x{height} is too small, need at least two interior cells")]
    InvalidGrid { width: i32, height: i32 },
    #[error("config field `{field}` has invalid value {value}")]
    InvalidConfig { field: &'static str, value: f32 },
    #[error("feature vector has {found} values, expected {expected}")]
    FeatureLength { expected: usize, found: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SnakeError>;
