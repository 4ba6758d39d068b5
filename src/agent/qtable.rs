use std::collections::HashMap;
use std::io;

use crate::error::{Result, SnakeError};
use crate::game::{Action, FEATURE_LEN};

/// Quantisation steps per unit of a feature value.
pub const QUANT_LEVELS: f32 = 100.0;

pub type ActionValues = [f32; 3];

/// Discretized feature vector used as the table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey([u8; FEATURE_LEN]);

impl StateKey {
    /// Clamps every value to `[0, 1]` and rounds it to `1 / QUANT_LEVELS`. NaN maps to 0.
    pub fn quantize(features: &[f32]) -> Result<Self> {
        if features.len() != FEATURE_LEN {
            return Err(SnakeError::FeatureLength { expected: FEATURE_LEN, found: features.len() });
        }

        let mut key = [0u8; FEATURE_LEN];
        for (slot, &value) in key.iter_mut().zip(features) {
            // `as u8` saturates and sends NaN to 0
            *slot = (value.clamp(0.0, 1.0) * QUANT_LEVELS).round() as u8;
        }
        Ok(Self(key))
    }

    pub fn levels(&self) -> &[u8; FEATURE_LEN] {
        &self.0
    }
}

/// First maximum wins, so ties resolve towards `TurnLeft`.
pub fn best_action(values: &ActionValues) -> Action {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    Action::ALL[best]
}

pub fn max_value(values: &ActionValues) -> f32 {
    values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
}

#[derive(Debug, Clone, Default)]
pub struct QTable {
    rows: HashMap<StateKey, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &StateKey) -> Option<&ActionValues> {
        self.rows.get(key)
    }

    /// Returns the row for `key`, inserting `[initial; 3]` if it was never seen.
    pub fn row_mut(&mut self, key: StateKey, initial: f32) -> &mut ActionValues {
        self.rows.entry(key).or_insert([initial; 3])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.rows.iter()
    }

    /// One CSV row per state in key order: the feature levels, then the value of each action.
    pub fn write_csv<W: io::Write>(&self, out: W) -> Result<()> {
        let mut rows: Vec<_> = self.iter().collect();
        rows.sort_by_key(|&(key, _)| *key);

        let mut writer = csv::Writer::from_writer(out);
        let header = (0..FEATURE_LEN)
            .map(|i| format!("f{i}"))
            .chain(["turn_left", "straight", "turn_right"].map(String::from));
        writer.write_record(header)?;

        for (key, values) in rows {
            let levels = key.levels().iter().map(|level| level.to_string());
            writer.write_record(levels.chain(values.iter().map(|v| v.to_string())))?;
        }
        writer.flush()?;
        Ok(())
    }
}
