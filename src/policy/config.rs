use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How the controller treats states it has already expanded.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CycleHandling {
    /// Never move to an already expanded state; may end in a dead end.
    #[default]
    Avoid,
    /// Stop as soon as an already expanded state is reached again.
    Detect,
}

/// Per-run search parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of actions in a trace.
    pub max_length: usize,
    pub cycles: CycleHandling,
    /// Added to the value of every candidate the scorer classifies as unsolvable.
    pub unsolvable_weight: f32,
    /// Optional wall-clock budget, checked before every step.
    pub time_limit_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_length: 500,
            cycles: CycleHandling::default(),
            unsolvable_weight: 100_000.0,
            time_limit_ms: None,
        }
    }
}
