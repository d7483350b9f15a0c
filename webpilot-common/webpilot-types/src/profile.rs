use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    Speed,
    Accuracy,
    Balanced,
    Batch,
}

impl ProfileName {
    pub const ALL: [ProfileName; 4] = [
        ProfileName::Speed,
        ProfileName::Accuracy,
        ProfileName::Balanced,
        ProfileName::Batch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Accuracy => "accuracy",
            Self::Balanced => "balanced",
            Self::Batch => "batch",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache and concurrency settings selected together as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationProfile {
    pub name: ProfileName,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub max_concurrency: usize,
}
