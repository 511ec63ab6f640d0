//! Pipeline and ranking mode definitions.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which content pipeline a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Mirror a ranking page's illusts to the cloud drive (default).
    #[default]
    Mirror,
    /// Select a filtered candidate batch and record it into history.
    Digest,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineMode::Mirror => write!(f, "mirror"),
            PipelineMode::Digest => write!(f, "digest"),
        }
    }
}

/// Ranking flavors exposed by the ranking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    Daily,
    Weekly,
    #[default]
    Monthly,
    /// Needs login cookies.
    DailyR18,
    /// Needs login cookies.
    WeeklyR18,
}

impl RankingMode {
    /// The `mode` query parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMode::Daily => "daily",
            RankingMode::Weekly => "weekly",
            RankingMode::Monthly => "monthly",
            RankingMode::DailyR18 => "daily_r18",
            RankingMode::WeeklyR18 => "weekly_r18",
        }
    }

    /// Whether this flavor requires an authenticated session.
    pub fn needs_login(&self) -> bool {
        matches!(self, RankingMode::DailyR18 | RankingMode::WeeklyR18)
    }
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RankingMode::Daily),
            "weekly" => Ok(RankingMode::Weekly),
            "monthly" => Ok(RankingMode::Monthly),
            "daily_r18" => Ok(RankingMode::DailyR18),
            "weekly_r18" => Ok(RankingMode::WeeklyR18),
            _ => Err(format!("Unknown ranking mode: {}", s)),
        }
    }
}
