//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, PipelineMode, RankingMode};

/// Pixiv ranking mirror and digest CLI.
#[derive(Parser, Debug)]
#[command(
    name = "pixiv-mirror",
    version,
    about = "Mirror Pixiv ranking illusts to a cloud drive and pick digest candidates",
    long_about = "Mirrors a Pixiv ranking page's illustrations to an Aliyun drive account,\n\
                  or selects a filtered batch of digest candidates and records them into\n\
                  a persistent history."
)]
pub struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Pipeline to run.
    #[arg(short, long, value_enum)]
    pub pipeline: Option<PipelineMode>,

    /// Ranking flavor for this run (applies to both pipelines).
    #[arg(short, long, value_enum)]
    pub mode: Option<RankingMode>,

    /// Ranking date (yyyymmdd); defaults to the newest day.
    #[arg(long)]
    pub date: Option<String>,

    /// Number of digest candidates to select.
    #[arg(short, long)]
    pub quota: Option<usize>,

    /// Drive refresh token, overriding the config file.
    #[arg(short, long, env = "DRIVE_REFRESH_TOKEN")]
    pub refresh_token: Option<String>,

    /// Shuffle the selected digest batch.
    #[arg(long)]
    pub shuffle: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        if let Some(pipeline) = self.pipeline {
            config.pipeline = pipeline;
        }

        if let Some(mode) = self.mode {
            config.mirror.mode = mode;
            config.select.mode = mode;
        }

        if let Some(date) = self.date {
            config.mirror.date = Some(date);
        }

        if let Some(quota) = self.quota {
            config.select.quota = quota;
        }

        if let Some(token) = self.refresh_token {
            config.drive.refresh_token = token;
        }

        if self.shuffle {
            config.select.shuffle = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> Config {
        toml::from_str(
            r#"
            [drive]
            refresh_token = "tok"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn merge_overrides_only_given_fields() {
        let args = Args::parse_from(["pixiv-mirror", "--pipeline", "digest", "--quota", "5"]);
        let mut config = minimal_config();
        args.merge_into_config(&mut config);

        assert_eq!(config.pipeline, PipelineMode::Digest);
        assert_eq!(config.select.quota, 5);
        assert_eq!(config.drive.refresh_token, "tok");
        assert_eq!(config.select.mode, RankingMode::Monthly);
    }

    #[test]
    fn mode_applies_to_both_pipelines() {
        let args = Args::parse_from(["pixiv-mirror", "--mode", "daily"]);
        let mut config = minimal_config();
        args.merge_into_config(&mut config);

        assert_eq!(config.mirror.mode, RankingMode::Daily);
        assert_eq!(config.select.mode, RankingMode::Daily);
    }
}
