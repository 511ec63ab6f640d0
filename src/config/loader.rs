//! Configuration structures and loading logic.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::modes::{PipelineMode, RankingMode};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::select::SelectOptions;
use crate::transport::TransportConfig;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline executed by this run.
    #[serde(default)]
    pub pipeline: PipelineMode,

    #[serde(default)]
    pub transport: TransportSection,

    pub drive: DriveSection,

    #[serde(default)]
    pub pixiv: PixivSection,

    #[serde(default)]
    pub select: SelectSection,

    #[serde(default)]
    pub mirror: MirrorSection,

    #[serde(default)]
    pub cache: CacheSection,
}

/// Transport pacing/timeout and retry settings, shared by both clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSection {
    /// Pacing sleep before every request, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a first empty result.
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    /// Sleep between retry attempts, in seconds.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

/// Drive account configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSection {
    /// Refresh token used to log in; rotated by the server, so callers
    /// should persist the new value after a run.
    pub refresh_token: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// Pixiv session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PixivSection {
    /// Browser cookie header; without it some rankings are restricted.
    #[serde(default)]
    pub cookies: Option<String>,
}

/// Candidate selection settings for the digest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectSection {
    #[serde(default = "default_quota")]
    pub quota: usize,

    #[serde(default)]
    pub mode: RankingMode,

    /// Accept only items rated strictly below this level.
    #[serde(default = "default_rating_threshold")]
    pub rating_threshold: u32,

    /// Exact page count an item must have; unset disables the check.
    #[serde(default = "default_required_page_count")]
    pub required_page_count: Option<u32>,

    /// Hard bound on ranking pages examined per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-item content size bound, in MiB.
    #[serde(default = "default_max_content_mib")]
    pub max_content_mib: u64,

    #[serde(default)]
    pub shuffle: bool,

    /// Owner ids excluded from selection.
    #[serde(default)]
    pub user_blacklist: Vec<u64>,

    /// Tags excluded from selection.
    #[serde(default)]
    pub tag_blacklist: Vec<String>,

    /// Accepted-id history blob location.
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

/// Mirror pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSection {
    /// Drive-relative root directory for mirrored illusts.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    #[serde(default)]
    pub mode: RankingMode,

    /// Ranking date (`yyyymmdd`); unset means the newest day.
    #[serde(default)]
    pub date: Option<String>,
}

/// Scratch cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for DriveSection {
    fn default() -> Self {
        Self {
            refresh_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineMode::default(),
            transport: TransportSection::default(),
            drive: DriveSection::default(),
            pixiv: PixivSection::default(),
            select: SelectSection::default(),
            mirror: MirrorSection::default(),
            cache: CacheSection::default(),
        }
    }
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
            retry_times: default_retry_times(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

impl Default for SelectSection {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            mode: RankingMode::default(),
            rating_threshold: default_rating_threshold(),
            required_page_count: default_required_page_count(),
            max_pages: default_max_pages(),
            max_content_mib: default_max_content_mib(),
            shuffle: false,
            user_blacklist: Vec::new(),
            tag_blacklist: Vec::new(),
            history_file: default_history_file(),
        }
    }
}

impl Default for MirrorSection {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            mode: RankingMode::default(),
            date: None,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_interval_ms() -> u64 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_times() -> u32 {
    3
}

fn default_retry_interval_secs() -> u64 {
    1
}

fn default_api_base() -> String {
    crate::drive::client::DEFAULT_API_BASE.to_string()
}

fn default_quota() -> usize {
    9
}

fn default_rating_threshold() -> u32 {
    4
}

fn default_required_page_count() -> Option<u32> {
    Some(1)
}

fn default_max_pages() -> u32 {
    30
}

fn default_max_content_mib() -> u64 {
    19
}

fn default_history_file() -> PathBuf {
    PathBuf::from("digest_history.json")
}

fn default_root_dir() -> String {
    "pixiv".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("tmp")
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                ))
            } else {
                Error::Config(format!("Cannot read {}: {}", path.display(), e))
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file (used to persist the rotated
    /// refresh token after a run).
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Transport configuration derived from the `[transport]` section.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            interval: Duration::from_millis(self.transport.interval_ms),
            timeout: Duration::from_secs(self.transport.timeout_secs),
            ..Default::default()
        }
    }

    /// Retry policy derived from the `[transport]` section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.transport.retry_times,
            Duration::from_secs(self.transport.retry_interval_secs),
        )
    }

    /// Selection options, merging the `[select]` section with the
    /// caller-loaded history set.
    pub fn select_options(&self, history: HashSet<u64>) -> SelectOptions {
        SelectOptions {
            quota: self.select.quota,
            mode: self.select.mode,
            history,
            user_blacklist: self.select.user_blacklist.iter().copied().collect(),
            tag_blacklist: self.select.tag_blacklist.iter().cloned().collect(),
            rating_threshold: self.select.rating_threshold,
            required_page_count: self.select.required_page_count,
            max_pages: self.select.max_pages,
            max_content_bytes: self.select.max_content_mib * 1024 * 1024,
            shuffle: self.select.shuffle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [drive]
            refresh_token = "tok"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline, PipelineMode::Mirror);
        assert_eq!(config.transport.interval_ms, 100);
        assert_eq!(config.select.quota, 9);
        assert_eq!(config.select.rating_threshold, 4);
        assert_eq!(config.select.required_page_count, Some(1));
        assert_eq!(config.mirror.root_dir, "pixiv");
        assert_eq!(config.cache.dir, PathBuf::from("tmp"));
    }

    #[test]
    fn select_options_convert_units_and_sets() {
        let config: Config = toml::from_str(
            r#"
            [drive]
            refresh_token = "tok"

            [select]
            quota = 3
            max_content_mib = 2
            user_blacklist = [7, 8]
            tag_blacklist = ["ai"]
            "#,
        )
        .unwrap();

        let opts = config.select_options([1].into());
        assert_eq!(opts.quota, 3);
        assert_eq!(opts.max_content_bytes, 2 * 1024 * 1024);
        assert!(opts.user_blacklist.contains(&7));
        assert!(opts.tag_blacklist.contains("ai"));
        assert!(opts.history.contains(&1));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "pipeline = [").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        // Reading a directory as a file fails with a non-NotFound kind.
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn modes_parse_from_toml_strings() {
        let config: Config = toml::from_str(
            r#"
            pipeline = "digest"

            [drive]
            refresh_token = "tok"

            [mirror]
            mode = "daily_r18"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline, PipelineMode::Digest);
        assert_eq!(config.mirror.mode, RankingMode::DailyR18);
    }
}
