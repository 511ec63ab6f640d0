//! Pixiv ranking mirror and digest selection.
//!
//! Two pipelines over the same resilient HTTP layer:
//!
//! - **Mirror**: walk a Pixiv ranking page and copy every illust (all
//!   pages) into an Aliyun drive account, using rapid upload where the
//!   server already holds the bytes.
//! - **Digest**: walk rankings backward in time, filter entries through
//!   exclusion predicates (history, blacklists, rating, page count) and
//!   collect a fixed-size candidate batch with content cached locally.
//!
//! All remote reads go through [`transport::Transport`], which turns
//! transport-level failures into sentinel responses, paired with
//! [`retry::RetryPolicy`] for retry-until-non-empty semantics.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use pixiv_mirror::{Config, PixivClient};
//! use pixiv_mirror::transport::Transport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let transport = Transport::new(&PixivClient::transport_config())?;
//!     let pixiv = PixivClient::new(transport, config.retry_policy());
//!
//!     let page = pixiv.ranking(config.mirror.mode, None, 1).await;
//!     println!("{} entries", page.map(|p| p.contents.len()).unwrap_or(0));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod history;
pub mod mirror;
pub mod pixiv;
pub mod retry;
pub mod select;
pub mod transport;

// Re-exports for convenience
pub use cache::Cache;
pub use config::{Config, PipelineMode, RankingMode};
pub use drive::{CheckNameMode, DriveClient, UploadOutcome};
pub use error::{Error, Result};
pub use history::History;
pub use mirror::Mirror;
pub use pixiv::PixivClient;
pub use select::{select, Candidate, SelectOptions};
