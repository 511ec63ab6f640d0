//! Pixiv client: ranking feed, illust detail, page downloads, and the
//! source trait the selection algorithm runs against.

pub mod client;
pub mod source;
pub mod types;

pub use client::PixivClient;
pub use source::RankingSource;
pub use types::{IllustDetail, IllustPage, RankingEntry, RankingPage};
