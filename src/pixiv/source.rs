//! The narrow source contract the selection algorithm consumes.

use std::path::Path;

use async_trait::async_trait;

use crate::config::RankingMode;
use crate::pixiv::client::PixivClient;
use crate::pixiv::types::{IllustDetail, RankingPage};

/// A paginated ranking source.
///
/// [`PixivClient`] is the production implementation; tests drive the
/// selector through a synthetic one.
#[async_trait]
pub trait RankingSource {
    /// One ranking page for a mode/date/page-number triple; `None` date
    /// means the newest ranking day.
    async fn ranking_page(
        &self,
        mode: RankingMode,
        date: Option<&str>,
        p: u32,
    ) -> Option<RankingPage>;

    /// Authoritative per-illust detail.
    async fn illust_detail(&self, illust_id: u64) -> Option<IllustDetail>;

    /// Download the primary content to `dest`, returning its byte size.
    async fn materialize(&self, url: &str, dest: &Path) -> Option<u64>;
}

#[async_trait]
impl RankingSource for PixivClient {
    async fn ranking_page(
        &self,
        mode: RankingMode,
        date: Option<&str>,
        p: u32,
    ) -> Option<RankingPage> {
        self.ranking(mode, date, p).await
    }

    async fn illust_detail(&self, illust_id: u64) -> Option<IllustDetail> {
        self.illust(illust_id).await
    }

    async fn materialize(&self, url: &str, dest: &Path) -> Option<u64> {
        self.download_page(url, dest).await
    }
}
