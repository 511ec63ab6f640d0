//! Mirror pipeline: copy ranking illusts to the cloud drive.
//!
//! Drive layout is one folder per artist under the configured root,
//! holding every mirrored page plus an empty marker folder named after
//! the artist so the numeric folder ids stay browsable:
//!
//! ```text
//! <root>/<user_id>/<user_name>/      (marker)
//! <root>/<user_id>/<id>_p0.png
//! ```

use crate::cache::Cache;
use crate::config::RankingMode;
use crate::drive::{CheckNameMode, DriveClient};
use crate::pixiv::PixivClient;

pub struct Mirror {
    drive: DriveClient,
    pixiv: PixivClient,
    cache: Cache,
    root: String,
}

impl Mirror {
    pub fn new(drive: DriveClient, pixiv: PixivClient, cache: Cache, root: &str) -> Self {
        Self {
            drive,
            pixiv,
            cache,
            root: root.trim_matches('/').to_string(),
        }
    }

    /// The drive client, for callers that persist its rotated token.
    pub fn drive(&self) -> &DriveClient {
        &self.drive
    }

    /// Mirror every page of one illust. Returns false when the detail
    /// fetch fails or any page could not be brought to the drive.
    pub async fn upload_illust(&self, illust_id: u64) -> bool {
        let Some(detail) = self.pixiv.illust(illust_id).await else {
            tracing::error!("mirror: no detail for illust {}", illust_id);
            return false;
        };

        let user_folder = format!("{}/{}", self.root, detail.user_id);
        let marker = format!("{}/{}", user_folder, sanitize_component(&detail.user_name));
        if !self.drive.create_folder(&marker).await {
            tracing::warn!("mirror: marker folder for {} not created", detail.user_id);
        }

        let Some(pages) = self.pixiv.illust_pages(illust_id).await else {
            tracing::error!("mirror: no page list for illust {}", illust_id);
            return false;
        };

        let mut failed = 0usize;
        for page in &pages {
            if !self
                .upload_page(illust_id, &user_folder, &page.urls.original)
                .await
            {
                failed += 1;
            }
        }

        if failed > 0 {
            tracing::warn!(
                "mirror: illust {}: {}/{} pages failed",
                illust_id,
                failed,
                pages.len()
            );
            return false;
        }
        tracing::info!("mirror: illust {} done ({} pages)", illust_id, pages.len());
        true
    }

    async fn upload_page(&self, illust_id: u64, user_folder: &str, url: &str) -> bool {
        let local = self.cache.entry_in(&illust_id.to_string(), url);
        if self.pixiv.download_page(url, &local).await.is_none() {
            return false;
        }

        let Some(name) = local.file_name().and_then(|n| n.to_str()) else {
            tracing::error!("mirror: unusable cache name for {}", url);
            return false;
        };
        let dest = format!("{}/{}", user_folder, name);
        self.drive
            .upload_file(&dest, &local, CheckNameMode::Overwrite, true)
            .await
            .is_some()
    }

    /// Mirror the first ranking page of `mode` at `date` (newest day
    /// when `None`). Failures are per-illust and do not stop the walk;
    /// returns false when the listing itself failed or any illust did.
    pub async fn mirror_ranking(&self, mode: RankingMode, date: Option<&str>) -> bool {
        let Some(page) = self.pixiv.ranking(mode, date, 1).await else {
            tracing::error!("mirror: ranking {} fetch failed", mode);
            return false;
        };
        tracing::info!(
            "mirror: ranking {} {} with {} entries",
            mode,
            page.date,
            page.contents.len()
        );

        let mut failed = 0usize;
        for entry in &page.contents {
            if !self.upload_illust(entry.illust_id).await {
                failed += 1;
            }
        }

        if failed > 0 {
            tracing::warn!("mirror: {}/{} illusts failed", failed, page.contents.len());
        }
        failed == 0
    }
}

/// Make a user-supplied name safe as a single drive path segment.
fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
