//! Paginated candidate selection.
//!
//! Walks a ranking source backward in time, applies the exclusion
//! predicates, and accumulates validated candidates (with their content
//! materialized into the local cache) until the quota is met or the
//! source is exhausted. A page cap bounds the loop against an empty or
//! hostile upstream.

use std::collections::HashSet;
use std::path::PathBuf;

use rand::seq::SliceRandom;

use crate::cache::Cache;
use crate::config::RankingMode;
use crate::pixiv::source::RankingSource;
use crate::pixiv::types::{IllustDetail, RankingEntry};

/// Default bound on a single item's content size (19 MiB).
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 19 * 1024 * 1024;

/// Selection parameters for one run.
#[derive(Debug, Clone)]
pub struct SelectOptions {
    /// Target count of accepted candidates.
    pub quota: usize,
    pub mode: RankingMode,
    /// Ids already posted/uploaded; never re-accepted.
    pub history: HashSet<u64>,
    /// Owner ids excluded outright.
    pub user_blacklist: HashSet<u64>,
    /// Tags excluded outright (any intersection rejects).
    pub tag_blacklist: HashSet<String>,
    /// Accept only items whose rating level is strictly below this.
    /// The scale is undocumented upstream; configure, don't infer.
    pub rating_threshold: u32,
    /// Exact page count required, when set (commonly 1).
    pub required_page_count: Option<u32>,
    /// Hard bound on ranking pages examined in one run.
    pub max_pages: u32,
    /// Items with larger content are skipped, not accepted.
    pub max_content_bytes: u64,
    /// Shuffle the accepted order before returning (cosmetic).
    pub shuffle: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            quota: 9,
            mode: RankingMode::Monthly,
            history: HashSet::new(),
            user_blacklist: HashSet::new(),
            tag_blacklist: HashSet::new(),
            rating_threshold: 4,
            required_page_count: Some(1),
            max_pages: 30,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            shuffle: false,
        }
    }
}

/// An accepted item with its content cached locally.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub illust_id: u64,
    pub user_id: u64,
    pub user_name: String,
    pub url: String,
    pub local_path: PathBuf,
}

/// Run one selection pass against `source`.
pub async fn select<S: RankingSource + Sync>(
    source: &S,
    cache: &Cache,
    opts: &SelectOptions,
) -> Vec<Candidate> {
    let mut accepted: Vec<Candidate> = Vec::new();
    // Every id ever looked at this run, accepted or not, so a flaky
    // detail fetch cannot cause endless re-fetching of the same id.
    let mut examined: HashSet<u64> = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched: u32 = 0;

    'pages: while accepted.len() < opts.quota && pages_fetched < opts.max_pages {
        // Two page fetches of the same ranking day, merged before
        // filtering. Both are read-only and independent.
        let (first, second) = tokio::join!(
            source.ranking_page(opts.mode, cursor.as_deref(), 1),
            source.ranking_page(opts.mode, cursor.as_deref(), 2),
        );
        pages_fetched += 2;

        let mut prev_cursor: Option<String> = None;
        let mut entries: Vec<RankingEntry> = Vec::new();
        for page in [first, second].into_iter().flatten() {
            if prev_cursor.is_none() {
                prev_cursor = page.prev_date.clone();
            }
            entries.extend(page.contents);
        }

        if entries.is_empty() {
            tracing::warn!("select: no ranking entries at cursor {:?}", cursor);
            break;
        }

        for entry in entries {
            if accepted.len() >= opts.quota {
                break 'pages;
            }
            if !examined.insert(entry.illust_id) {
                continue;
            }
            if !passes_listing(&entry, opts) {
                continue;
            }

            let Some(detail) = source.illust_detail(entry.illust_id).await else {
                continue;
            };
            if !passes_detail(&detail, opts) {
                continue;
            }
            let Some(url) = detail.urls.original else {
                continue;
            };

            let dest = cache.entry(&url);
            let Some(size) = source.materialize(&url, &dest).await else {
                tracing::warn!("select: failed to materialize illust {}", entry.illust_id);
                continue;
            };
            if size > opts.max_content_bytes {
                tracing::info!(
                    "select: illust {} content too large ({} bytes), skipped",
                    entry.illust_id,
                    size
                );
                continue;
            }

            accepted.push(Candidate {
                illust_id: detail.id,
                user_id: detail.user_id,
                user_name: detail.user_name,
                url,
                local_path: dest,
            });
        }

        match prev_cursor {
            Some(prev) => cursor = Some(prev),
            None => break,
        }
    }

    if accepted.len() < opts.quota {
        tracing::warn!(
            "select: quota not met ({}/{} after {} pages)",
            accepted.len(),
            opts.quota,
            pages_fetched
        );
    }

    if opts.shuffle {
        accepted.shuffle(&mut rand::thread_rng());
    }
    accepted
}

/// Cheap listing-level predicates, applied before any detail lookup.
fn passes_listing(entry: &RankingEntry, opts: &SelectOptions) -> bool {
    if opts.history.contains(&entry.illust_id) {
        return false;
    }
    if opts.user_blacklist.contains(&entry.user_id) {
        return false;
    }
    if entry.tags.iter().any(|t| opts.tag_blacklist.contains(t)) {
        return false;
    }
    let rating_ok = match entry.sl {
        Some(sl) => sl < opts.rating_threshold,
        None => entry.illust_content_type.sexual == 0,
    };
    if !rating_ok {
        return false;
    }
    if let Some(required) = opts.required_page_count {
        if entry.illust_page_count != required {
            return false;
        }
    }
    true
}

/// Detail-level re-checks; listing and detail ratings can disagree and
/// the detail is authoritative.
fn passes_detail(detail: &IllustDetail, opts: &SelectOptions) -> bool {
    if opts.user_blacklist.contains(&detail.user_id) {
        return false;
    }
    let rating_ok = match detail.sl {
        Some(sl) => sl < opts.rating_threshold,
        None => detail.x_restrict == 0,
    };
    if !rating_ok {
        return false;
    }
    if let Some(required) = opts.required_page_count {
        if detail.page_count != required {
            return false;
        }
    }
    true
}
