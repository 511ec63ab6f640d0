//! Local scratch cache for downloaded content.
//!
//! Files are keyed by a stable name derived from the remote URL, and
//! presence with a non-zero size is the "skip re-download" signal. The
//! cache is write-once and unlocked; the process is single-threaded per
//! pipeline so that is sufficient.

use std::path::{Path, PathBuf};

use crate::error::Result;

pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache path for a remote URL, keyed by its last path segment.
    pub fn entry(&self, url: &str) -> PathBuf {
        self.dir.join(key_for(url))
    }

    /// Cache path under a per-item subdirectory (e.g. one folder per
    /// illust holding all of its pages).
    pub fn entry_in(&self, sub: &str, url: &str) -> PathBuf {
        self.dir.join(sub).join(key_for(url))
    }

    /// Whether `path` counts as cached (present with non-zero size).
    pub fn is_cached(path: &Path) -> bool {
        path.metadata().map(|m| m.len() > 0).unwrap_or(false)
    }
}

/// Stable filename for a URL: the last path segment, query stripped,
/// with a sanitized fallback when the URL does not parse.
fn key_for(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(name) = parsed
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|s| !s.is_empty())
        {
            return name.to_string();
        }
    }
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn key_is_last_path_segment_without_query() {
        assert_eq!(
            key_for("https://i.example/img/2021/100_p0.jpg?x=1"),
            "100_p0.jpg"
        );
    }

    #[test]
    fn unparseable_url_gets_sanitized_key() {
        assert_eq!(key_for("not a url"), "not_a_url");
    }

    #[test]
    fn cached_means_present_and_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();

        let path = cache.entry("https://i.example/a.jpg");
        assert!(!Cache::is_cached(&path));

        std::fs::File::create(&path).unwrap();
        assert!(!Cache::is_cached(&path));

        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"data").unwrap();
        assert!(Cache::is_cached(&path));
    }

    #[test]
    fn entry_in_nests_under_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        let path = cache.entry_in("100", "https://i.example/100_p0.jpg");
        assert_eq!(path, dir.path().join("100").join("100_p0.jpg"));
    }
}
