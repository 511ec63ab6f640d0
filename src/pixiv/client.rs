//! Pixiv HTTP client (ranking feed, illust detail, page downloads).

use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};

use crate::config::RankingMode;
use crate::error::{Error, Result};
use crate::pixiv::types::{AjaxEnvelope, IllustDetail, IllustPage, RankingPage};
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportConfig};

/// Pixiv web base URL (also sent as Referer on every request).
pub const WWW_BASE: &str = "https://www.pixiv.net";

/// Ranking content category used by the pipelines.
const RANKING_CONTENT: &str = "illust";

/// Pixiv client over the resilient transport.
///
/// Works without login; some rankings (r18 modes) need cookies.
pub struct PixivClient {
    transport: Transport,
    retry: RetryPolicy,
}

impl PixivClient {
    /// Transport configuration suitable for Pixiv: the image CDN
    /// rejects requests without the site Referer.
    pub fn transport_config() -> TransportConfig {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(WWW_BASE));
        TransportConfig {
            default_headers: headers,
            ..Default::default()
        }
    }

    pub fn new(transport: Transport, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Attach browser cookies for authenticated endpoints.
    pub async fn login_with_cookies(&self, cookie_header: &str) -> bool {
        match HeaderValue::from_str(cookie_header) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.transport.set_header(COOKIE, value).await;
                true
            }
            Err(_) => {
                tracing::error!("pixiv: cookie string not usable as a header value");
                false
            }
        }
    }

    /// Password login needs a captcha flow this tool does not implement.
    pub fn login_with_password(&self, _username: &str, _password: &str) -> Result<()> {
        Err(Error::NotSupported(
            "pixiv password login; use browser cookies".into(),
        ))
    }

    /// Fetch one ranking page (50 entries per page).
    ///
    /// `date` of `None` means the newest ranking day; the returned
    /// page's `prev_date` is the cursor to walk backward in time.
    pub async fn ranking(
        &self,
        mode: RankingMode,
        date: Option<&str>,
        p: u32,
    ) -> Option<RankingPage> {
        let url = format!("{}/ranking.php", WWW_BASE);
        self.retry
            .run("pixiv ranking", || async {
                let mut query = vec![
                    ("format", "json".to_string()),
                    ("p", p.to_string()),
                    ("content", RANKING_CONTENT.to_string()),
                    ("mode", mode.as_str().to_string()),
                ];
                if let Some(date) = date {
                    query.push(("date", date.to_string()));
                }

                let res = self.transport.get(&url, &query).await;
                if !res.ok() {
                    return None;
                }

                // The php endpoint signals failure with a flat
                // `{"error": …}` object instead of an envelope.
                let value: serde_json::Value = res.json()?;
                if let Some(error) = value.get("error") {
                    tracing::error!("{}: {}", res.url(), error);
                    return None;
                }
                match serde_json::from_value(value) {
                    Ok(page) => Some(page),
                    Err(e) => {
                        tracing::error!("{}: unexpected ranking shape: {}", res.url(), e);
                        None
                    }
                }
            })
            .await
    }

    /// Fetch illust detail (authoritative rating and page count).
    pub async fn illust(&self, illust_id: u64) -> Option<IllustDetail> {
        let url = format!("{}/ajax/illust/{}", WWW_BASE, illust_id);
        self.retry
            .run("pixiv illust detail", || async {
                let res = self.transport.get(&url, &[]).await;
                check_ajax(&res)
            })
            .await
    }

    /// Fetch the page list of a (possibly multi-page) illust.
    pub async fn illust_pages(&self, illust_id: u64) -> Option<Vec<IllustPage>> {
        let url = format!("{}/ajax/illust/{}/pages", WWW_BASE, illust_id);
        let res = self.transport.get(&url, &[]).await;
        check_ajax(&res)
    }

    /// Download one content page to `dest`, returning the byte size.
    ///
    /// A present, non-zero-sized `dest` counts as already downloaded and
    /// is not re-fetched.
    pub async fn download_page(&self, page_url: &str, dest: &Path) -> Option<u64> {
        if let Ok(meta) = dest.metadata() {
            if meta.len() > 0 {
                tracing::info!("pixiv: {} already cached, skip download", dest.display());
                return Some(meta.len());
            }
        }

        let data = self
            .retry
            .run("pixiv page download", || async {
                let res = self.transport.get(page_url, &[]).await;
                if !res.ok() {
                    tracing::error!("pixiv: failed to get page {}", page_url);
                    return Vec::new();
                }
                res.into_bytes()
            })
            .await;
        if data.is_empty() {
            return None;
        }

        if let Some(parent) = dest.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("pixiv: creating {}: {}", parent.display(), e);
                return None;
            }
        }
        let len = data.len() as u64;
        match std::fs::write(dest, data) {
            Ok(()) => Some(len),
            Err(e) => {
                tracing::error!("pixiv: writing {}: {}", dest.display(), e);
                None
            }
        }
    }
}

/// Unwrap the ajax `{error, message, body}` envelope, logging the URL
/// and server message on failure.
fn check_ajax<T: serde::de::DeserializeOwned>(res: &crate::transport::RawResponse) -> Option<T> {
    if res.status().is_none() {
        return None;
    }
    let envelope: AjaxEnvelope<T> = res.json()?;
    if envelope.error {
        tracing::error!("{}: {}", res.url(), envelope.message);
        return None;
    }
    envelope.body
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn client() -> PixivClient {
        let transport = Transport::new(&PixivClient::transport_config()).unwrap();
        PixivClient::new(transport, RetryPolicy::new(0, Duration::from_millis(1)))
    }

    #[test]
    fn password_login_is_not_supported() {
        let err = client().login_with_password("user", "pass").unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn cached_page_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("100_p0.jpg");
        let mut f = std::fs::File::create(&dest).unwrap();
        f.write_all(b"cached bytes").unwrap();

        // An unroutable URL would fail if a fetch were attempted.
        let size = client()
            .download_page("https://0.0.0.0/100_p0.jpg", &dest)
            .await;
        assert_eq!(size, Some(12));
    }

    #[test]
    fn transport_config_carries_referer() {
        let config = PixivClient::transport_config();
        assert_eq!(
            config.default_headers.get(REFERER).unwrap(),
            &HeaderValue::from_static(WWW_BASE)
        );
    }
}
