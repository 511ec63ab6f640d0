//! Pixiv API response types.
//!
//! The ranking endpoint (`ranking.php?format=json`) predates the ajax
//! API and has some quirks: page counts arrive as strings, and the
//! previous/next date cursors are either a `yyyymmdd` string or the
//! JSON literal `false`. Both are absorbed in deserializers here so the
//! rest of the crate sees plain typed fields.

use serde::{Deserialize, Deserializer};

/// One page of ranked entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingPage {
    #[serde(default)]
    pub contents: Vec<RankingEntry>,
    #[serde(default)]
    pub date: String,
    /// Cursor to the previous (older) ranking day, if any.
    #[serde(default, deserialize_with = "de_cursor")]
    pub prev_date: Option<String>,
    #[serde(default, deserialize_with = "de_cursor")]
    pub next_date: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub rank_total: u32,
}

/// A single ranked listing entry (cheap fields only; authoritative
/// per-illust data comes from [`IllustDetail`]).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingEntry {
    pub illust_id: u64,
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub illust_page_count: u32,
    #[serde(default)]
    pub illust_content_type: ContentType,
    /// Ordinal rating level; only some listing variants carry it.
    #[serde(default)]
    pub sl: Option<u32>,
}

/// Content-rating flags attached to a listing entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentType {
    #[serde(default)]
    pub sexual: u32,
    #[serde(default)]
    pub violent: bool,
    #[serde(default)]
    pub grotesque: bool,
}

/// Illust detail from the ajax endpoint. Detail-level rating data is
/// authoritative over the listing entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustDetail {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "de_id")]
    pub user_id: u64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub urls: IllustUrls,
    /// Ordinal rating level.
    #[serde(default)]
    pub sl: Option<u32>,
    /// 0 all-age, 1 R-18, 2 R-18G.
    #[serde(default)]
    pub x_restrict: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IllustUrls {
    #[serde(default)]
    pub original: Option<String>,
}

/// One page of a (possibly multi-page) illust.
#[derive(Debug, Clone, Deserialize)]
pub struct IllustPage {
    pub urls: PageUrls,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageUrls {
    pub original: String,
}

/// Ajax envelope: `{"error": bool, "message": …, "body": T}`.
#[derive(Debug, Deserialize)]
pub struct AjaxEnvelope<T> {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    pub body: Option<T>,
}

/// Cursor fields are a date string or the literal `false`.
fn de_cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Date(String),
        Missing(bool),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Date(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Counts arrive as numbers or numeric strings depending on endpoint.
fn de_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Ids are numbers in the ranking feed but strings in the ajax API.
fn de_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
