//! Scraped record types shared by the crawler, the JSON cache and the loader.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Author name recorded when the forum no longer reports one.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// A post (submission) as written to `posts.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Base-36 forum identifier
    pub id: String,

    pub title: String,

    pub author: String,

    /// Creation time in epoch seconds (UTC)
    pub created_utc: i64,

    pub score: i64,

    /// Listing view the post was first discovered under
    pub listing: String,

    #[serde(default)]
    pub num_comments: i64,

    #[serde(default)]
    pub selftext: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub permalink: String,

    /// Last edit time in epoch seconds, if ever edited
    #[serde(default)]
    pub edited: Option<i64>,
}

/// A comment as written to `comments.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,

    /// Identifier of the post the comment belongs to
    pub post_id: String,

    pub author: String,

    pub created_utc: i64,

    pub score: i64,

    pub body: String,

    /// Fullname of the direct parent (`t3_*` for top level, `t1_*` for replies)
    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub permalink: String,

    #[serde(default)]
    pub edited: Option<i64>,
}

/// Anything with a unique identifier within its content kind.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Post {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Comment {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Which kind of record a crawl or load works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Posts,
    Comments,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Posts => "posts",
            ContentKind::Comments => "comments",
        }
    }

    /// File name of the JSON cache for this kind.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "posts" | "post" => Ok(ContentKind::Posts),
            "comments" | "comment" => Ok(ContentKind::Comments),
            other => Err(AppError::validation(format!(
                "unknown content kind '{other}' (expected posts or comments)"
            ))),
        }
    }
}

/// Time window accepted by the `top` and `controversial` listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl FromStr for TimeFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hour" => Ok(TimeFilter::Hour),
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "year" => Ok(TimeFilter::Year),
            "all" => Ok(TimeFilter::All),
            other => Err(AppError::validation(format!("unknown time filter '{other}'"))),
        }
    }
}

/// A named feed of the forum used to discover posts.
///
/// Written in config as `new`, `hot`, `rising`, `top:<window>`,
/// `controversial:<window>` or `search:<query>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ListingView {
    New,
    Hot,
    Rising,
    Top(TimeFilter),
    Controversial(TimeFilter),
    Search(String),
}

impl ListingView {
    /// API path below `/r/<forum>/`.
    pub fn path(&self) -> &'static str {
        match self {
            ListingView::New => "new",
            ListingView::Hot => "hot",
            ListingView::Rising => "rising",
            ListingView::Top(_) => "top",
            ListingView::Controversial(_) => "controversial",
            ListingView::Search(_) => "search",
        }
    }

    /// Extra query parameters for this view.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            ListingView::Top(t) | ListingView::Controversial(t) => {
                vec![("t", t.as_str().to_string())]
            }
            ListingView::Search(q) => vec![
                ("q", q.clone()),
                ("sort", "new".to_string()),
                ("syntax", "plain".to_string()),
                ("restrict_sr", "1".to_string()),
            ],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ListingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingView::Top(t) | ListingView::Controversial(t) => {
                write!(f, "{}:{}", self.path(), t.as_str())
            }
            ListingView::Search(q) => write!(f, "search:{q}"),
            _ => f.write_str(self.path()),
        }
    }
}

impl FromStr for ListingView {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (s.trim(), None),
        };

        match (name, arg) {
            ("new", None) => Ok(ListingView::New),
            ("hot", None) => Ok(ListingView::Hot),
            ("rising", None) => Ok(ListingView::Rising),
            ("top", Some(t)) => Ok(ListingView::Top(t.parse()?)),
            ("top", None) => Ok(ListingView::Top(TimeFilter::Day)),
            ("controversial", Some(t)) => Ok(ListingView::Controversial(t.parse()?)),
            ("controversial", None) => Ok(ListingView::Controversial(TimeFilter::Day)),
            ("search", Some(q)) if !q.is_empty() => Ok(ListingView::Search(q.to_string())),
            _ => Err(AppError::validation(format!("invalid listing view '{s}'"))),
        }
    }
}

impl TryFrom<String> for ListingView {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ListingView> for String {
    fn from(value: ListingView) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_view_parse_and_display() {
        let views = ["new", "hot", "rising", "top:week", "controversial:hour", "search:$SLV"];
        for raw in views {
            let view: ListingView = raw.parse().unwrap();
            assert_eq!(view.to_string(), raw);
        }
    }

    #[test]
    fn test_listing_view_rejects_garbage() {
        assert!("best".parse::<ListingView>().is_err());
        assert!("top:fortnight".parse::<ListingView>().is_err());
        assert!("search:".parse::<ListingView>().is_err());
    }

    #[test]
    fn test_search_query_params() {
        let view: ListingView = "search:silver".parse().unwrap();
        let query = view.query();
        assert!(query.contains(&("q", "silver".to_string())));
        assert!(query.contains(&("sort", "new".to_string())));
    }

    #[test]
    fn test_post_optional_fields_default() {
        let json = r#"{"id":"abc","title":"t","author":"a","created_utc":10,"score":2,"listing":"new"}"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.num_comments, 0);
        assert_eq!(post.edited, None);
    }

    #[test]
    fn test_post_missing_listing_rejected() {
        let json = r#"{"id":"abc","title":"t","author":"a","created_utc":10,"score":2}"#;
        assert!(serde_json::from_str::<Post>(json).is_err());
    }

    #[test]
    fn test_post_missing_id_rejected() {
        let json = r#"{"title":"t","author":"a","created_utc":10,"score":2}"#;
        assert!(serde_json::from_str::<Post>(json).is_err());
    }
}
