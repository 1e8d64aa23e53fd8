//! Forum API payloads and their conversion into cache records.
//!
//! Listings arrive as `{"kind": "Listing", "data": {"after": ..., "children": [...]}}`
//! where each child is a `Thing` tagged `t3` (post), `t1` (comment) or
//! `more` (collapsed comment ids).

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Comment, DELETED_AUTHOR, ListingPage, Post};
use crate::utils::strip_fullname;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: Option<String>,
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    permalink: String,
    #[serde(default, deserialize_with = "edited_timestamp")]
    edited: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: String,
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    link_id: Option<String>,
    #[serde(default, deserialize_with = "edited_timestamp")]
    edited: Option<i64>,
    /// Empty string when there are no replies, otherwise a nested listing
    #[serde(default)]
    replies: Value,
}

#[derive(Debug, Deserialize)]
struct RawMore {
    #[serde(default)]
    children: Vec<String>,
    /// Set on "continue this thread" stubs, which carry no children
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<Thing>,
}

/// `edited` is `false` for unedited items and an epoch float otherwise.
fn edited_timestamp<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().map(|f| f as i64),
        _ => None,
    })
}

fn author_or_deleted(author: Option<String>) -> String {
    author
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DELETED_AUTHOR.to_string())
}

impl RawPost {
    fn into_post(self, listing: &str) -> Post {
        Post {
            id: self.id,
            title: self.title,
            author: author_or_deleted(self.author),
            created_utc: self.created_utc as i64,
            score: self.score,
            listing: listing.to_string(),
            num_comments: self.num_comments,
            selftext: self.selftext,
            url: self.url,
            permalink: self.permalink,
            edited: self.edited,
        }
    }
}

impl RawComment {
    fn into_comment(self, post_id: &str) -> Comment {
        let post_id = self
            .link_id
            .as_deref()
            .map(strip_fullname)
            .unwrap_or(post_id)
            .to_string();
        Comment {
            id: self.id,
            post_id,
            author: author_or_deleted(self.author),
            created_utc: self.created_utc as i64,
            score: self.score,
            body: self.body,
            parent_id: self.parent_id,
            permalink: self.permalink,
            edited: self.edited,
        }
    }
}

/// Parse one page of a post listing.
pub fn parse_listing(value: Value, listing: &str) -> Result<ListingPage> {
    let listing_data: Listing = serde_json::from_value(value)?;
    let children = listing_data.data.children.len();
    let mut posts = Vec::with_capacity(listing_data.data.children.len());

    for thing in listing_data.data.children {
        if thing.kind != "t3" {
            log::debug!("Skipping non-post thing of kind {}", thing.kind);
            continue;
        }
        match serde_json::from_value::<RawPost>(thing.data) {
            Ok(raw) => posts.push(raw.into_post(listing)),
            Err(e) => log::warn!("Skipping unparseable post in {listing}: {e}"),
        }
    }

    Ok(ListingPage {
        posts,
        after: listing_data.data.after.filter(|a| !a.is_empty()),
        children,
    })
}

/// Comments found in a tree payload plus what is still hidden behind "more" stubs.
#[derive(Debug, Default)]
pub struct TreeChunk {
    pub comments: Vec<Comment>,
    /// Collapsed comment ids, expanded through `/api/morechildren`
    pub more: Vec<String>,
    /// Comments whose replies were cut off by depth, fetched as subtrees
    pub threads: Vec<String>,
}

impl TreeChunk {
    fn visit(&mut self, thing: Thing, post_id: &str) {
        match thing.kind.as_str() {
            "t1" => match serde_json::from_value::<RawComment>(thing.data) {
                Ok(mut raw) => {
                    let replies = std::mem::take(&mut raw.replies);
                    self.comments.push(raw.into_comment(post_id));
                    if let Ok(listing) = serde_json::from_value::<Listing>(replies) {
                        for child in listing.data.children {
                            self.visit(child, post_id);
                        }
                    }
                }
                Err(e) => log::warn!("Skipping unparseable comment under {post_id}: {e}"),
            },
            "more" => match serde_json::from_value::<RawMore>(thing.data) {
                Ok(more) if more.children.is_empty() => match more.parent_id {
                    Some(parent) if parent.starts_with("t1_") => {
                        self.threads.push(strip_fullname(&parent).to_string());
                    }
                    _ => log::debug!("Empty more stub under {post_id}"),
                },
                Ok(more) => self.more.extend(more.children),
                Err(e) => log::warn!("Skipping unparseable more stub under {post_id}: {e}"),
            },
            other => log::debug!("Skipping thing of kind {other} under {post_id}"),
        }
    }
}

/// Parse the `[post listing, comment listing]` pair returned by `/comments/{id}`.
pub fn parse_comment_tree(value: Value, post_id: &str) -> Result<TreeChunk> {
    let Value::Array(mut parts) = value else {
        return Err(AppError::crawl(post_id, "comment tree is not an array"));
    };
    if parts.len() < 2 {
        return Err(AppError::crawl(post_id, "comment tree has no comment listing"));
    }

    let listing: Listing = serde_json::from_value(parts.swap_remove(1))?;
    let mut chunk = TreeChunk::default();
    for thing in listing.data.children {
        chunk.visit(thing, post_id);
    }
    Ok(chunk)
}

/// Parse a `/api/morechildren` response. Things arrive flattened.
pub fn parse_more_children(value: Value, post_id: &str) -> Result<TreeChunk> {
    let response: MoreChildrenResponse = serde_json::from_value(value)?;
    if !response.json.errors.is_empty() {
        return Err(AppError::crawl(
            post_id,
            format!("morechildren errors: {:?}", response.json.errors),
        ));
    }

    let mut chunk = TreeChunk::default();
    for thing in response.json.data.map(|d| d.things).unwrap_or_default() {
        chunk.visit(thing, post_id);
    }
    Ok(chunk)
}
