// src/utils/url.rs

//! Endpoint construction for the forum API.

use url::Url;

use crate::error::Result;

/// Join `path` onto `base` and append query pairs.
///
/// # Examples
/// ```
/// use subcrawl::utils::url::endpoint;
///
/// let url = endpoint("https://oauth.reddit.com", "/r/rust/new", &[("limit", "100".into())]).unwrap();
/// assert_eq!(url.as_str(), "https://oauth.reddit.com/r/rust/new?limit=100");
/// ```
pub fn endpoint(base: &str, path: &str, query: &[(&str, String)]) -> Result<Url> {
    let mut url = Url::parse(base)?.join(path)?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Path of a listing view below a forum, e.g. `/r/wallstreetsilver/top`.
pub fn listing_path(forum: &str, view_path: &str) -> String {
    format!("/r/{}/{}", forum.trim_start_matches("r/"), view_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_query() {
        let url = endpoint(
            "https://oauth.reddit.com",
            "/r/wallstreetsilver/search",
            &[("q", "$SLV".to_string()), ("sort", "new".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://oauth.reddit.com/r/wallstreetsilver/search?q=%24SLV&sort=new"
        );
    }

    #[test]
    fn test_endpoint_without_query() {
        let url = endpoint("https://oauth.reddit.com/", "/comments/abc", &[]).unwrap();
        assert_eq!(url.as_str(), "https://oauth.reddit.com/comments/abc");
    }

    #[test]
    fn test_listing_path() {
        assert_eq!(listing_path("r/silver", "new"), "/r/silver/new");
        assert_eq!(listing_path("silver", "top"), "/r/silver/top");
    }
}
