// src/services/reddit.rs

//! OAuth client for the forum API.
//!
//! Authenticates with the refresh-token grant, pages through listings and
//! fetches whole comment trees. Every request goes through [`RedditClient::get_json`],
//! which spaces calls by `request_delay_ms`, waits out exhausted rate-limit
//! windows, and retries transient failures with exponential backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::backoff::Backoff;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Comment, CrawlerConfig, Credentials, ListingPage, ListingView};
use crate::services::ForumApi;
use crate::services::payload::{TreeChunk, parse_comment_tree, parse_listing, parse_more_children};
use crate::utils::http::{backoff_policy, create_async_client, rate_limit_wait, retry_after};
use crate::utils::url::{endpoint, listing_path};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Ids accepted by one `/api/morechildren` call.
const MORE_CHILDREN_BATCH: usize = 100;

/// Tokens are renewed this long before they expire.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Client for the forum's OAuth API.
pub struct RedditClient {
    http: reqwest::Client,
    auth_url: String,
    api_base: String,
    credentials: Credentials,
    config: CrawlerConfig,
    token: Mutex<Option<AccessToken>>,
    last_request: Mutex<Option<Instant>>,
}

impl RedditClient {
    /// Create a client; no request is made until the first call.
    pub fn new(config: &CrawlerConfig, credentials: Credentials) -> Result<Self> {
        let user_agent = credentials
            .user_agent
            .clone()
            .unwrap_or_else(|| config.user_agent.clone());
        let http = create_async_client(config, &user_agent)?;

        Ok(Self {
            http,
            auth_url: AUTH_URL.to_string(),
            api_base: API_BASE.to_string(),
            credentials,
            config: config.clone(),
            token: Mutex::new(None),
            last_request: Mutex::new(None),
        })
    }

    /// Point the client at another server, e.g. a local test double.
    #[cfg(test)]
    fn with_endpoints(mut self, auth_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_base = api_base.into();
        self
    }

    /// Obtain an access token up front so bad credentials fail before crawling.
    pub async fn authenticate(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }

    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let fresh = self.refresh_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Exchange the refresh token for a short-lived access token.
    async fn refresh_token(&self) -> Result<AccessToken> {
        log::debug!("Requesting access token");
        let response = self
            .http
            .post(&self.auth_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(AppError::auth(format!("token endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(AppError::api(status.as_u16(), "access_token"));
        }

        let body: TokenResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(AppError::auth(error));
        }
        let value = body
            .access_token
            .ok_or_else(|| AppError::auth("token response has no access_token"))?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));

        Ok(AccessToken {
            value,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_MARGIN),
        })
    }

    /// Keep at least `request_delay_ms` between consecutive calls.
    async fn pace(&self) {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let mut last = self.last_request.lock().await;
        if let Some(elapsed) = last.map(|t| t.elapsed()) {
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// One authenticated GET without retries.
    async fn send_once(&self, url: &url::Url, context: &str) -> Result<Value> {
        self.pace().await;
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if let Some(wait) = rate_limit_wait(response.headers()) {
            log::info!("Rate-limit window exhausted, sleeping {}s", wait.as_secs());
            tokio::time::sleep(wait).await;
        }

        match status {
            s if s.is_success() => Ok(response.json::<Value>().await?),
            StatusCode::UNAUTHORIZED => {
                self.invalidate_token().await;
                Err(AppError::api(status.as_u16(), context))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                if let Some(wait) = retry_after(response.headers()) {
                    tokio::time::sleep(wait).await;
                }
                Err(AppError::api(status.as_u16(), context))
            }
            s => Err(AppError::api(s.as_u16(), context)),
        }
    }

    /// GET with token renewal and backoff on transient failures.
    async fn get_json(&self, path: &str, query: &[(&str, String)], context: &str) -> Result<Value> {
        let url = endpoint(&self.api_base, path, query)?;
        let mut policy = backoff_policy(&self.config);
        let max_attempts = self.config.max_retries.max(1);
        let mut reauthenticated = false;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(&url, context).await {
                Ok(value) => return Ok(value),
                Err(AppError::Api { status: 401, .. }) if !reauthenticated => {
                    log::debug!("{context}: access token rejected, renewing");
                    reauthenticated = true;
                }
                Err(AppError::Api { status: 401, .. }) => {
                    return Err(AppError::auth(format!("{context} rejected a fresh access token")));
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let wait = policy
                        .next_backoff()
                        .unwrap_or(Duration::from_millis(self.config.backoff_max_ms));
                    log::warn!(
                        "{context}: {e}; retrying in {}ms (attempt {attempt}/{max_attempts})",
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(AppError::Api { status: 429, .. }) => {
                    return Err(AppError::RateLimited {
                        context: context.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Expand collapsed comments until none remain or the budget runs out.
    ///
    /// Collapsed ids go through `/api/morechildren` in batches; replies cut off
    /// by depth are fetched as the subtree below their parent comment. Each
    /// call counts against `max_more_batches`.
    async fn expand_more(&self, post_id: &str, chunk: &mut TreeChunk) -> Result<()> {
        let mut pending = std::mem::take(&mut chunk.more);
        let mut threads = std::mem::take(&mut chunk.threads);
        let mut batches = 0;

        while !pending.is_empty() || !threads.is_empty() {
            if batches >= self.config.max_more_batches {
                log::warn!(
                    "Post {post_id}: {} collapsed comments and {} threads left after {batches} expansions",
                    pending.len(),
                    threads.len()
                );
                break;
            }
            batches += 1;

            let fetched = if pending.is_empty() {
                let parent = threads.remove(0);
                self.fetch_thread(post_id, &parent).await
            } else {
                let take = pending.len().min(MORE_CHILDREN_BATCH);
                let batch: Vec<String> = pending.drain(..take).collect();
                self.fetch_more_children(post_id, &batch).await
            };

            let more = match fetched {
                Ok(more) => more,
                Err(AppError::Api { status: 413, .. }) => {
                    let e = AppError::TooLarge {
                        post_id: post_id.to_string(),
                    };
                    log::warn!("{e}; keeping the {} comments fetched", chunk.comments.len());
                    break;
                }
                Err(e) => return Err(e),
            };

            chunk.comments.extend(more.comments);
            pending.extend(more.more);
            threads.extend(more.threads);
        }

        Ok(())
    }

    async fn fetch_more_children(&self, post_id: &str, ids: &[String]) -> Result<TreeChunk> {
        let query = [
            ("api_type", "json".to_string()),
            ("link_id", format!("t3_{post_id}")),
            ("children", ids.join(",")),
            ("limit_children", "false".to_string()),
            ("raw_json", "1".to_string()),
        ];
        let value = self
            .get_json("/api/morechildren", &query, &format!("morechildren {post_id}"))
            .await?;
        parse_more_children(value, post_id)
    }

    /// Subtree below one comment, for a "continue this thread" stub.
    async fn fetch_thread(&self, post_id: &str, parent: &str) -> Result<TreeChunk> {
        let query = [
            ("limit", "500".to_string()),
            ("raw_json", "1".to_string()),
        ];
        let value = self
            .get_json(
                &format!("/comments/{post_id}/_/{parent}"),
                &query,
                &format!("thread {post_id}/{parent}"),
            )
            .await?;
        parse_comment_tree(value, post_id)
    }
}

#[async_trait]
impl ForumApi for RedditClient {
    async fn listing_page(
        &self,
        forum: &str,
        view: &ListingView,
        after: Option<&str>,
    ) -> Result<ListingPage> {
        let mut query = view.query();
        query.push(("limit", self.config.page_size.to_string()));
        query.push(("raw_json", "1".to_string()));
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let label = view.to_string();
        let value = self
            .get_json(&listing_path(forum, view.path()), &query, &label)
            .await?;
        parse_listing(value, &label)
    }

    async fn comment_tree(&self, post_id: &str) -> Result<Vec<Comment>> {
        let query = [
            ("limit", "500".to_string()),
            ("raw_json", "1".to_string()),
        ];
        let value = match self
            .get_json(&format!("/comments/{post_id}"), &query, &format!("comments {post_id}"))
            .await
        {
            Err(AppError::Api { status: 413, .. }) => {
                return Err(AppError::TooLarge {
                    post_id: post_id.to_string(),
                });
            }
            other => other?,
        };

        let mut chunk = parse_comment_tree(value, post_id)?;
        self.expand_more(post_id, &mut chunk).await?;

        // Expansion can return a comment that was already in the tree.
        let mut seen = std::collections::HashSet::new();
        chunk.comments.retain(|c| seen.insert(c.id.clone()));
        Ok(chunk.comments)
    }
}
