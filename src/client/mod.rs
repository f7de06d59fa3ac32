use crate::config::Credentials;
use crate::models::comments::{CommentListing, MoreChildrenResponse};
use crate::models::subreddit_posts::SubredditPostsResponse;
use crate::models::{ListingMethod, RawThing, SubredditPostCollection, TimeFilter};
use log::debug;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub mod session;

pub use session::Session;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const PUBLIC_BASE_URL: &str = "https://www.reddit.com";

/// Largest page the listing endpoints will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Most child ids `/api/morechildren` accepts in one call.
pub const MAX_MORE_CHILDREN: usize = 100;

// Errors from talking to the Reddit API
#[derive(Debug, Error)]
pub enum RedditClientError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Reddit API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited by Reddit")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server returned error status: {0}")]
    HttpStatus(StatusCode),
}

impl RedditClientError {
    /// True for failures worth retrying: transport errors, rate limits and
    /// server-side errors. Missing or forbidden content is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            RedditClientError::RequestError(_) => true,
            RedditClientError::RateLimited { .. } => true,
            RedditClientError::HttpStatus(status) => status.is_server_error(),
            _ => false,
        }
    }
}

/// One page request against a subreddit listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    pub subreddit: String,
    pub method: ListingMethod,
    pub time_filter: Option<TimeFilter>,
    pub limit: u32,
    pub after: Option<String>,
}

/// The read-only slice of the Reddit API a harvest needs.
///
/// [`RedditClient`] talks to Reddit over HTTPS; tests substitute a scripted
/// implementation.
pub trait RedditApi {
    /// Fetch one page of a subreddit listing.
    fn fetch_listing(
        &self,
        request: &ListingRequest,
    ) -> impl Future<Output = Result<SubredditPostCollection, RedditClientError>>;

    /// Fetch the top-level nodes of a post's comment tree. With `focus`
    /// set to a comment id, the tree is rooted at that comment instead.
    fn fetch_comment_tree(
        &self,
        post_id: &str,
        focus: Option<&str>,
    ) -> impl Future<Output = Result<Vec<RawThing>, RedditClientError>>;

    /// Resolve the child ids of a "load more comments" placeholder.
    fn fetch_more_children(
        &self,
        post_id: &str,
        children: &[String],
    ) -> impl Future<Output = Result<Vec<RawThing>, RedditClientError>>;
}

#[derive(Clone)]
pub struct RedditClient {
    pub client: Client,
    pub access_token: Option<String>,
    pub user_agent: String,
}

impl RedditClient {
    pub fn with_user_agent(user_agent: String) -> Result<Self, RedditClientError> {
        Ok(Self {
            client: Self::get_client(&user_agent)?,
            access_token: None,
            user_agent,
        })
    }

    /// Create a client for the given credentials and obtain an
    /// application-only access token with them.
    pub async fn authenticate(credentials: &Credentials) -> Result<Self, RedditClientError> {
        let mut client = Self::with_user_agent(credentials.user_agent.clone())?;
        client
            .authenticate_with_client_credentials(&credentials.client_id, &credentials.client_secret)
            .await?;
        Ok(client)
    }

    fn get_client(user_agent: &str) -> Result<Client, RedditClientError> {
        Ok(Client::builder().user_agent(user_agent).build()?)
    }

    /// Get an application-only access token using a script app's id and
    /// secret (the `client_credentials` grant).
    ///
    /// The token can read public data only, which is all a harvest needs.
    pub async fn authenticate_with_client_credentials(
        &mut self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, RedditClientError> {
        let params = [("grant_type", "client_credentials")];

        // For the Authorization header, use the client_id and client_secret
        let auth = base64::encode(format!("{}:{}", client_id, client_secret));

        let res = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", auth))
            .form(&params)
            .send()
            .await?;

        // Check for HTTP errors
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await?;
            return Err(RedditClientError::ApiError(format!(
                "Authentication failed: HTTP {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = res.json().await?;

        // Check for API errors
        if let Some(error) = json["error"].as_str() {
            return Err(RedditClientError::ApiError(format!(
                "Authentication failed: {}",
                error
            )));
        }

        let token = json["access_token"]
            .as_str()
            .ok_or_else(|| {
                RedditClientError::ApiError(
                    "Failed to extract access token from response".to_string(),
                )
            })?
            .to_string();

        self.access_token = Some(token.clone());
        debug!(
            "Application-only access token obtained, expires in {:?}s",
            json["expires_in"].as_u64()
        );

        Ok(token)
    }

    fn base_url(&self) -> &'static str {
        if self.access_token.is_some() {
            OAUTH_BASE_URL
        } else {
            PUBLIC_BASE_URL
        }
    }

    fn listing_url(&self, request: &ListingRequest) -> Result<Url, RedditClientError> {
        let mut params = vec![
            ("limit", request.limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(filter) = request.time_filter {
            params.push(("t", filter.to_string()));
        }
        if let Some(after) = &request.after {
            params.push(("after", after.clone()));
        }
        let path = format!(
            "{}/r/{}/{}.json",
            self.base_url(),
            request.subreddit,
            request.method
        );
        Ok(Url::parse_with_params(&path, &params)?)
    }

    fn comments_url(&self, post_id: &str, focus: Option<&str>) -> Result<Url, RedditClientError> {
        let mut params = vec![("raw_json", "1".to_string())];
        if let Some(comment) = focus {
            params.push(("comment", comment.to_string()));
        }
        let path = format!("{}/comments/{}.json", self.base_url(), post_id);
        Ok(Url::parse_with_params(&path, &params)?)
    }

    fn more_children_url(&self, post_id: &str, children: &[String]) -> Result<Url, RedditClientError> {
        let params = [
            ("api_type", "json".to_string()),
            ("link_id", format!("t3_{}", post_id)),
            ("children", children.join(",")),
            ("raw_json", "1".to_string()),
        ];
        let path = format!("{}/api/morechildren", self.base_url());
        Ok(Url::parse_with_params(&path, &params)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, RedditClientError> {
        debug!("GET {}", url);
        let mut req_builder = self.client.get(url);
        if let Some(token) = &self.access_token {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = req_builder.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(status_error(status, response.headers(), what));
        }

        let body = response.text().await?;
        debug!("Response body length: {} bytes", body.len());

        serde_json::from_str::<T>(&body).map_err(|e| {
            debug!("Error parsing {}: {}", what, e);
            debug!("First 100 chars: {}", body.chars().take(100).collect::<String>());
            RedditClientError::ParseError(e)
        })
    }
}

impl RedditApi for RedditClient {
    async fn fetch_listing(
        &self,
        request: &ListingRequest,
    ) -> Result<SubredditPostCollection, RedditClientError> {
        let url = self.listing_url(request)?;
        let what = format!("r/{} {}", request.subreddit, request.method);
        let parsed: SubredditPostsResponse = self.get_json(url, &what).await?;
        debug!(
            "Parsed {} posts from r/{} ({})",
            parsed.data.children.len(),
            request.subreddit,
            request.method
        );
        Ok(parsed.data)
    }

    async fn fetch_comment_tree(
        &self,
        post_id: &str,
        focus: Option<&str>,
    ) -> Result<Vec<RawThing>, RedditClientError> {
        let url = self.comments_url(post_id, focus)?;
        // The endpoint answers with [post listing, comment listing]
        let (_post, comments): (serde_json::Value, CommentListing) =
            self.get_json(url, &format!("post {}", post_id)).await?;
        Ok(comments.data.children)
    }

    async fn fetch_more_children(
        &self,
        post_id: &str,
        children: &[String],
    ) -> Result<Vec<RawThing>, RedditClientError> {
        let url = self.more_children_url(post_id, children)?;
        let parsed: MoreChildrenResponse = self
            .get_json(url, &format!("more comments of post {}", post_id))
            .await?;
        if !parsed.json.errors.is_empty() {
            return Err(RedditClientError::ApiError(format!(
                "Reddit API returned an error: {:?}",
                parsed.json.errors
            )));
        }
        Ok(parsed.json.data.unwrap_or_default().things)
    }
}

/// Map an unsuccessful response onto an error, keeping any wait the server
/// asked for on a rate limit.
fn status_error(status: StatusCode, headers: &HeaderMap, what: &str) -> RedditClientError {
    match status {
        StatusCode::NOT_FOUND => RedditClientError::NotFound(what.to_string()),
        StatusCode::FORBIDDEN => RedditClientError::Forbidden(what.to_string()),
        StatusCode::TOO_MANY_REQUESTS => RedditClientError::RateLimited {
            retry_after: retry_after(headers),
        },
        _ => RedditClientError::HttpStatus(status),
    }
}

/// Seconds to wait from `Retry-After`, falling back to Reddit's
/// `x-ratelimit-reset`.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    [RETRY_AFTER.as_str(), "x-ratelimit-reset"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.trim().parse::<f64>().ok())
        .find(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
