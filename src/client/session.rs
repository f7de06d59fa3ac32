//! A throttled, retrying view over a [`RedditApi`].

use super::{ListingRequest, RedditApi, RedditClientError};
use crate::models::{RawThing, SubredditPostCollection};
use crate::throttle::{RetryConfig, RetryPolicy, Throttle, ThrottleConfig};

/// Everything a harvest run sends to Reddit goes through a `Session`.
///
/// Each outbound call is counted by the session's [`Throttle`] first.
/// Listing and comment-tree fetches are retried on transient errors;
/// "more comments" expansions are not, since the comment fetcher has its
/// own cooldown policy for those.
pub struct Session<A> {
    api: A,
    throttle: Throttle,
    retry: RetryPolicy,
}

impl<A: RedditApi> Session<A> {
    pub fn new(api: A, throttle: &ThrottleConfig, retry: &RetryConfig) -> Self {
        Self {
            api,
            throttle: Throttle::new(throttle),
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub async fn listing(
        &mut self,
        request: &ListingRequest,
    ) -> Result<SubredditPostCollection, RedditClientError> {
        let what = format!("Listing r/{} {}", request.subreddit, request.method);
        let mut attempt = 0;
        loop {
            self.throttle.acquire().await;
            match self.api.fetch_listing(request).await {
                Ok(page) => return Ok(page),
                Err(err) => match self.retry.delay_for(attempt, &err) {
                    Some(delay) => {
                        self.retry.wait(&what, attempt, delay, &err).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    pub async fn comment_tree(
        &mut self,
        post_id: &str,
        focus: Option<&str>,
    ) -> Result<Vec<RawThing>, RedditClientError> {
        let what = format!("Comments of post {}", post_id);
        let mut attempt = 0;
        loop {
            self.throttle.acquire().await;
            match self.api.fetch_comment_tree(post_id, focus).await {
                Ok(tree) => return Ok(tree),
                Err(err) => match self.retry.delay_for(attempt, &err) {
                    Some(delay) => {
                        self.retry.wait(&what, attempt, delay, &err).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    pub async fn more_children(
        &mut self,
        post_id: &str,
        children: &[String],
    ) -> Result<Vec<RawThing>, RedditClientError> {
        self.throttle.acquire().await;
        self.api.fetch_more_children(post_id, children).await
    }
}
