use super::HarvestError;
use crate::client::{ListingRequest, RedditApi, RedditClientError, Session, MAX_PAGE_SIZE};
use crate::config::HarvestConfig;
use crate::models::{ListingMethod, MethodLimit, PostRecord, SubredditPostData, TimeFilter};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Configuration options for fetching posts
#[derive(Debug, Clone, PartialEq)]
pub struct PostsOptions {
    /// Subreddits to walk, without the `r/` prefix
    pub subreddits: Vec<String>,
    /// Listing methods and how many posts to take from each, in order
    pub methods: Vec<MethodLimit>,
    /// Time window applied to the `top` listing
    pub time_filter: String,
}

impl PostsOptions {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            subreddits: config.normalized_subreddits(),
            methods: config.methods.clone(),
            time_filter: config.top_time_filter.clone(),
        }
    }
}

/// Result of a posts fetch operation
#[derive(Debug, Default)]
pub struct PostsResult {
    /// Deduplicated posts, in the order they were first seen
    pub posts: Vec<PostRecord>,
    /// Posts dropped because an earlier listing already returned them
    pub duplicates_dropped: usize,
    /// `(subreddit, method)` pairs whose listing could not be fetched
    pub failed_listings: Vec<(String, String)>,
}

/// Operation for fetching the post table of a set of subreddits
#[derive(Debug, Clone)]
pub struct PostsOperation {
    subreddits: Vec<String>,
    plan: Vec<(ListingMethod, u32)>,
    time_filter: TimeFilter,
}

impl PostsOperation {
    /// Check every method name and the time filter. Fails before anything
    /// is fetched.
    pub fn new(options: PostsOptions) -> Result<Self, HarvestError> {
        let plan = options
            .methods
            .iter()
            .map(|m| m.method.parse::<ListingMethod>().map(|method| (method, m.limit)))
            .collect::<Result<Vec<_>, _>>()?;
        let time_filter = options.time_filter.parse::<TimeFilter>()?;

        Ok(Self {
            subreddits: options.subreddits,
            plan,
            time_filter,
        })
    }

    pub fn subreddits(&self) -> &[String] {
        &self.subreddits
    }

    /// Walk every (subreddit, method) pair in order. A listing that fails
    /// is logged and skipped; the rest of the run goes on.
    pub async fn execute<A: RedditApi>(&self, session: &mut Session<A>) -> PostsResult {
        let mut result = PostsResult::default();
        let mut fetched = Vec::new();

        for subreddit in &self.subreddits {
            for &(method, limit) in &self.plan {
                let tag = method.tag(self.time_filter);
                info!("Fetching up to {} {} posts from r/{}", limit, tag, subreddit);

                match self.fetch_listing(session, subreddit, method, limit).await {
                    Ok(posts) => {
                        debug!("r/{} {}: {} posts", subreddit, tag, posts.len());
                        for post in &posts {
                            debug!(
                                "[{}] {} pts, {} comments: {}",
                                post.format_timestamp(),
                                post.score,
                                post.num_comments,
                                post.title
                            );
                        }
                        fetched.extend(posts.iter().map(|post| post.to_record(&tag)));
                    }
                    Err(err) => {
                        warn!("Skipping r/{} {}: {}", subreddit, tag, err);
                        result.failed_listings.push((subreddit.clone(), tag));
                    }
                }
            }
        }

        let fetched_count = fetched.len();
        result.posts = dedupe_posts(fetched);
        result.duplicates_dropped = fetched_count - result.posts.len();
        info!(
            "Collected {} unique posts ({} duplicates dropped)",
            result.posts.len(),
            result.duplicates_dropped
        );
        result
    }

    /// Page through one listing until `limit` posts are collected or the
    /// listing runs out.
    async fn fetch_listing<A: RedditApi>(
        &self,
        session: &mut Session<A>,
        subreddit: &str,
        method: ListingMethod,
        limit: u32,
    ) -> Result<Vec<SubredditPostData>, RedditClientError> {
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        while (posts.len() as u32) < limit {
            let remaining = limit - posts.len() as u32;
            let request = ListingRequest {
                subreddit: subreddit.to_string(),
                method,
                time_filter: method.takes_time_filter().then_some(self.time_filter),
                limit: remaining.min(MAX_PAGE_SIZE),
                after: after.take(),
            };
            let page = session.listing(&request).await?;
            if page.children.is_empty() {
                break;
            }
            posts.extend(
                page.children
                    .into_iter()
                    .take(remaining as usize)
                    .map(|entity| entity.data),
            );
            match page.after {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        Ok(posts)
    }
}

/// Keep the first occurrence of every post id.
pub fn dedupe_posts(posts: Vec<PostRecord>) -> Vec<PostRecord> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| seen.insert(post.id.clone()))
        .collect()
}
