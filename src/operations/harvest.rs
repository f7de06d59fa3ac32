//! The end-to-end harvest: post table, then comments of every post into
//! numbered batches, then the combined comment table.

use super::{CommentsOperation, CommentsOptions, HarvestError, PostsOperation, PostsOptions, PostsResult};
use crate::client::{RedditApi, Session};
use crate::config::HarvestConfig;
use crate::models::PostRecord;
use crate::storage::{self, BatchSummary, BatchWriter};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip posts an earlier run finished in the output directory.
    pub resume: bool,
    pub show_progress: bool,
}

/// What a harvest wrote.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HarvestSummary {
    pub posts: usize,
    pub duplicates_dropped: usize,
    pub failed_listings: usize,
    /// Posts skipped because an earlier run already harvested them.
    pub resumed: usize,
    /// Posts whose comments could not be fetched at all.
    pub sentinels: usize,
    pub comments: usize,
    pub batches: BatchSummary,
    /// Records in the combined comment table.
    pub combined: usize,
}

/// A validated harvest configuration, ready to run against a session.
#[derive(Debug, Clone)]
pub struct Harvest {
    config: HarvestConfig,
    posts: PostsOperation,
    comments: CommentsOperation,
}

impl Harvest {
    /// Check the configuration. Nothing touches the network or the output
    /// directory until this has succeeded.
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestError> {
        let posts = PostsOperation::new(PostsOptions::from_config(&config))?;
        let comments = CommentsOperation::new(CommentsOptions::from_config(&config));
        Ok(Self {
            config,
            posts,
            comments,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Fetch the post table and write it to `posts.jsonl`.
    pub async fn fetch_posts<A: RedditApi>(
        &self,
        session: &mut Session<A>,
    ) -> Result<PostsResult, HarvestError> {
        if self.posts.subreddits().is_empty() {
            warn!("No subreddits configured, the post table will be empty");
        }
        let result = self.posts.execute(session).await;
        storage::write_posts(self.output_dir(), &result.posts)?;
        Ok(result)
    }

    /// Fetch the comments of `post_ids` into numbered batches.
    pub async fn fetch_comments<A: RedditApi>(
        &self,
        session: &mut Session<A>,
        post_ids: &[String],
        show_progress: bool,
    ) -> Result<(BatchSummary, usize), HarvestError> {
        let mut writer = BatchWriter::open(self.output_dir(), self.config.batch_size)?;
        let progress = progress_bar(post_ids.len() as u64, show_progress);
        let mut sentinels = 0;

        for post_id in post_ids {
            progress.set_message(post_id.clone());
            let records = self.comments.fetch(session, post_id).await;
            if records.iter().any(|record| record.is_sentinel()) {
                sentinels += 1;
            }
            writer.extend(records)?;
            writer.finish_post(post_id)?;
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok((writer.finish()?, sentinels))
    }

    /// Posts, comments, combine.
    pub async fn run<A: RedditApi>(
        &self,
        session: &mut Session<A>,
        options: RunOptions,
    ) -> Result<HarvestSummary, HarvestError> {
        let posts = self.fetch_posts(session).await?;

        let done = if options.resume {
            let done = storage::harvested_post_ids(self.output_dir())?;
            let dropped = storage::discard_unfinished(self.output_dir(), &done)?;
            if dropped > 0 {
                warn!("Dropped {} comments of posts an earlier run did not finish", dropped);
            }
            done
        } else {
            HashSet::new()
        };
        let todo = pending_post_ids(&posts.posts, &done);
        let resumed = posts.posts.len() - todo.len();
        if resumed > 0 {
            info!("Resuming: {} posts already harvested", resumed);
        }

        let (batches, sentinels) = self.fetch_comments(session, &todo, options.show_progress).await?;
        let combined = self.combine()?;

        let summary = HarvestSummary {
            posts: posts.posts.len(),
            duplicates_dropped: posts.duplicates_dropped,
            failed_listings: posts.failed_listings.len(),
            resumed,
            sentinels,
            comments: batches.records - sentinels,
            batches,
            combined,
        };
        info!(
            "Harvest finished: {} posts, {} comments in {} batches, {} posts without comments data",
            summary.posts,
            summary.comments,
            summary.batches.batches.len(),
            summary.sentinels
        );
        Ok(summary)
    }

    /// Merge every batch of the output directory into the combined table.
    pub fn combine(&self) -> Result<usize, HarvestError> {
        let dir = self.output_dir();
        Ok(storage::combine_batches(dir, &dir.join(storage::COMBINED_FILE))?)
    }
}

fn pending_post_ids(posts: &[PostRecord], done: &HashSet<String>) -> Vec<String> {
    posts
        .iter()
        .filter(|post| !done.contains(&post.id))
        .map(|post| post.id.clone())
        .collect()
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} post {msg} {pos}/{len} [{bar:.cyan/blue}] elapsed: {elapsed_precise}",
    ) {
        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
