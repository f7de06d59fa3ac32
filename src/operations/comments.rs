use crate::client::{RedditApi, Session, MAX_MORE_CHILDREN};
use crate::config::HarvestConfig;
use crate::models::{CommentNode, CommentRecord, MoreData, RawThing};
use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// Configuration options for fetching comments
#[derive(Debug, Clone, PartialEq)]
pub struct CommentsOptions {
    /// "Load more comments" placeholders expanded per post
    pub max_expansions: usize,
    /// Pause after a comment or an expansion fails
    pub error_cooldown: Duration,
}

impl Default for CommentsOptions {
    fn default() -> Self {
        Self {
            max_expansions: 30,
            error_cooldown: Duration::from_secs(65),
        }
    }
}

impl CommentsOptions {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            max_expansions: config.max_expansions,
            error_cooldown: config.error_cooldown(),
        }
    }
}

/// Operation for flattening the comment tree of a post
#[derive(Debug, Clone, Default)]
pub struct CommentsOperation {
    options: CommentsOptions,
}

/// Records gathered for one post so far.
#[derive(Debug, Default)]
struct Thread {
    records: Vec<CommentRecord>,
    seen: HashSet<String>,
    pending: VecDeque<MoreData>,
}

impl CommentsOperation {
    pub fn new(options: CommentsOptions) -> Self {
        Self { options }
    }

    /// Every comment of `post_id`, depth first in thread order.
    ///
    /// Never fails: when the post itself cannot be fetched the result is a
    /// single sentinel record carrying the error.
    pub async fn fetch<A: RedditApi>(
        &self,
        session: &mut Session<A>,
        post_id: &str,
    ) -> Vec<CommentRecord> {
        let tree = match session.comment_tree(post_id, None).await {
            Ok(tree) => tree,
            Err(err) => {
                warn!("Could not fetch comments of post {}: {}", post_id, err);
                return vec![CommentRecord::sentinel(post_id, &err)];
            }
        };

        let mut thread = Thread::default();
        self.visit(post_id, tree, &mut thread).await;
        self.expand(session, post_id, &mut thread).await;

        debug!("Post {}: {} comments", post_id, thread.records.len());
        thread.records
    }

    /// Flatten `things` into the thread, queueing placeholders for later.
    async fn visit(&self, post_id: &str, things: Vec<RawThing>, thread: &mut Thread) {
        let mut stack: Vec<RawThing> = things.into_iter().rev().collect();

        while let Some(raw) = stack.pop() {
            match CommentNode::try_from(raw) {
                Ok(CommentNode::Comment(mut comment)) => {
                    let replies = std::mem::take(&mut comment.replies).into_children();
                    stack.extend(replies.into_iter().rev());
                    if thread.seen.insert(comment.id.clone()) {
                        thread.records.push(CommentRecord::from_comment(post_id, &comment));
                    }
                }
                Ok(CommentNode::More(more)) => thread.pending.push_back(more),
                Err(err) => {
                    warn!("Skipping comment in post {}: {}", post_id, err);
                    self.cool_down().await;
                }
            }
        }
    }

    /// Expand queued placeholders until the queue is empty or the
    /// expansion budget is spent.
    async fn expand<A: RedditApi>(
        &self,
        session: &mut Session<A>,
        post_id: &str,
        thread: &mut Thread,
    ) {
        let mut expansions = 0;

        while let Some(mut more) = thread.pending.pop_front() {
            if expansions >= self.options.max_expansions {
                debug!(
                    "Post {}: expansion limit of {} reached, dropping {} placeholders",
                    post_id,
                    self.options.max_expansions,
                    thread.pending.len() + 1
                );
                break;
            }

            let result = if more.is_continue_thread() {
                let Some(parent) = more.parent_id.strip_prefix("t1_") else {
                    debug!("Post {}: ignoring empty placeholder {}", post_id, more.id);
                    continue;
                };
                expansions += 1;
                session.comment_tree(post_id, Some(parent)).await
            } else {
                if let Some(rest) = more.split_at(MAX_MORE_CHILDREN) {
                    thread.pending.push_front(rest);
                }
                expansions += 1;
                session.more_children(post_id, &more.children).await
            };

            match result {
                Ok(things) => self.visit(post_id, things, thread).await,
                Err(err) => {
                    warn!(
                        "Could not expand placeholder {} of post {}: {}",
                        more.id, post_id, err
                    );
                    self.cool_down().await;
                }
            }
        }
    }

    async fn cool_down(&self) {
        if self.options.error_cooldown.is_zero() {
            return;
        }
        info!(
            "Cooling down for {}s before continuing",
            self.options.error_cooldown.as_secs()
        );
        tokio::time::sleep(self.options.error_cooldown).await;
    }
}
