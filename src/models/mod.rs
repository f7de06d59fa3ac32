use serde::{Deserialize, Serialize};

pub mod comments;
pub mod listing;
pub mod subreddit_posts;

pub use comments::{CommentData, CommentNode, MoreData, RawThing};
pub use listing::{ListingMethod, MethodLimit, ParseListingError, TimeFilter};
pub use subreddit_posts::{SubredditPostCollection, SubredditPostData};

/// One row of the post table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: f64,
    pub text: String,
    pub subreddit: String,
    /// Listing the post was found through, e.g. `hot` or `top_month`.
    pub method: String,
}

/// One row of the comment table.
///
/// A row with `error` set is a sentinel: the post's comments could not be
/// fetched, and every other field except `post_id` is absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub post_id: String,
    pub comment_id: Option<String>,
    pub parent_id: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub score: Option<i64>,
    pub created_utc: Option<f64>,
    pub depth: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommentRecord {
    pub fn from_comment(post_id: &str, comment: &CommentData) -> Self {
        Self {
            post_id: post_id.to_string(),
            comment_id: Some(comment.id.clone()),
            parent_id: Some(comment.parent_id.clone()),
            author: comment.author.clone(),
            body: Some(comment.body.clone()),
            score: Some(comment.score),
            created_utc: Some(comment.created_utc),
            depth: comment.depth,
            error: None,
        }
    }

    pub fn sentinel(post_id: &str, error: impl ToString) -> Self {
        Self {
            post_id: post_id.to_string(),
            comment_id: None,
            parent_id: None,
            author: None,
            body: None,
            score: None,
            created_utc: None,
            depth: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.error.is_some()
    }
}
