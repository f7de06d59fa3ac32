//! Harvest subreddit posts and their comment threads from the Reddit API
//! into JSON Lines tables.

pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod operations;
pub mod storage;
pub mod throttle;

pub use client::{RedditApi, RedditClient, RedditClientError, Session};
pub use config::{Credentials, HarvestConfig};
pub use models::{CommentRecord, PostRecord};
pub use operations::{Harvest, HarvestError, HarvestSummary, RunOptions};
