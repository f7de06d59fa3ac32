//! The harvest operations: post listings, comment trees, and the pipeline
//! that ties them to batch storage.

use crate::client::RedditClientError;
use crate::config::{ConfigError, CredentialsError};
use crate::models::ParseListingError;
use crate::storage::StorageError;
use thiserror::Error;

pub mod comments;
pub mod harvest;
pub mod posts;

pub use comments::{CommentsOperation, CommentsOptions};
pub use harvest::{Harvest, HarvestSummary, RunOptions};
pub use posts::{PostsOperation, PostsOptions, PostsResult};

/// Errors that end a harvest. Per-item failures never surface here: they
/// are logged, skipped or recorded as sentinel rows.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Listing(#[from] ParseListingError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("Reddit client error: {0}")]
    Client(#[from] RedditClientError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
