//! Comment trees as returned by `/comments/{id}` and `/api/morechildren`.
//!
//! Nodes are kept as raw JSON until they are visited, so that one malformed
//! comment can be skipped without throwing away the rest of the thread.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Any "thing" whose payload has not been interpreted yet.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RawThing {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// A listing of comment-tree nodes.
#[derive(Deserialize, Debug, Default)]
pub struct CommentListing {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub data: CommentListingData,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommentListingData {
    #[serde(default)]
    pub children: Vec<RawThing>,
    pub after: Option<String>,
}

/// The `replies` field of a comment: an empty string when there are none,
/// a nested listing otherwise.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Replies {
    Listing(CommentListing),
    Empty(Value),
}

impl Default for Replies {
    fn default() -> Self {
        Replies::Empty(Value::Null)
    }
}

impl Replies {
    pub fn into_children(self) -> Vec<RawThing> {
        match self {
            Replies::Listing(listing) => listing.data.children,
            Replies::Empty(_) => Vec::new(),
        }
    }
}

/// A single comment (`t1`).
#[derive(Deserialize, Debug)]
pub struct CommentData {
    pub id: String,
    pub parent_id: String,
    #[serde(default)]
    pub link_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub body: String,
    #[serde(default)]
    pub score: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub replies: Replies,
}

/// A "load more comments" placeholder (`more`).
///
/// When `children` is empty the placeholder is a "continue this thread"
/// link and the remaining replies hang off `parent_id`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MoreData {
    pub id: String,
    pub parent_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

impl MoreData {
    pub fn is_continue_thread(&self) -> bool {
        self.children.is_empty()
    }

    /// Split off everything past the first `size` child ids into a
    /// placeholder of its own.
    pub fn split_at(&mut self, size: usize) -> Option<MoreData> {
        if self.children.len() <= size {
            return None;
        }
        let rest = self.children.split_off(size);
        Some(MoreData {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            count: rest.len() as u64,
            depth: self.depth,
            children: rest,
        })
    }
}

/// An interpreted comment-tree node.
#[derive(Debug)]
pub enum CommentNode {
    Comment(CommentData),
    More(MoreData),
}

/// A node that could not be interpreted.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("unexpected node kind '{0}' in comment tree")]
    UnexpectedKind(String),

    #[error("malformed {kind} node: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TryFrom<RawThing> for CommentNode {
    type Error = NodeError;

    fn try_from(raw: RawThing) -> Result<Self, Self::Error> {
        let RawThing { kind, data } = raw;
        let node = match kind.as_str() {
            "t1" => serde_json::from_value(data).map(CommentNode::Comment),
            "more" => serde_json::from_value(data).map(CommentNode::More),
            _ => return Err(NodeError::UnexpectedKind(kind)),
        };
        node.map_err(|source| NodeError::Malformed { kind, source })
    }
}

/// Response body of `/api/morechildren?api_type=json`.
#[derive(Deserialize, Debug)]
pub struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Deserialize, Debug)]
pub struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Deserialize, Debug, Default)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<RawThing>,
}
