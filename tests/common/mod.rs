#![allow(dead_code)]

use redharvest::client::{ListingRequest, RedditApi, RedditClientError, Session};
use redharvest::models::{RawThing, SubredditPostCollection};
use redharvest::throttle::{RetryConfig, ThrottleConfig};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

type Replies<T> = VecDeque<Result<T, RedditClientError>>;

/// An in-memory Reddit that answers from a script and records every call.
///
/// Each scripted reply is used once. Unscripted listings are empty,
/// unscripted comment trees are missing, unscripted expansions return
/// nothing.
#[derive(Default)]
pub struct ScriptedApi {
    listings: RefCell<HashMap<(String, String, Option<String>), Replies<SubredditPostCollection>>>,
    trees: RefCell<HashMap<(String, Option<String>), Replies<Vec<RawThing>>>>,
    more: RefCell<HashMap<String, Replies<Vec<RawThing>>>>,
    pub listing_calls: RefCell<Vec<ListingRequest>>,
    pub tree_calls: RefCell<Vec<(String, Option<String>)>>,
    pub more_calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the page of `r/{subreddit}/{method}` served at cursor `after`.
    pub fn listing(self, subreddit: &str, method: &str, after: Option<&str>, page: Value) -> Self {
        let page = serde_json::from_value(page).unwrap();
        self.listing_reply(subreddit, method, after, Ok(page))
    }

    pub fn listing_reply(
        self,
        subreddit: &str,
        method: &str,
        after: Option<&str>,
        reply: Result<SubredditPostCollection, RedditClientError>,
    ) -> Self {
        self.listings
            .borrow_mut()
            .entry((subreddit.to_string(), method.to_string(), after.map(str::to_string)))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn tree(self, post_id: &str, focus: Option<&str>, nodes: Vec<Value>) -> Self {
        self.tree_reply(post_id, focus, Ok(things(nodes)))
    }

    pub fn tree_reply(
        self,
        post_id: &str,
        focus: Option<&str>,
        reply: Result<Vec<RawThing>, RedditClientError>,
    ) -> Self {
        self.trees
            .borrow_mut()
            .entry((post_id.to_string(), focus.map(str::to_string)))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn more(self, children: &[&str], nodes: Vec<Value>) -> Self {
        self.more_reply(children, Ok(things(nodes)))
    }

    pub fn more_reply(
        self,
        children: &[&str],
        reply: Result<Vec<RawThing>, RedditClientError>,
    ) -> Self {
        self.more
            .borrow_mut()
            .entry(children.join(","))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.listing_calls.borrow().len() + self.tree_calls.borrow().len() + self.more_calls.borrow().len()
    }
}

impl RedditApi for ScriptedApi {
    async fn fetch_listing(
        &self,
        request: &ListingRequest,
    ) -> Result<SubredditPostCollection, RedditClientError> {
        self.listing_calls.borrow_mut().push(request.clone());
        let key = (
            request.subreddit.clone(),
            request.method.to_string(),
            request.after.clone(),
        );
        self.listings
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(SubredditPostCollection::default()))
    }

    async fn fetch_comment_tree(
        &self,
        post_id: &str,
        focus: Option<&str>,
    ) -> Result<Vec<RawThing>, RedditClientError> {
        let key = (post_id.to_string(), focus.map(str::to_string));
        self.tree_calls.borrow_mut().push(key.clone());
        self.trees
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(RedditClientError::NotFound(format!("post {}", post_id))))
    }

    async fn fetch_more_children(
        &self,
        _post_id: &str,
        children: &[String],
    ) -> Result<Vec<RawThing>, RedditClientError> {
        self.more_calls.borrow_mut().push(children.to_vec());
        self.more
            .borrow_mut()
            .get_mut(&children.join(","))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A session over `api` with the stock throttle and a fast retry policy.
pub fn session(api: ScriptedApi) -> Session<ScriptedApi> {
    let retry = RetryConfig {
        max_retries: 2,
        base_delay_ms: 100,
        max_delay_ms: 1_000,
    };
    Session::new(api, &ThrottleConfig::default(), &retry)
}

pub fn server_error() -> RedditClientError {
    RedditClientError::HttpStatus(StatusCode::SERVICE_UNAVAILABLE)
}

pub fn post(id: &str, title: &str, score: i64) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "name": format!("t3_{id}"),
            "title": title,
            "author": "alice",
            "score": score,
            "num_comments": 3,
            "created_utc": 1735689600.0,
            "is_self": true,
            "selftext": format!("body of {id}"),
            "subreddit": "ethereum",
            "subreddit_name_prefixed": "r/ethereum"
        }
    })
}

pub fn page(posts: Vec<Value>, after: Option<&str>) -> Value {
    json!({
        "after": after,
        "dist": posts.len(),
        "children": posts,
        "before": null
    })
}

pub fn comment(id: &str, parent_id: &str, depth: u32, replies: Vec<Value>) -> Value {
    let replies = if replies.is_empty() {
        json!("")
    } else {
        json!({ "kind": "Listing", "data": { "children": replies, "after": null } })
    };
    json!({
        "kind": "t1",
        "data": {
            "id": id,
            "parent_id": parent_id,
            "author": "bob",
            "body": format!("comment {id}"),
            "score": 1,
            "created_utc": 1735689700.0,
            "depth": depth,
            "replies": replies
        }
    })
}

pub fn more(id: &str, parent_id: &str, children: &[&str]) -> Value {
    json!({
        "kind": "more",
        "data": {
            "id": id,
            "parent_id": parent_id,
            "count": children.len(),
            "depth": 1,
            "children": children
        }
    })
}

pub fn things(nodes: Vec<Value>) -> Vec<RawThing> {
    nodes
        .into_iter()
        .map(|node| serde_json::from_value(node).unwrap())
        .collect()
}
