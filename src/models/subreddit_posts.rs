use chrono::DateTime;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::PostRecord;

/// Top-level response for subreddit listings
#[derive(Deserialize, Debug)]
pub struct SubredditPostsResponse {
    pub kind: String,
    pub data: SubredditPostCollection,
}

/// Collection of posts in a subreddit listing
#[derive(Deserialize, Debug, Default)]
pub struct SubredditPostCollection {
    pub after: Option<String>,
    #[serde(default)]
    pub dist: Option<i32>,
    #[serde(default)]
    pub children: Vec<SubredditPostEntity>,
    pub before: Option<String>,
}

/// Reddit post entity with kind and data fields
#[derive(Deserialize, Debug)]
pub struct SubredditPostEntity {
    pub kind: String,
    pub data: SubredditPostData,
}

/// Post data as returned by any listing endpoint.
///
/// Listings served under load sometimes drop fields, so everything except
/// the identifier and creation time falls back to a default.
#[derive(Deserialize, Debug, Clone)]
pub struct SubredditPostData {
    // Basic post information
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url: String,
    pub created_utc: f64,

    // Post type and content
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub over_18: bool,

    // Post metrics
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,

    // Subreddit information
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub subreddit_name_prefixed: String,

    // Additional fields we don't explicitly model
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl SubredditPostData {
    /// Flatten the post into a table row tagged with the listing it came from.
    pub fn to_record(&self, method: &str) -> PostRecord {
        PostRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            score: self.score,
            num_comments: self.num_comments,
            created_utc: self.created_utc,
            text: self.selftext.clone(),
            subreddit: self.subreddit.clone(),
            method: method.to_string(),
        }
    }

    /// `created_utc` in UTC, or the raw epoch seconds when out of range.
    pub fn format_timestamp(&self) -> String {
        match DateTime::from_timestamp(self.created_utc as i64, 0) {
            Some(timestamp) => timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => format!("{} (epoch)", self.created_utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> serde_json::Value {
        json!({
            "kind": "Listing",
            "data": {
                "after": "t3_def",
                "dist": 2,
                "modhash": "",
                "geo_filter": null,
                "before": null,
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "id": "abc",
                            "name": "t3_abc",
                            "title": "Solana validators update",
                            "author": "alice",
                            "permalink": "/r/solana/comments/abc/",
                            "url": "https://reddit.com/r/solana/comments/abc/",
                            "created_utc": 1735689600.0,
                            "is_self": true,
                            "selftext": "body text",
                            "score": 42,
                            "num_comments": 7,
                            "subreddit": "solana",
                            "subreddit_name_prefixed": "r/solana",
                            "upvote_ratio": 0.97
                        }
                    },
                    {
                        "kind": "t3",
                        "data": { "id": "def", "created_utc": 1735689700.0 }
                    }
                ]
            }
        })
    }

    #[test]
    fn it_parses_a_listing_with_sparse_posts() {
        let parsed: SubredditPostsResponse = serde_json::from_value(listing()).unwrap();
        assert_eq!(parsed.kind, "Listing");
        assert_eq!(parsed.data.after.as_deref(), Some("t3_def"));
        assert_eq!(parsed.data.children.len(), 2);

        let sparse = &parsed.data.children[1].data;
        assert_eq!(sparse.id, "def");
        assert_eq!(sparse.title, "");
        assert_eq!(sparse.score, 0);
    }

    #[test]
    fn it_keeps_unmodelled_fields() {
        let parsed: SubredditPostsResponse = serde_json::from_value(listing()).unwrap();
        let post = &parsed.data.children[0].data;
        assert_eq!(post.additional_fields["upvote_ratio"], json!(0.97));
    }

    #[test]
    fn it_converts_a_post_into_a_tagged_record() {
        let parsed: SubredditPostsResponse = serde_json::from_value(listing()).unwrap();
        let record = parsed.data.children[0].data.to_record("top_month");
        assert_eq!(record.id, "abc");
        assert_eq!(record.title, "Solana validators update");
        assert_eq!(record.score, 42);
        assert_eq!(record.num_comments, 7);
        assert_eq!(record.text, "body text");
        assert_eq!(record.subreddit, "solana");
        assert_eq!(record.method, "top_month");
    }

    #[test]
    fn it_formats_its_timestamp_in_utc() {
        let parsed: SubredditPostsResponse = serde_json::from_value(listing()).unwrap();
        let post = &parsed.data.children[0].data;
        assert_eq!(post.format_timestamp(), "2025-01-01 00:00:00 UTC");
    }

    #[test]
    fn it_shows_the_raw_epoch_when_the_timestamp_is_out_of_range() {
        let parsed: SubredditPostsResponse = serde_json::from_value(listing()).unwrap();
        let mut post = parsed.data.children[0].data.clone();
        post.created_utc = 1e20;
        assert_eq!(post.format_timestamp(), "100000000000000000000 (epoch)");
    }
}
