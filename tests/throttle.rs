#[path = "common/mod.rs"]
mod common;

use common::*;
use redharvest::client::ListingRequest;
use redharvest::models::ListingMethod;
use redharvest::operations::{CommentsOperation, CommentsOptions};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{self, Instant};

fn within_a_tick(actual: Duration, expected: Duration) -> bool {
    actual >= expected && actual < expected + Duration::from_secs(1)
}

/// The 31st call of a window sleeps out what is left of it and opens a new
/// window holding only that call.
#[tokio::test(start_paused = true)]
async fn the_thirty_first_call_waits_for_the_rest_of_the_window() {
    let mut session = session(ScriptedApi::new());
    let start = Instant::now();
    let children = vec!["x".to_string()];

    for _ in 0..30 {
        session.more_children("p1", &children).await.unwrap();
    }
    assert_eq!(session.throttle().count(), 30);
    assert_eq!(start.elapsed(), Duration::ZERO);

    time::advance(Duration::from_secs(15)).await;
    session.more_children("p1", &children).await.unwrap();

    assert_eq!(session.throttle().count(), 1);
    assert!(within_a_tick(start.elapsed(), Duration::from_secs(60)), "elapsed {:?}", start.elapsed());
    let new_window = session.throttle().window_start() - start;
    assert!(within_a_tick(new_window, Duration::from_secs(60)), "window {new_window:?}");
    assert_eq!(session.api().more_calls.borrow().len(), 31);
}

#[tokio::test(start_paused = true)]
async fn an_expired_window_resets_without_waiting() {
    let mut session = session(ScriptedApi::new());
    let children = vec!["x".to_string()];
    for _ in 0..30 {
        session.more_children("p1", &children).await.unwrap();
    }

    time::advance(Duration::from_secs(61)).await;
    let before = Instant::now();
    session.more_children("p1", &children).await.unwrap();

    assert_eq!(before.elapsed(), Duration::ZERO);
    assert_eq!(session.throttle().count(), 1);
}

/// Fetching one large thread paces itself: a tree fetch plus 35 expansions
/// is 36 calls, so one pause lands between the 30th and 31st.
#[tokio::test(start_paused = true)]
async fn a_large_thread_is_paced_by_the_session() {
    let placeholders: Vec<Value> = (0..35)
        .map(|i| more(&format!("m{i}"), "t3_p1", &[format!("k{i}").as_str()]))
        .collect();
    let api = ScriptedApi::new().tree("p1", None, placeholders);
    let mut session = session(api);
    let operation = CommentsOperation::new(CommentsOptions {
        max_expansions: 40,
        error_cooldown: Duration::from_secs(65),
    });

    let start = Instant::now();
    operation.fetch(&mut session, "p1").await;

    assert_eq!(session.api().tree_calls.borrow().len(), 1);
    assert_eq!(session.api().more_calls.borrow().len(), 35);
    assert_eq!(session.throttle().count(), 6);
    assert!(within_a_tick(start.elapsed(), Duration::from_secs(60)), "elapsed {:?}", start.elapsed());
}

/// Retries are outbound calls too and are counted like any other.
#[tokio::test(start_paused = true)]
async fn retried_calls_are_counted() {
    let api = ScriptedApi::new()
        .listing_reply("ethereum", "hot", None, Err(server_error()))
        .listing_reply("ethereum", "hot", None, Err(server_error()))
        .listing("ethereum", "hot", None, page(vec![post("p1", "One", 1)], None));
    let mut session = session(api);
    let request = ListingRequest {
        subreddit: "ethereum".to_string(),
        method: ListingMethod::Hot,
        limit: 10,
        after: None,
        time_filter: None,
    };

    let listing = session.listing(&request).await.unwrap();

    assert_eq!(listing.children.len(), 1);
    assert_eq!(session.throttle().count(), 3);
    assert_eq!(session.api().listing_calls.borrow().len(), 3);
}
