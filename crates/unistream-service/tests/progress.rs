//! Community progress, ledger history and point redemption integration tests.

mod common;

use axum::http::{header, StatusCode};
use common::TestHarness;
use serde_json::json;

use unistream_core::Role;

/// Catalog id of the seeded "ULIMA GOAT" gift (100 coins).
const GOAT: i64 = 5;
/// Catalog id of the seeded "Rosa" gift (5 coins).
const ROSA: i64 = 1;

async fn gift(harness: &TestHarness, fan: &common::TestUser, streamer: &common::TestUser, gift_id: i64) {
    harness
        .server
        .post("/v1/gifts/send")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .json(&json!({"streamer_id": streamer.id, "gift_id": gift_id}))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn progress_is_tracked_per_streamer() {
    let harness = TestHarness::new();
    let fan = harness.fan(1000).await;
    let gozu = harness.streamer().await;
    let luna = harness.user("Luna", Role::Streamer, 0, 0).await;

    gift(&harness, &fan, &gozu, GOAT).await; // 1000 XP
    gift(&harness, &fan, &luna, ROSA).await; // 50 XP
    gift(&harness, &fan, &luna, ROSA).await; // 50 XP

    let response = harness
        .server
        .get("/v1/users/me/community-progress")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let streamers = body["streamers"].as_array().unwrap();
    assert_eq!(streamers.len(), 2);

    assert_eq!(streamers[0]["streamer_name"], "Gozu");
    assert_eq!(streamers[0]["xp_local"], 1000);
    assert_eq!(streamers[0]["current_level"], 3);

    assert_eq!(streamers[1]["streamer_name"], "Luna");
    assert_eq!(streamers[1]["xp_local"], 100);
    assert_eq!(streamers[1]["current_level"], 1);
    assert_eq!(streamers[1]["points_to_next_level"], 400);
    assert_eq!(streamers[1]["progress_percent"], 20);
}

#[tokio::test]
async fn threshold_change_applies_retroactively() {
    let harness = TestHarness::new();
    let fan = harness.fan(1000).await;
    let streamer = harness.streamer().await;

    gift(&harness, &fan, &streamer, GOAT).await; // 1000 XP

    let response = harness
        .server
        .patch("/v1/streamer/settings")
        .add_header(header::AUTHORIZATION, streamer.bearer())
        .json(&json!({"level_threshold": 100}))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["level_threshold"], 100);

    let body: serde_json::Value = harness
        .server
        .get("/v1/users/me/community-progress")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await
        .json();
    assert_eq!(body["streamers"][0]["xp_threshold"], 100);
    assert_eq!(body["streamers"][0]["current_level"], 11);
}

#[tokio::test]
async fn threshold_has_a_floor() {
    let harness = TestHarness::new();
    let streamer = harness.streamer().await;
    let fan = harness.fan(0).await;

    let response = harness
        .server
        .patch("/v1/streamer/settings")
        .add_header(header::AUTHORIZATION, streamer.bearer())
        .json(&json!({"level_threshold": 49}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .patch("/v1/streamer/settings")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .json(&json!({"level_threshold": 100}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn fan_without_gifts_has_no_progress() {
    let harness = TestHarness::new();
    let fan = harness.fan(0).await;

    let body: serde_json::Value = harness
        .server
        .get("/v1/users/me/community-progress")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await
        .json();
    assert!(body["streamers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn transactions_are_paginated() {
    let harness = TestHarness::new();
    let fan = harness.fan(100).await;
    let streamer = harness.streamer().await;

    for _ in 0..3 {
        gift(&harness, &fan, &streamer, ROSA).await;
    }

    let response = harness
        .server
        .get("/v1/users/me/transactions?limit=2")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(body["has_more"], true);
    assert_eq!(body["transactions"][0]["kind"], "GIFT");

    let body: serde_json::Value = harness
        .server
        .get("/v1/users/me/transactions?limit=2&offset=2")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await
        .json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn redeem_points_for_coins() {
    let harness = TestHarness::new();
    let fan = harness.user("Fan", Role::Fan, 3, 250).await;

    let response = harness
        .server
        .post("/v1/store/redeem")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["coins"], 13);
    assert_eq!(body["points"], 150);
    assert_eq!(body["points_spent"], 100);
    assert_eq!(body["coins_granted"], 10);
}

#[tokio::test]
async fn redeem_without_enough_points_fails() {
    let harness = TestHarness::new();
    let fan = harness.user("Fan", Role::Fan, 0, 99).await;

    let response = harness
        .server
        .post("/v1/store/redeem")
        .add_header(header::AUTHORIZATION, fan.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_points");

    let user = harness.reload(&fan.id).await;
    assert_eq!((user.coins, user.points), (0, 99));
}
