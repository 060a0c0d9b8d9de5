//! Point ledger integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn empty_ledger_has_zero_balance() {
    let harness = TestHarness::new();

    let response = harness.server.get(&harness.user_path("/points")).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["total"], 0);
    assert_eq!(body["byCategory"], json!({}));
}

#[tokio::test]
async fn balance_sums_by_category() {
    let harness = TestHarness::new();

    for (amount, category) in [(30, "quiz"), (20, "quiz"), (15, "social")] {
        harness
            .server
            .post(&harness.user_path("/points/add"))
            .json(&json!({ "amount": amount, "source": "test", "category": category }))
            .await
            .assert_status_ok();
    }

    let body: Value = harness.server.get(&harness.user_path("/points")).await.json();
    assert_eq!(body["total"], 65);
    assert_eq!(body["byCategory"]["quiz"], 50);
    assert_eq!(body["byCategory"]["social"], 15);
}

// ============================================================================
// Add and Deduct
// ============================================================================

#[tokio::test]
async fn add_points_records_running_balance() {
    let harness = TestHarness::new();
    harness.fund(40).await;

    let response = harness
        .server
        .post(&harness.user_path("/points/add"))
        .json(&json!({ "amount": 10, "source": "lesson", "description": "Lesson done" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["value"]["amount"], 10);
    assert_eq!(body["value"]["balance"], 50);
    assert_eq!(body["events"][0]["type"], "points_awarded");
    assert_eq!(body["events"][0]["balance"], 50);
}

#[tokio::test]
async fn deduct_points_may_go_negative() {
    let harness = TestHarness::new();
    harness.fund(10).await;

    let response = harness
        .server
        .post(&harness.user_path("/points/deduct"))
        .json(&json!({ "amount": 25, "source": "penalty" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["value"]["amount"], -25);
    assert_eq!(body["events"][0]["type"], "points_deducted");
    assert_eq!(harness.balance().await, -15);
}

#[tokio::test]
async fn non_positive_amount_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post(&harness.user_path("/points/add"))
        .json(&json!({ "amount": 0, "source": "test" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_DATA");
}

#[tokio::test]
async fn overflowing_balance_is_rejected() {
    let harness = TestHarness::new();
    harness.fund(i64::MAX).await;

    let response = harness
        .server
        .post(&harness.user_path("/points/add"))
        .json(&json!({ "amount": 1, "source": "test" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_DATA");
    assert_eq!(harness.balance().await, i64::MAX);
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn transactions_are_newest_first_and_limited() {
    let harness = TestHarness::new();
    for amount in [1, 2, 3] {
        harness.fund(amount).await;
    }

    let all: Value = harness
        .server
        .get(&harness.user_path("/points/transactions"))
        .await
        .json();
    let amounts: Vec<i64> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["amount"].as_i64().unwrap())
        .collect();
    assert_eq!(amounts, vec![3, 2, 1]);

    let limited: Value = harness
        .server
        .get(&harness.user_path("/points/transactions"))
        .add_query_param("limit", 2)
        .await
        .json();
    assert_eq!(limited.as_array().unwrap().len(), 2);
    assert_eq!(limited[0]["amount"], 3);
}

#[tokio::test]
async fn invalid_user_id_is_rejected() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/users/a:b/points").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_DATA");
}
