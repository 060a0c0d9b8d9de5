//! Level and streak integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use levelup_service::OrchestratorConfig;
use serde_json::{json, Value};

// ============================================================================
// Levels
// ============================================================================

#[tokio::test]
async fn new_user_starts_at_level_one() {
    let harness = TestHarness::new();

    let body: Value = harness.server.get(&harness.user_path("/level")).await.json();
    assert_eq!(body["currentLevel"], 1);
    assert_eq!(body["totalExperience"], 0);
    assert_eq!(body["experienceToNextLevel"], 100);
}

#[tokio::test]
async fn level_up_awards_points() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post(&harness.user_path("/level/experience"))
        .json(&json!({ "amount": 250, "source": "lesson" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["value"]["currentLevel"], 3);
    assert_eq!(body["value"]["currentExperience"], 50);
    assert_eq!(body["events"][0]["type"], "level_up");
    assert_eq!(body["events"][0]["previousLevel"], 1);
    assert_eq!(body["events"][0]["newLevel"], 3);
    assert_eq!(body["events"][1]["type"], "points_awarded");

    assert_eq!(harness.balance().await, 30);
}

#[tokio::test]
async fn experience_below_threshold_has_no_events() {
    let harness = TestHarness::new();

    let body: Value = harness
        .server
        .post(&harness.user_path("/level/experience"))
        .json(&json!({ "amount": 40 }))
        .await
        .json();

    assert_eq!(body["value"]["currentLevel"], 1);
    assert_eq!(body["events"], json!([]));
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn level_up_award_can_be_disabled() {
    let harness = TestHarness::with_orchestrator(OrchestratorConfig {
        level_up_points_per_level: 0,
        ..OrchestratorConfig::default()
    });

    let body: Value = harness
        .server
        .post(&harness.user_path("/level/experience"))
        .json(&json!({ "amount": 100 }))
        .await
        .json();

    assert_eq!(body["value"]["currentLevel"], 2);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
    assert_eq!(harness.balance().await, 0);
}

// ============================================================================
// Streaks
// ============================================================================

async fn activity(harness: &TestHarness, date: &str) -> Value {
    let response = harness
        .server
        .post(&harness.user_path("/streaks/daily_login/activity"))
        .json(&json!({ "activityDate": date }))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn consecutive_days_extend_the_streak() {
    let harness = TestHarness::new();

    let first = activity(&harness, "2026-03-01T09:00:00Z").await;
    assert_eq!(first["value"]["currentStreak"], 1);
    assert_eq!(first["events"][0]["transition"], "started");

    let same_day = activity(&harness, "2026-03-01T20:00:00Z").await;
    assert_eq!(same_day["value"]["currentStreak"], 1);
    assert_eq!(same_day["events"][0]["transition"], "unchanged");

    let next_day = activity(&harness, "2026-03-02T21:00:00Z").await;
    assert_eq!(next_day["value"]["currentStreak"], 2);
    assert_eq!(next_day["value"]["longestStreak"], 2);
    assert_eq!(next_day["events"][0]["transition"], "continued");
}

#[tokio::test]
async fn gap_resets_the_streak_but_keeps_longest() {
    let harness = TestHarness::new();

    activity(&harness, "2026-03-01T09:00:00Z").await;
    activity(&harness, "2026-03-02T09:00:00Z").await;
    activity(&harness, "2026-03-03T09:00:00Z").await;
    let after_gap = activity(&harness, "2026-03-07T09:00:00Z").await;

    assert_eq!(after_gap["value"]["currentStreak"], 1);
    assert_eq!(after_gap["value"]["longestStreak"], 3);
    assert_eq!(after_gap["events"][0]["transition"], "reset");
}

#[tokio::test]
async fn milestone_awards_points_when_enabled() {
    let harness = TestHarness::with_orchestrator(OrchestratorConfig {
        streak_milestone_rewards: true,
        ..OrchestratorConfig::default()
    });

    for day in 1..=7 {
        activity(&harness, &format!("2026-03-{day:02}T09:00:00Z")).await;
    }

    // 7 days is the first milestone
    assert_eq!(harness.balance().await, 50);
}

#[tokio::test]
async fn streaks_are_listed_and_fetched_by_type() {
    let harness = TestHarness::new();
    activity(&harness, "2026-03-01T09:00:00Z").await;

    let list: Value = harness.server.get(&harness.user_path("/streaks")).await.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["type"], "daily_login");

    harness
        .server
        .get(&harness.user_path("/streaks/daily_login"))
        .await
        .assert_status_ok();

    harness
        .server
        .get(&harness.user_path("/streaks/weekly_quiz"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
