mod common;

use axum::http::StatusCode;
use common::{TestApp, memory_pool_at};
use serde_json::json;
use soot_core::error::BUDGET_NOT_MIGRATED_MESSAGE;
use soot_server::db;
use soot_server::store::budget::MAX_AMOUNT_CENTS;

#[tokio::test]
async fn budget_routes_explain_a_missing_migration() {
    let app = TestApp::with_pool(memory_pool_at(Some("0001")).await);
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;

    let (status, body) = app
        .get(&format!("/houses/{}/budget/entries", house.id), &token)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], BUDGET_NOT_MIGRATED_MESSAGE);

    let (status, _) = app
        .post(
            &format!("/houses/{}/budget/recurring", house.id),
            &token,
            json!({ "label": "Loyer", "amount_cents": 90000, "kind": "expense", "day_of_month": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Other features keep working.
    let (status, _) = app.get(&format!("/houses/{}/tasks", house.id), &token).await;
    assert_eq!(status, StatusCode::OK);

    let applied = db::migrate(&app.pool).await.unwrap();
    assert_eq!(applied, vec!["0002_budget.sql"]);

    let (status, body) = app
        .get(&format!("/houses/{}/budget/entries", house.id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn monthly_summary_combines_entries_and_recurring_items() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;
    let base = format!("/houses/{}/budget", house.id);

    for (label, amount, kind, on) in [
        ("Salaire", 250000, "income", "2024-03-01"),
        ("Courses", 12050, "expense", "2024-03-09"),
        ("Courses", 8000, "expense", "2024-04-02"),
    ] {
        let (status, _) = app
            .post(
                &format!("{base}/entries"),
                &token,
                json!({ "label": label, "amount_cents": amount, "kind": kind, "occurred_on": on }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = app
        .post(
            &format!("{base}/recurring"),
            &token,
            json!({ "label": "Loyer", "amount_cents": 90000, "kind": "expense", "day_of_month": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, march) = app.get(&format!("{base}/entries?month=2024-03"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(march.as_array().unwrap().len(), 2);

    let (status, summary) = app.get(&format!("{base}/summary?month=2024-03"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["month"], "2024-03");
    assert_eq!(summary["income_cents"], 250000);
    assert_eq!(summary["expense_cents"], 102050);
    assert_eq!(summary["balance_cents"], 147950);
    assert_eq!(summary["entry_count"], 2);
    assert_eq!(summary["recurring_count"], 1);
}

#[tokio::test]
async fn invalid_budget_input_is_rejected() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;
    let base = format!("/houses/{}/budget", house.id);

    let (status, _) = app
        .post(
            &format!("{base}/entries"),
            &token,
            json!({ "label": "Courses", "amount_cents": 0, "kind": "expense", "occurred_on": "2024-03-09" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("{base}/entries"),
            &token,
            json!({ "label": "Courses", "amount_cents": 100, "kind": "gift", "occurred_on": "2024-03-09" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("{base}/recurring"),
            &token,
            json!({ "label": "Loyer", "amount_cents": 90000, "kind": "expense", "day_of_month": 32 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get(&format!("{base}/summary?month=mars"), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_amounts_are_refused_and_summary_stays_exact() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;
    let base = format!("/houses/{}/budget", house.id);

    for amount in [i64::MAX, MAX_AMOUNT_CENTS + 1] {
        let (status, _) = app
            .post(
                &format!("{base}/entries"),
                &token,
                json!({ "label": "Héritage", "amount_cents": amount, "kind": "income", "occurred_on": "2024-03-01" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
    }
    let (status, _) = app
        .post(
            &format!("{base}/recurring"),
            &token,
            json!({ "label": "Loyer", "amount_cents": i64::MAX, "kind": "expense", "day_of_month": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for _ in 0..2 {
        let (status, _) = app
            .post(
                &format!("{base}/entries"),
                &token,
                json!({ "label": "Héritage", "amount_cents": MAX_AMOUNT_CENTS, "kind": "income", "occurred_on": "2024-03-01" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, summary) = app.get(&format!("{base}/summary?month=2024-03"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["income_cents"], 2 * MAX_AMOUNT_CENTS);
    assert_eq!(summary["balance_cents"], 2 * MAX_AMOUNT_CENTS);
}
