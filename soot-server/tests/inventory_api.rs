mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn catalog_entries_link_into_calendar_context() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;

    let (status, zone) = app
        .post(
            &format!("/houses/{}/catalog/zones", house.id),
            &token,
            json!({ "name": "Jardin", "color": "#22aa55" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let zone_id = zone["id"].as_str().unwrap();

    let (status, equipment) = app
        .post(
            &format!("/houses/{}/equipment", house.id),
            &token,
            json!({ "name": "Tondeuse", "zone_id": zone_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let equipment_id = equipment["id"].as_str().unwrap();

    let (status, _) = app
        .post(
            &format!("/houses/{}/tasks", house.id),
            &token,
            json!({
                "title": "Affûter la lame",
                "due_date": "2024-04-10",
                "reminder_offset_days": 3,
                "zone_id": zone_id,
                "equipment_id": equipment_id,
                "assignee_id": &alice.id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, calendar) = app
        .get(&format!("/houses/{}/calendar?from=2024-04-01&to=2024-04-30", house.id), &token)
        .await;
    let items = calendar["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["kind"], "reminder");
    assert_eq!(items[0]["date"], "2024-04-07");
    assert_eq!(items[1]["kind"], "task");

    let context = &items[1]["context"];
    assert_eq!(context["zone"]["name"], "Jardin");
    assert_eq!(context["equipment"]["name"], "Tondeuse");
    assert_eq!(context["assignee"]["id"], alice.id.as_str());
    assert!(context["category"].is_null());
}

#[tokio::test]
async fn catalog_input_is_checked() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;

    let (status, _) = app
        .post(&format!("/houses/{}/catalog/zones", house.id), &token, json!({ "name": "Cave", "color": "rouge" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&format!("/houses/{}/catalog/vehicles", house.id), &token, json!({ "name": "Vélo" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for kind in ["categories", "animals", "people"] {
        let (status, _) = app
            .post(&format!("/houses/{}/catalog/{kind}", house.id), &token, json!({ "name": "Test" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{kind}");
        let (_, list) = app.get(&format!("/houses/{}/catalog/{kind}", house.id), &token).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn zones_from_another_house_cannot_be_linked() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let first = app.house(&alice, "Maison").await;
    let second = app.house(&alice, "Chalet").await;

    let (_, zone) = app
        .post(&format!("/houses/{}/catalog/zones", second.id), &token, json!({ "name": "Grenier" }))
        .await;

    let (status, _) = app
        .post(
            &format!("/houses/{}/projects", first.id),
            &token,
            json!({ "name": "Isolation", "zone_id": zone["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_items_checks_membership() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;
    let house = app.house(&alice, "Maison").await;

    let (_, project) = app
        .post(&format!("/houses/{}/projects", house.id), &token, json!({ "name": "Véranda" }))
        .await;
    let uri = format!("/projects/{}", project["id"].as_str().unwrap());

    let (status, _) = app.delete(&uri, &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = app.get(&format!("/houses/{}/projects", house.id), &token).await;
    assert!(list.as_array().unwrap().is_empty());
}
