mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn requests_without_session_are_rejected() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;

    let uri = format!("/houses/{}/important-dates", house.id);
    let (status, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentification requise");

    let (status, _) = app.request(Method::GET, &uri, Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_date_is_a_bad_request() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;
    let uri = format!("/houses/{}/important-dates", house.id);

    for bad in ["2024-3-5", "05/03/2024", "2024-02-30", ""] {
        let (status, body) = app
            .post(&uri, &token, json!({ "title": "Anniversaire", "date": bad }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "date {bad:?}");
        assert!(body["error"].as_str().unwrap().contains("Date invalide"));
    }

    let (status, _) = app.post(&uri, &token, json!({ "title": "Anniversaire" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&uri, &token, json!({ "title": "  ", "date": "2024-03-05" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Le titre est obligatoire");
}

#[tokio::test]
async fn create_list_and_expand_over_a_range() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;
    let uri = format!("/houses/{}/important-dates", house.id);

    let (status, created) = app
        .post(
            &uri,
            &token,
            json!({
                "title": "Anniversaire de Léa",
                "date": "1990-06-15",
                "recurring_yearly": true,
                "type": "birthday"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["date_type"], "birthday");
    assert!(created["next_occurrence"].is_string());

    app.post(&uri, &token, json!({ "title": "Contrôle technique", "date": "2024-09-01", "type": "deadline" }))
        .await;

    let (status, list) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["important_dates"].as_array().unwrap().len(), 2);
    assert!(list.get("occurrences").is_none());

    let (status, list) = app
        .get(&format!("{uri}?from=2024-01-01&to=2025-12-31"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let occurrences = list["occurrences"].as_array().unwrap();
    let dates: Vec<&str> = occurrences.iter().map(|o| o["date"].as_str().unwrap()).collect();
    assert_eq!(dates, vec!["2024-06-15", "2024-09-01", "2025-06-15"]);
    assert_eq!(occurrences[0]["years_since"], 34);
    assert_eq!(occurrences[2]["years_since"], 35);

    let (status, _) = app.get(&format!("{uri}?from=2024-01-01"), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_updates_and_clears_fields() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice@example.com").await;
    let house = app.house(&alice, "Maison").await;

    let (_, created) = app
        .post(
            &format!("/houses/{}/important-dates", house.id),
            &token,
            json!({ "title": "Mariage", "date": "2015-05-23", "notes": "Salle des fêtes" }),
        )
        .await;
    let uri = format!("/important-dates/{}", created["id"].as_str().unwrap());

    let (status, updated) = app
        .patch(&uri, &token, json!({ "recurring_yearly": true, "type": "anniversary", "notes": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["recurring_yearly"], true);
    assert_eq!(updated["date_type"], "anniversary");
    assert!(updated["notes"].is_null());
    assert_eq!(updated["title"], "Mariage");

    let (status, _) = app.patch(&uri, &token, json!({ "date": "23/05/2015" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.patch(&uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_distinguishes_unknown_from_foreign() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;
    let alice_house = app.house(&alice, "Chez Alice").await;
    app.house(&bob, "Chez Bob").await;

    let (status, body) = app.delete("/important-dates/does-not-exist", &alice_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Date importante introuvable");

    let (_, created) = app
        .post(
            &format!("/houses/{}/important-dates", alice_house.id),
            &alice_token,
            json!({ "title": "Fête", "date": "2024-07-14" }),
        )
        .await;
    let uri = format!("/important-dates/{}", created["id"].as_str().unwrap());

    let (status, body) = app.delete(&uri, &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Accès refusé");

    let (status, _) = app.delete(&uri, &alice_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&uri, &alice_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_another_house_is_forbidden() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;
    let house = app.house(&alice, "Chez Alice").await;

    let (status, _) = app
        .get(&format!("/houses/{}/important-dates", house.id), &bob_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/houses/nope/important-dates", &bob_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Maison introuvable");
}
