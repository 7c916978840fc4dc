mod common;

use common::{client, spawn_app};
use serde_json::{json, Value};

#[tokio::test]
async fn register_logs_in_and_me_returns_profile() {
    let app = spawn_app().await;
    let http = client();

    let resp = http
        .post(format!("{}/api/auth/register", app.base_url))
        .json(&json!({ "username": "ada", "password": "lovelace" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["username"], json!("ada"));
    assert_eq!(body["user"]["isGuest"], json!(false));

    let me: Value = http
        .get(format!("{}/api/auth/me", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], json!("ada"));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = spawn_app().await;
    let http = client();

    let first = http
        .post(format!("{}/api/auth/register", app.base_url))
        .json(&json!({ "username": "ada", "password": "one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = client()
        .post(format!("{}/api/auth/register", app.base_url))
        .json(&json!({ "username": "ada", "password": "two" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn lockout_rejects_correct_password_inside_window() {
    let app = spawn_app().await;
    let http = client();

    http.post(format!("{}/api/auth/register", app.base_url))
        .json(&json!({ "username": "ada", "password": "correct" }))
        .send()
        .await
        .unwrap();

    // Five consecutive failures; the fifth locks the account
    for i in 0..5 {
        let resp = http
            .post(format!("{}/api/auth/login", app.base_url))
            .json(&json!({ "username": "ada", "password": "wrong" }))
            .send()
            .await
            .unwrap();
        if i < 4 {
            assert_eq!(resp.status(), 401, "attempt {} should be unauthorized", i);
        } else {
            assert_eq!(resp.status(), 403, "attempt {} should lock", i);
        }
    }

    // Correct credentials are still rejected inside the lock window
    let resp = http
        .post(format!("{}/api/auth/login", app.base_url))
        .json(&json!({ "username": "ada", "password": "correct" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn guest_assignment_allocates_user_prefixed_identity() {
    let app = spawn_app().await;
    let http = client();

    let resp = http
        .post(format!("{}/api/auth/guest", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let username = body["user"]["username"].as_str().unwrap();
    assert!(username.starts_with("User"));
    assert_eq!(username.len(), 10);
    assert!(username[4..].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(body["user"]["isGuest"], json!(true));

    // The guest session works like any other
    let me: Value = http
        .get(format!("{}/api/auth/me", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], json!(username));
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = spawn_app().await;
    let http = client();

    http.post(format!("{}/api/auth/register", app.base_url))
        .json(&json!({ "username": "ada", "password": "pw" }))
        .send()
        .await
        .unwrap();

    let resp = http
        .post(format!("{}/api/auth/logout", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = http
        .get(format!("{}/api/auth/me", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn generator_state_requires_auth() {
    let app = spawn_app().await;
    let resp = client()
        .get(format!("{}/api/generator/state", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn generator_state_roundtrip() {
    let app = spawn_app().await;
    let http = client();

    http.post(format!("{}/api/auth/guest", app.base_url))
        .send()
        .await
        .unwrap();

    // Nothing saved yet
    let empty: Value = http
        .get(format!("{}/api/generator/state", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty, Value::Null);

    let snapshot = json!({
        "englishName": "Ada",
        "selectedNumber": "two",
        "generatedNames": [
            { "text": "安然", "association": "平安", "translation": "Serenity" }
        ],
        "selectedNameIndex": 0,
    });
    let resp = http
        .put(format!("{}/api/generator/state", app.base_url))
        .json(&snapshot)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let restored: Value = http
        .get(format!("{}/api/generator/state", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restored, snapshot);

    // Saving again overwrites the previous snapshot
    let updated = json!({ "englishName": "Grace" });
    http.put(format!("{}/api/generator/state", app.base_url))
        .json(&updated)
        .send()
        .await
        .unwrap();
    let restored: Value = http
        .get(format!("{}/api/generator/state", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restored, updated);
}
