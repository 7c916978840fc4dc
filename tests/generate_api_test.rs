mod common;

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use common::{client, spawn_app_with};
use serde_json::{json, Value};

/// A stand-in for the Coze API: conversation create plus a canned SSE body.
async fn spawn_mock_coze(chat_body: &'static str) -> String {
    let router = Router::new()
        .route(
            "/v1/conversation/create",
            post(|| async { Json(json!({ "code": 0, "data": { "id": "conv-1" } })) }),
        )
        .route(
            "/v3/chat",
            post(move || async move {
                ([(header::CONTENT_TYPE, "text/event-stream")], chat_body).into_response()
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn delta(content: &str) -> String {
    format!(
        "event: conversation.message.delta\ndata: {}\n\n",
        json!({ "type": "answer", "content": content })
    )
}

#[tokio::test]
async fn generate_names_streams_candidates_and_saves_history() {
    let mut body = String::new();
    body.push_str(&delta("文字：安然\n关联：平安喜乐\n英文翻译："));
    body.push_str(&delta("Serenity\nDone."));
    body.push_str(&delta("文字：明远\n关联：志向高远\n英文翻译：Farsighted\nDone."));
    body.push_str("event: done\ndata: \"[DONE]\"\n\n");
    let mock_base = spawn_mock_coze(Box::leak(body.into_boxed_str())).await;

    let app = spawn_app_with(|config| {
        config.coze.api_base = mock_base.clone();
        config.coze.api_key = "test-key".into();
        config.coze.bot_id = "name-bot".into();
        config.coze.image_bot_id = "image-bot".into();
        config.coze.user_id = "svc".into();
    })
    .await;
    let http = client();

    let resp = http
        .post(format!("{}/api/generate/names", app.base_url))
        .json(&json!({
            "englishName": "Ada",
            "characterCount": "two",
            "unwantedHanzi": "",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stream = resp.text().await.unwrap();

    assert!(stream.contains("event: name"));
    assert!(stream.contains("安然"));
    assert!(stream.contains("明远"));
    assert!(stream.contains("event: done"));
    assert!(stream.contains("\"count\":2"));

    // The completed stream was persisted, attributed to the queried name
    let records: Vec<Value> = http
        .get(format!("{}/api/history/get?username=Ada", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["characterCount"], json!("双字"));
    assert_eq!(records[0]["generatedNames"][0]["text"], json!("安然"));
    assert_eq!(records[0]["generatedNames"][1]["text"], json!("明远"));
}

#[tokio::test]
async fn generate_names_with_unparseable_reply_yields_empty_done() {
    let mut body = String::new();
    body.push_str(&delta("抱歉，我不明白这个请求。"));
    body.push_str("event: done\ndata: \"[DONE]\"\n\n");
    let mock_base = spawn_mock_coze(Box::leak(body.into_boxed_str())).await;

    let app = spawn_app_with(|config| {
        config.coze.api_base = mock_base.clone();
        config.coze.api_key = "test-key".into();
        config.coze.bot_id = "name-bot".into();
    })
    .await;

    let resp = client()
        .post(format!("{}/api/generate/names", app.base_url))
        .json(&json!({ "englishName": "Ada", "characterCount": "one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stream = resp.text().await.unwrap();

    assert!(!stream.contains("event: name"));
    assert!(stream.contains("event: done"));
    assert!(stream.contains("\"count\":0"));

    // Nothing to persist
    let records: Vec<Value> = client()
        .get(format!("{}/api/history/get?username=Ada", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn generate_names_requires_english_name() {
    let app = spawn_app_with(|_| {}).await;
    let resp = client()
        .post(format!("{}/api/generate/names", app.base_url))
        .json(&json!({ "englishName": "  ", "characterCount": "two" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn generate_images_streams_urls_and_saves_history() {
    let mut body = String::new();
    body.push_str(&delta("第一张 ![卷轴](https://s.coze.cn/t/abc123/)"));
    body.push_str(&delta(" 第二张 ![印章](https://s.coze.cn/t/def456/) 完毕"));
    body.push_str("event: done\ndata: \"[DONE]\"\n\n");
    let mock_base = spawn_mock_coze(Box::leak(body.into_boxed_str())).await;

    let app = spawn_app_with(|config| {
        config.coze.api_base = mock_base.clone();
        config.coze.api_key = "test-key".into();
        config.coze.image_bot_id = "image-bot".into();
    })
    .await;
    let http = client();

    // Logged-in callers get their image history attributed to them
    http.post(format!("{}/api/auth/register", app.base_url))
        .json(&json!({ "username": "ada", "password": "pw" }))
        .send()
        .await
        .unwrap();

    let resp = http
        .post(format!("{}/api/generate/images", app.base_url))
        .json(&json!({ "prompt": "平安喜乐的意境" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stream = resp.text().await.unwrap();

    assert!(stream.contains("event: image"));
    assert!(stream.contains("https://s.coze.cn/t/abc123/"));
    assert!(stream.contains("https://s.coze.cn/t/def456/"));
    assert!(stream.contains("\"count\":2"));

    let records: Vec<Value> = http
        .get(format!(
            "{}/api/image-history/get?username=ada",
            app.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["prompt"], json!("平安喜乐的意境"));
    assert_eq!(
        records[0]["imageUrls"],
        json!(["https://s.coze.cn/t/abc123/", "https://s.coze.cn/t/def456/"])
    );
}
