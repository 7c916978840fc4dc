use std::collections::VecDeque;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::coze::parse::{ImageParser, NameParser};
use crate::coze::sse::{CozeEvent, SseDecoder};
use crate::coze::{self, CharacterCount};
use crate::db::models::GeneratedName;
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::routes::{history, image_history};
use crate::state::{AppState, DbPool};

/// Attribution used when no user can be associated with a record.
const ANONYMOUS_USER: &str = "未命名用户";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateNamesRequest {
    pub english_name: String,
    pub character_count: CharacterCount,
    #[serde(default)]
    pub unwanted_hanzi: String,
}

#[derive(Deserialize)]
pub struct GenerateImagesRequest {
    pub prompt: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/generate/names", post(generate_names))
        .route("/api/generate/images", post(generate_images))
}

/// POST /api/generate/names — relay the name bot's reply as SSE.
///
/// Each parsed candidate is sent as a `name` event with its slot; a final
/// `done` event carries the total. The upstream request lives inside the
/// response stream, so a client that disconnects tears it down.
async fn generate_names(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<GenerateNamesRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let english_name = req.english_name.trim().to_string();
    if english_name.is_empty() {
        return Err(AppError::BadRequest("englishName is required".into()));
    }
    let unwanted_hanzi = req.unwanted_hanzi.trim().to_string();

    let prompt = coze::name_prompt(&english_name, req.character_count, &unwanted_hanzi);
    let conversation_id = state.coze.create_conversation().await?;
    let upstream = state
        .coze
        .stream_chat(state.coze.bot_id(), &conversation_id, &prompt)
        .await?;

    // History is attributed to the logged-in user, falling back to the
    // queried name itself for anonymous callers.
    let username = user
        .map(|u| u.username)
        .unwrap_or_else(|| english_name.clone());

    let relay = NameRelay {
        upstream,
        decoder: SseDecoder::new(),
        parser: NameParser::new(),
        pending: VecDeque::new(),
        finished: false,
        db: state.db.clone(),
        username,
        english_name,
        character_count: req.character_count.label().to_string(),
        unwanted_hanzi,
    };

    Ok(Sse::new(stream::unfold(relay, NameRelay::step)).keep_alive(KeepAlive::default()))
}

/// POST /api/generate/images — relay the image bot's reply as SSE, emitting
/// an `image` event per extracted URL.
async fn generate_images(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<GenerateImagesRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let prompt = req.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::BadRequest("prompt is required".into()));
    }

    let conversation_id = state.coze.create_conversation().await?;
    let upstream = state
        .coze
        .stream_chat(state.coze.image_bot_id(), &conversation_id, &prompt)
        .await?;

    let username = user
        .map(|u| u.username)
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());

    let relay = ImageRelay {
        upstream,
        decoder: SseDecoder::new(),
        parser: ImageParser::new(),
        pending: VecDeque::new(),
        finished: false,
        db: state.db.clone(),
        username,
        prompt,
    };

    Ok(Sse::new(stream::unfold(relay, ImageRelay::step)).keep_alive(KeepAlive::default()))
}

// --- Relay state machines ---

struct NameRelay {
    upstream: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    parser: NameParser,
    pending: VecDeque<Event>,
    finished: bool,
    db: DbPool,
    username: String,
    english_name: String,
    character_count: String,
    unwanted_hanzi: String,
}

impl NameRelay {
    async fn step(mut relay: Self) -> Option<(Result<Event, axum::Error>, Self)> {
        loop {
            if let Some(event) = relay.pending.pop_front() {
                return Some((Ok(event), relay));
            }
            if relay.finished {
                return None;
            }
            match relay.upstream.next().await {
                Some(Ok(chunk)) => {
                    for event in relay.decoder.feed(&chunk) {
                        if let CozeEvent::Delta { content } = event {
                            for (slot, name) in relay.parser.push(&content) {
                                relay.pending.push_back(name_event(slot, &name));
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("name stream failed: {}", e);
                    relay.pending.push_back(error_event(&e.to_string()));
                    relay.finish();
                }
                None => relay.finish(),
            }
        }
    }

    fn finish(&mut self) {
        for (slot, name) in self.parser.finish() {
            self.pending.push_back(name_event(slot, &name));
        }
        if self.decoder.skipped() > 0 {
            tracing::debug!("skipped {} unparseable fragments", self.decoder.skipped());
        }

        let names = self.parser.names();
        if !names.is_empty() {
            if let Err(e) = history::insert_record(
                &self.db,
                &self.username,
                &self.english_name,
                &self.character_count,
                &self.unwanted_hanzi,
                &names,
            ) {
                tracing::error!("failed to save generation history: {}", e);
            }
        }

        self.pending.push_back(done_event(names.len()));
        self.finished = true;
    }
}

struct ImageRelay {
    upstream: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    parser: ImageParser,
    pending: VecDeque<Event>,
    finished: bool,
    db: DbPool,
    username: String,
    prompt: String,
}

impl ImageRelay {
    async fn step(mut relay: Self) -> Option<(Result<Event, axum::Error>, Self)> {
        loop {
            if let Some(event) = relay.pending.pop_front() {
                return Some((Ok(event), relay));
            }
            if relay.finished {
                return None;
            }
            match relay.upstream.next().await {
                Some(Ok(chunk)) => {
                    for event in relay.decoder.feed(&chunk) {
                        if let CozeEvent::Delta { content } = event {
                            for (slot, url) in relay.parser.push(&content) {
                                relay.pending.push_back(image_event(slot, &url));
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("image stream failed: {}", e);
                    relay.pending.push_back(error_event(&e.to_string()));
                    relay.finish();
                }
                None => relay.finish(),
            }
        }
    }

    fn finish(&mut self) {
        let urls = self.parser.urls().to_vec();
        if !urls.is_empty() {
            if let Err(e) =
                image_history::insert_record(&self.db, &self.username, &self.prompt, &urls)
            {
                tracing::error!("failed to save image history: {}", e);
            }
        }

        self.pending.push_back(done_event(urls.len()));
        self.finished = true;
    }
}

// --- Event builders ---
// serde_json escapes newlines, so the payloads are single-line safe.

fn name_event(slot: usize, name: &GeneratedName) -> Event {
    Event::default()
        .event("name")
        .data(json!({ "slot": slot, "name": name }).to_string())
}

fn image_event(slot: usize, url: &str) -> Event {
    Event::default()
        .event("image")
        .data(json!({ "slot": slot, "url": url }).to_string())
}

fn done_event(count: usize) -> Event {
    Event::default()
        .event("done")
        .data(json!({ "count": count }).to_string())
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "error": message }).to_string())
}
