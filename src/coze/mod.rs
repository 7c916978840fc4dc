pub mod parse;
pub mod sse;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::config::CozeConfig;
use crate::error::{AppError, AppResult};

/// Character count requested for the generated names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterCount {
    One,
    Two,
    Three,
}

impl CharacterCount {
    /// Label used in the prompt and stored in history records.
    pub fn label(self) -> &'static str {
        match self {
            CharacterCount::One => "单字",
            CharacterCount::Two => "双字",
            CharacterCount::Three => "三字",
        }
    }
}

/// Build the name-generation prompt in the fixed format the bot answers to.
pub fn name_prompt(english_name: &str, count: CharacterCount, unwanted_hanzi: &str) -> String {
    let avoid = if unwanted_hanzi.is_empty() {
        String::new()
    } else {
        format!("避免使用以下汉字：{}", unwanted_hanzi)
    };
    format!(
        "请根据英文名\"{}\"生成4个{}的中文名字，{}。每个名字请按照如下格式返回：\n文字：[名字]\n关联：[详细解释]\n英文翻译：[英文翻译]",
        english_name,
        count.label(),
        avoid
    )
}

#[derive(Deserialize)]
struct CreateConversationResponse {
    code: i64,
    msg: Option<String>,
    data: Option<ConversationData>,
}

#[derive(Deserialize)]
struct ConversationData {
    id: String,
}

/// Client for the Coze chat API (bearer token, SSE streaming).
#[derive(Clone)]
pub struct CozeClient {
    http: reqwest::Client,
    config: CozeConfig,
}

impl CozeClient {
    pub fn new(config: CozeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn bot_id(&self) -> &str {
        &self.config.bot_id
    }

    pub fn image_bot_id(&self) -> &str {
        &self.config.image_bot_id
    }

    pub async fn create_conversation(&self) -> AppResult<String> {
        let resp = self
            .http
            .post(format!("{}/v1/conversation/create", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?;

        let body: CreateConversationResponse = resp.json().await?;
        match body {
            CreateConversationResponse {
                code: 0,
                data: Some(data),
                ..
            } => Ok(data.id),
            CreateConversationResponse { code, msg, .. } => Err(AppError::Internal(format!(
                "coze conversation create failed (code {}): {}",
                code,
                msg.unwrap_or_default()
            ))),
        }
    }

    /// Open a streaming chat with the given bot. The returned byte stream is
    /// the raw SSE body; dropping it tears down the upstream request.
    pub async fn stream_chat(
        &self,
        bot_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> AppResult<BoxStream<'static, reqwest::Result<Bytes>>> {
        let body = json!({
            "bot_id": bot_id,
            "user_id": self.config.user_id,
            "conversation_id": conversation_id,
            "stream": true,
            "auto_save_history": true,
            "max_tokens": 4000,
            "temperature": 0.7,
            "additional_messages": [{
                "role": "user",
                "content": message,
                "content_type": "text",
            }],
        });

        let resp = self
            .http
            .post(format!("{}/v3/chat", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.bytes_stream().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_count_labels() {
        assert_eq!(CharacterCount::One.label(), "单字");
        assert_eq!(CharacterCount::Two.label(), "双字");
        assert_eq!(CharacterCount::Three.label(), "三字");
    }

    #[test]
    fn character_count_deserializes_lowercase() {
        let count: CharacterCount = serde_json::from_str("\"two\"").unwrap();
        assert_eq!(count, CharacterCount::Two);
    }

    #[test]
    fn prompt_includes_name_and_count() {
        let prompt = name_prompt("Alice", CharacterCount::Two, "");
        assert!(prompt.contains("英文名\"Alice\""));
        assert!(prompt.contains("4个双字"));
        assert!(prompt.contains("文字：[名字]"));
        assert!(!prompt.contains("避免使用以下汉字"));
    }

    #[test]
    fn prompt_includes_unwanted_hanzi_when_present() {
        let prompt = name_prompt("Bob", CharacterCount::One, "王李");
        assert!(prompt.contains("避免使用以下汉字：王李"));
    }
}
