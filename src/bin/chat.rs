//! Standalone terminal chat against the Coze API. Not wired into the
//! qiming service; it shares only the client and decoder.
//!
//! Configuration comes from the QIMING_COZE_* environment variables.

use std::io::{self, BufRead, Write};

use futures::StreamExt;
use serde::Serialize;
use serde_json::json;

use qiming::config::CozeConfig;
use qiming::coze::sse::{CozeEvent, SseDecoder};
use qiming::coze::CozeClient;

#[derive(Serialize)]
struct TranscriptMessage {
    role: String,
    content: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = CozeConfig::default();
    config.apply_env();
    if config.api_key.is_empty() || config.bot_id.is_empty() {
        anyhow::bail!("QIMING_COZE_API_KEY and QIMING_COZE_BOT_ID must be set");
    }

    let client = CozeClient::new(config);
    let conversation_id = client.create_conversation().await?;
    println!("Connected (conversation {})", conversation_id);
    println!("Type a message; an empty line exits.");

    let mut transcript: Vec<TranscriptMessage> = Vec::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let mut upstream = client
            .stream_chat(client.bot_id(), &conversation_id, message)
            .await?;

        let mut decoder = SseDecoder::new();
        let mut reply = String::new();
        while let Some(chunk) = upstream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                if let CozeEvent::Delta { content } = event {
                    print!("{}", content);
                    io::stdout().flush()?;
                    reply.push_str(&content);
                }
            }
        }
        println!();

        if reply.trim().is_empty() {
            println!("(no response)");
            continue;
        }

        transcript.push(TranscriptMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });
        transcript.push(TranscriptMessage {
            role: "assistant".to_string(),
            content: reply,
        });
        save_transcript(&conversation_id, &transcript)?;
    }

    Ok(())
}

fn save_transcript(conversation_id: &str, messages: &[TranscriptMessage]) -> anyhow::Result<()> {
    let data = json!({
        "conversation": {
            "messages": messages,
            "metadata": { "conversation_id": conversation_id },
        },
    });
    std::fs::write("answer.json", serde_json::to_string_pretty(&data)?)?;
    Ok(())
}
