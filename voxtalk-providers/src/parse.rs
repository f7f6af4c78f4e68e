use anyhow::Context;
use serde::Deserialize;
use voxtalk_core::session::{Role, Turn, TurnContent};

#[derive(Debug, Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: String,

    // Absent or empty is valid; the backend only returns its canonical
    // history when it persisted one.
    #[serde(default)]
    chat_history: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskReply {
    pub answer: String,
    pub chat_history: Vec<Turn>,
}

pub fn parse_ask_response(body: &[u8]) -> anyhow::Result<AskReply> {
    let resp: AskResponse = serde_json::from_slice(body).context("decode /ask JSON")?;

    let chat_history = resp
        .chat_history
        .into_iter()
        .map(|m| Turn {
            // The backend labels assistant turns "ai".
            role: if m.role == "ai" { Role::Assistant } else { Role::User },
            content: match m.content {
                serde_json::Value::String(s) => TurnContent::Text(s),
                other => TurnContent::Structured(other),
            },
        })
        .collect();

    Ok(AskReply {
        answer: resp.answer,
        chat_history,
    })
}
