use async_trait::async_trait;
use log::debug;

use crate::traits::{AssistantAnswer, AssistantBackend, SpeechAudio};
use voxtalk_core::config::Voice;
use voxtalk_core::error::RemoteError;
use voxtalk_core::session::SessionId;
use voxtalk_providers::assistant::{AssistantConfig, build_ask_request, build_tts_request};
use voxtalk_providers::parse::parse_ask_response;
use voxtalk_providers::runtime;
use voxtalk_providers::runtime::HttpResponse;

/// `AssistantBackend` over the HTTP `/ask` + `/tts` endpoints.
pub struct HttpAssistantBackend {
    cfg: AssistantConfig,
}

impl HttpAssistantBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            cfg: AssistantConfig {
                base_url: base_url.into(),
            },
        }
    }
}

#[async_trait]
impl AssistantBackend for HttpAssistantBackend {
    async fn ask(
        &self,
        query: &str,
        session_id: &SessionId,
    ) -> Result<AssistantAnswer, RemoteError> {
        let req = build_ask_request(&self.cfg, query, session_id);
        debug!("ask: {req:?}");

        let resp = runtime::execute(&req)
            .await
            .map_err(|e| RemoteError::QueryFailed(format!("ask request failed: {e:#}")))?;
        if !resp.is_success() {
            return Err(RemoteError::QueryFailed(failure_message("ask", &resp)));
        }

        let reply = parse_ask_response(&resp.body)
            .map_err(|e| RemoteError::QueryFailed(format!("ask reply malformed: {e:#}")))?;

        Ok(AssistantAnswer {
            answer: reply.answer,
            chat_history: reply.chat_history,
        })
    }

    async fn synthesize(
        &self,
        text: &str,
        lang: &str,
        voice: Voice,
    ) -> Result<SpeechAudio, RemoteError> {
        let req = build_tts_request(&self.cfg, text, lang, voice);
        debug!("tts: {req:?}");

        let resp = runtime::execute(&req)
            .await
            .map_err(|e| RemoteError::SynthesisFailed(format!("tts request failed: {e:#}")))?;
        if !resp.is_success() {
            return Err(RemoteError::SynthesisFailed(failure_message("tts", &resp)));
        }

        Ok(SpeechAudio {
            content_type: resp.content_type,
            bytes: resp.body,
        })
    }
}

fn failure_message(endpoint: &str, resp: &HttpResponse) -> String {
    let snippet = body_snippet(&resp.body);
    if snippet.is_empty() {
        format!("{endpoint} failed: status {}", resp.status)
    } else {
        format!("{endpoint} failed: status {}: {snippet}", resp.status)
    }
}

// Error bodies can be HTML pages or long tracebacks; keep enough to
// diagnose without flooding the status line.
fn body_snippet(body: &[u8]) -> String {
    const MAX: usize = 200;
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.len() <= MAX {
        trimmed.to_string()
    } else {
        let mut end = MAX;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_includes_status_and_snippet() {
        let resp = HttpResponse {
            status: 502,
            content_type: None,
            body: b"Bad Gateway".to_vec(),
        };
        assert_eq!(failure_message("ask", &resp), "ask failed: status 502: Bad Gateway");
    }

    #[test]
    fn empty_body_omits_snippet() {
        let resp = HttpResponse {
            status: 500,
            content_type: None,
            body: vec![],
        };
        assert_eq!(failure_message("tts", &resp), "tts failed: status 500");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let snippet = body_snippet("x".repeat(500).as_bytes());
        assert!(snippet.len() < 220);
        assert!(snippet.ends_with('…'));
    }
}
