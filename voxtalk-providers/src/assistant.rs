use crate::request::{Body, HttpRequest};
use voxtalk_core::config::Voice;
use voxtalk_core::session::SessionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub base_url: String,
}

/// `POST /ask` — form-encoded query against the remote assistant.
pub fn build_ask_request(cfg: &AssistantConfig, query: &str, session_id: &SessionId) -> HttpRequest {
    HttpRequest {
        method: "POST".into(),
        url: join_url(&cfg.base_url, "/ask"),
        headers: vec![(
            "Content-Type".into(),
            "application/x-www-form-urlencoded".into(),
        )],
        body: Body::Form(vec![
            ("query".into(), query.into()),
            ("session_id".into(), session_id.as_str().into()),
        ]),
    }
}

/// `POST /tts` — synthesize cleaned answer text to audio bytes.
pub fn build_tts_request(cfg: &AssistantConfig, text: &str, lang: &str, voice: Voice) -> HttpRequest {
    HttpRequest {
        method: "POST".into(),
        url: join_url(&cfg.base_url, "/tts"),
        headers: vec![(
            "Content-Type".into(),
            "application/x-www-form-urlencoded".into(),
        )],
        body: Body::Form(vec![
            ("text".into(), text.into()),
            ("lang".into(), lang.into()),
            ("voice".into(), voice.as_str().into()),
        ]),
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(join_url("http://localhost:8000/", "/ask"), "http://localhost:8000/ask");
        assert_eq!(join_url("http://localhost:8000", "tts"), "http://localhost:8000/tts");
    }

    #[test]
    fn builds_form_encoded_ask_request() {
        let cfg = AssistantConfig {
            base_url: "http://localhost:8000".into(),
        };
        let req = build_ask_request(&cfg, "what time is it", &SessionId::new("default_session"));

        assert_eq!(req.method, "POST");
        assert!(req.url.ends_with("/ask"));
        assert_eq!(
            req.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(req.form_field("query"), Some("what time is it"));
        assert_eq!(req.form_field("session_id"), Some("default_session"));
    }

    #[test]
    fn builds_tts_request_with_voice_and_lang() {
        let cfg = AssistantConfig {
            base_url: "http://localhost:8000".into(),
        };
        let req = build_tts_request(&cfg, "It's 3pm", "en-US", Voice::Female);

        assert!(req.url.ends_with("/tts"));
        assert_eq!(req.form_field("text"), Some("It's 3pm"));
        assert_eq!(req.form_field("lang"), Some("en-US"));
        assert_eq!(req.form_field("voice"), Some("female"));
    }
}
