use serde::{Deserialize, Serialize};

/// Synthesis voice selection, as exposed by the backend `/tts` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Female,
    Male,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Female => "female",
            Voice::Male => "male",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Voice::Female => Voice::Male,
            Voice::Male => Voice::Female,
        }
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::Female
    }
}

/// How many turns the rendering layer shows from the unbounded history.
pub const DEFAULT_HISTORY_DISPLAY_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_url: String,

    /// BCP 47 locale tag sent to `/tts`.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub voice: Voice,

    /// Fixed session key; a random one is generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default = "default_history_display_limit")]
    pub history_display_limit: usize,
}

fn default_language() -> String {
    "en-US".into()
}

fn default_history_display_limit() -> usize {
    DEFAULT_HISTORY_DISPLAY_LIMIT
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".into(),
            language: default_language(),
            voice: Voice::default(),
            session_id: None,
            history_display_limit: DEFAULT_HISTORY_DISPLAY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"backend_url":"http://example.com"}"#).unwrap();
        assert_eq!(cfg.language, "en-US");
        assert_eq!(cfg.voice, Voice::Female);
        assert_eq!(cfg.history_display_limit, 8);
        assert_eq!(cfg.session_id, None);
    }

    #[test]
    fn voice_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Voice::Male).unwrap(), r#""male""#);
        assert_eq!(Voice::Female.as_str(), "female");
        assert_eq!(Voice::Female.toggled(), Voice::Male);
    }
}
