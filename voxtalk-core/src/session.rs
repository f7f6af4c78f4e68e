use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session identifier, stable for the process lifetime.
///
/// The backend treats this as an arbitrary string key for conversation
/// state, so externally supplied ids are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Turn content as persisted into history.
///
/// The backend may return structured payloads (e.g. tool output) in place
/// of plain text; those are kept verbatim and rendered as compact JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Structured(serde_json::Value),
}

impl TurnContent {
    pub fn display_text(&self) -> String {
        match self {
            TurnContent::Text(s) => s.clone(),
            TurnContent::Structured(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }
}

/// One conversation, created once at engine startup.
///
/// History grows unbounded within the process; display layers truncate
/// via `recent`. Only the orchestrator mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    history: Vec<Turn>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            history: Vec::new(),
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Replace the whole history with the backend's canonical copy.
    pub fn replace_all(&mut self, turns: Vec<Turn>) {
        self.history = turns;
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

/// Single source of truth for the UI status line.
///
/// Exactly one value is live at a time per session; only the orchestrator
/// transitions it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Idle,
    Listening,
    Transcribing,
    AwaitingAnswer,
    SynthesizingSpeech,
    Playing,
    Error,
}

impl Default for TurnStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl TurnStatus {
    // Stable labels for UI display; intentionally not derived from `Debug`.
    pub fn message(&self) -> &'static str {
        match self {
            TurnStatus::Idle => "Tap to talk",
            TurnStatus::Listening => "Listening…",
            TurnStatus::Transcribing => "Transcribing…",
            TurnStatus::AwaitingAnswer => "Thinking…",
            TurnStatus::SynthesizingSpeech => "Preparing speech…",
            TurnStatus::Playing => "Speaking…",
            TurnStatus::Error => "Something went wrong",
        }
    }

    pub fn is_turn_in_flight(&self) -> bool {
        matches!(
            self,
            TurnStatus::Transcribing
                | TurnStatus::AwaitingAnswer
                | TurnStatus::SynthesizingSpeech
                | TurnStatus::Playing
        )
    }
}

/// Result of one capture activation: exactly one of these is emitted
/// per started capture, unless the capture was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    Utterance(String),
    Error(crate::error::CaptureError),
}

/// Number of visualization bars per frame.
pub const BAR_COUNT: usize = 48;

/// Maximum bar height in display pixels.
pub const MAX_BAR_HEIGHT_PX: u16 = 80;

/// One visualization frame: `BAR_COUNT` bar heights in `0..=MAX_BAR_HEIGHT_PX`.
/// Transient, recomputed every tick, never persisted.
pub type AudioSample = Vec<u16>;

pub fn silent_sample() -> AudioSample {
    vec![0; BAR_COUNT]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_truncates_to_last_n() {
        let mut s = Session::new(SessionId::new("test"));
        for i in 0..10 {
            s.append(Turn::user(format!("u{i}")));
        }
        let recent = s.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content.display_text(), "u7");
        assert_eq!(s.recent(100).len(), 10);
    }

    #[test]
    fn replace_all_overwrites_history() {
        let mut s = Session::new(SessionId::generate());
        s.append(Turn::user("old"));
        s.replace_all(vec![Turn::user("q"), Turn::assistant("a")]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.history()[1].role, Role::Assistant);
    }

    #[test]
    fn structured_content_renders_as_json() {
        let content = TurnContent::Structured(serde_json::json!({"k": 1}));
        assert_eq!(content.display_text(), r#"{"k":1}"#);
    }

    #[test]
    fn in_flight_states_exclude_idle_and_listening() {
        assert!(!TurnStatus::Idle.is_turn_in_flight());
        assert!(!TurnStatus::Listening.is_turn_in_flight());
        assert!(!TurnStatus::Error.is_turn_in_flight());
        assert!(TurnStatus::AwaitingAnswer.is_turn_in_flight());
        assert!(TurnStatus::Playing.is_turn_in_flight());
    }
}
