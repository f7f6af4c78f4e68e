use thiserror::Error;

/// Capture lifecycle failures, mapped from the underlying recognition
/// capability at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("microphone access blocked")]
    PermissionDenied,

    #[error("no speech detected")]
    NoSpeech,

    #[error("speech recognition is not supported on this device")]
    DeviceUnsupported,

    #[error("recognition error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty utterance")]
    EmptyUtterance,
}

/// Remote backend failures. The message carries whatever the transport or
/// server reported; it is surfaced to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{0}")]
    QueryFailed(String),

    #[error("{0}")]
    SynthesisFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("audio decode failed: {0}")]
    DecodeFailed(String),

    #[error("audio playback failed: {0}")]
    PlaybackFailed(String),
}

/// Everything that can end a conversational turn early.
///
/// All variants are caught at the orchestrator boundary, converted to one
/// user-visible status string, and return the session to `Idle`. None are
/// fatal; recovery is always a fresh mic tap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl TurnError {
    /// One user-facing line per error kind.
    ///
    /// Remote failures pass their message through verbatim; everything
    /// else maps to a fixed phrasing.
    pub fn user_message(&self) -> String {
        match self {
            TurnError::Capture(CaptureError::PermissionDenied) => "Microphone blocked".into(),
            TurnError::Capture(CaptureError::NoSpeech) => {
                "I didn't hear anything. Please try again.".into()
            }
            TurnError::Capture(CaptureError::DeviceUnsupported) => {
                "Speech recognition is not supported on this device.".into()
            }
            TurnError::Capture(CaptureError::Other(msg)) => {
                format!("Recognition error: {msg}")
            }
            TurnError::Validation(ValidationError::EmptyUtterance) => {
                "I didn't catch that. Please speak again.".into()
            }
            TurnError::Remote(e) => e.to_string(),
            TurnError::Playback(_) => "Could not play the reply audio.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_messages_surface_verbatim() {
        let e = TurnError::Remote(RemoteError::QueryFailed("ask failed: status 503".into()));
        assert_eq!(e.user_message(), "ask failed: status 503");
    }

    #[test]
    fn playback_errors_map_to_generic_message() {
        let e = TurnError::Playback(PlaybackError::DecodeFailed("bad mp3".into()));
        assert_eq!(e.user_message(), "Could not play the reply audio.");
    }

    #[test]
    fn capture_kinds_have_distinct_messages() {
        let kinds = [
            CaptureError::PermissionDenied,
            CaptureError::NoSpeech,
            CaptureError::DeviceUnsupported,
            CaptureError::Other("x".into()),
        ];
        let messages: Vec<String> = kinds
            .iter()
            .map(|k| TurnError::Capture(k.clone()).user_message())
            .collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
