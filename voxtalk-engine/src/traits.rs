use async_trait::async_trait;
use voxtalk_core::config::Voice;
use voxtalk_core::error::{CaptureError, PlaybackError, RemoteError};
use voxtalk_core::session::{SessionId, Turn};

/// `/ask` reply: the answer to speak plus the backend's canonical
/// conversation history (may be empty when the backend keeps none).
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantAnswer {
    pub answer: String,
    pub chat_history: Vec<Turn>,
}

/// Synthesized speech bytes; the content type picks the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn ask(&self, query: &str, session_id: &SessionId)
    -> Result<AssistantAnswer, RemoteError>;

    async fn synthesize(
        &self,
        text: &str,
        lang: &str,
        voice: Voice,
    ) -> Result<SpeechAudio, RemoteError>;
}

/// Single-shot speech recognition capability.
///
/// Implementations wrap whatever the platform offers (a recognizer over
/// the microphone recorder, a typed-input fallback, a test fake). One
/// call yields one finalized utterance or one error; the capture
/// controller handles cancellation around it.
#[async_trait]
pub trait SpeechRecognition: Send + Sync {
    /// Checked before any device access; `false` means captures report
    /// `DeviceUnsupported` synchronously.
    fn is_supported(&self) -> bool;

    async fn recognize(&self) -> Result<String, CaptureError>;
}

#[async_trait]
pub trait SpeechPlayback: Send + Sync {
    /// Resolves when playback finishes naturally.
    async fn play(&self, audio: &SpeechAudio) -> Result<(), PlaybackError>;

    fn is_playing(&self) -> bool;
}

/// Audible start/stop confirmation, exactly once per transition.
#[async_trait]
pub trait ConfirmationCue: Send + Sync {
    async fn capture_started(&self);
    async fn capture_stopped(&self);
}

/// No-op cue for headless hosts and tests.
pub struct SilentCue;

#[async_trait]
impl ConfirmationCue for SilentCue {
    async fn capture_started(&self) {}
    async fn capture_stopped(&self) {}
}
