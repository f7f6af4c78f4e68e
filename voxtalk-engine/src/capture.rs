use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::traits::{ConfirmationCue, SpeechRecognition};
use voxtalk_core::error::CaptureError;
use voxtalk_core::session::CaptureResult;

/// Microphone-capture lifecycle for one utterance attempt.
///
/// At most one capture is active at a time. Each started capture emits
/// exactly one `CaptureResult` on its receiver, unless cancelled first,
/// in which case nothing is ever emitted for that attempt.
pub struct CaptureController {
    recognizer: Arc<dyn SpeechRecognition>,
    cue: Arc<dyn ConfirmationCue>,
    active: Mutex<Option<CancellationToken>>,
}

impl CaptureController {
    pub fn new(recognizer: Arc<dyn SpeechRecognition>, cue: Arc<dyn ConfirmationCue>) -> Self {
        Self {
            recognizer,
            cue,
            active: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Begin listening for a single utterance.
    ///
    /// Reports `DeviceUnsupported` synchronously when no recognition
    /// capability exists, without touching the device. Otherwise plays
    /// the start cue once and returns the pending result.
    pub async fn start_capture(
        &self,
    ) -> Result<oneshot::Receiver<CaptureResult>, CaptureError> {
        if !self.recognizer.is_supported() {
            return Err(CaptureError::DeviceUnsupported);
        }

        let token = CancellationToken::new();
        {
            let mut active = self.active.lock().unwrap();
            if active.is_some() {
                // The orchestrator never double-starts; treat it as a bug
                // surfaced softly rather than a second device grab.
                return Err(CaptureError::Other("capture already active".into()));
            }
            *active = Some(token.clone());
        }

        self.cue.capture_started().await;

        let (tx, rx) = oneshot::channel();
        let recognizer = self.recognizer.clone();
        let cue = self.cue.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    // Cancelled: the attempt must stay silent.
                }
                res = recognizer.recognize() => {
                    cue.capture_stopped().await;
                    let result = match res {
                        Ok(text) => CaptureResult::Utterance(text),
                        Err(e) => CaptureResult::Error(e),
                    };
                    let _ = tx.send(result);
                }
            }
        });

        Ok(rx)
    }

    /// Cancel the in-flight capture, if any. Idempotent; safe when idle.
    pub async fn cancel_capture(&self) {
        let token = self.active.lock().unwrap().take();
        if let Some(token) = token {
            token.cancel();
            self.cue.capture_stopped().await;
        }
    }

    /// Clears the active slot once the result has been consumed.
    pub fn finished(&self) {
        self.active.lock().unwrap().take();
    }
}
