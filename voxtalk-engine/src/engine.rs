use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{info, warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureController;
use crate::traits::{AssistantBackend, ConfirmationCue, SpeechPlayback, SpeechRecognition};
use crate::turn::{TurnOutcome, TurnTimings, ms};
use voxtalk_core::config::{AppConfig, Voice};
use voxtalk_core::error::{CaptureError, TurnError, ValidationError};
use voxtalk_core::session::{CaptureResult, Session, SessionId, Turn, TurnStatus};
use voxtalk_core::text::{normalize_utterance, strip_markdown_emphasis};

/// Snapshot of the engine's user-facing state, published on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub status: TurnStatus,
    pub message: String,
    pub mic_blocked: bool,
}

impl EngineStatus {
    fn idle() -> Self {
        Self {
            status: TurnStatus::Idle,
            message: TurnStatus::Idle.message().into(),
            mic_blocked: false,
        }
    }
}

struct EngineState {
    session: Session,
    mic_blocked: bool,
    voice: Voice,
    turn_cancel: Option<CancellationToken>,
}

/// Turn-based conversation orchestrator.
///
/// Owns the session history and the status state machine. One turn, one
/// capture, and one playback at a time; every suspension point of an
/// in-flight turn honors `cancel_turn`.
pub struct ConversationEngine {
    cfg: AppConfig,
    session_id: SessionId,
    backend: Arc<dyn AssistantBackend>,
    playback: Arc<dyn SpeechPlayback>,
    capture: CaptureController,
    state: Mutex<EngineState>,
    status_tx: watch::Sender<EngineStatus>,
}

impl ConversationEngine {
    pub fn new(
        cfg: AppConfig,
        backend: Arc<dyn AssistantBackend>,
        playback: Arc<dyn SpeechPlayback>,
        recognizer: Arc<dyn SpeechRecognition>,
        cue: Arc<dyn ConfirmationCue>,
    ) -> Self {
        let session_id = match &cfg.session_id {
            Some(id) => SessionId::new(id.clone()),
            None => SessionId::generate(),
        };
        let voice = cfg.voice;
        let (status_tx, _) = watch::channel(EngineStatus::idle());
        Self {
            cfg,
            session_id: session_id.clone(),
            backend,
            playback,
            capture: CaptureController::new(recognizer, cue),
            state: Mutex::new(EngineState {
                session: Session::new(session_id),
                mic_blocked: false,
                voice,
                turn_cancel: None,
            }),
            status_tx,
        }
    }

    /// The single external trigger: toggles capture when idle or
    /// listening, and is ignored while a turn is in flight.
    pub async fn handle_mic_click(&self) -> Option<TurnOutcome> {
        let current = self.status_tx.borrow().status;
        if current == TurnStatus::Listening {
            self.capture.cancel_capture().await;
            self.set_status(TurnStatus::Idle, None);
            return None;
        }
        if current.is_turn_in_flight() {
            return None;
        }

        let rx = match self.capture.start_capture().await {
            Ok(rx) => rx,
            Err(e) => {
                let err = TurnError::from(e);
                return Some(self.fail_turn(None, err, TurnTimings::default()));
            }
        };

        // A confirmed capture start clears the sticky blocked indicator.
        self.state.lock().unwrap().mic_blocked = false;
        self.set_status(TurnStatus::Listening, None);

        let result = match rx.await {
            Ok(result) => result,
            Err(_) => {
                // Recognizer went away without a result: implicit cancel.
                self.capture.finished();
                self.set_status(TurnStatus::Idle, None);
                return None;
            }
        };
        self.capture.finished();

        match result {
            CaptureResult::Utterance(text) => {
                // Brief: recognition already finalized the transcript.
                self.set_status(TurnStatus::Transcribing, None);
                Some(self.run_turn(text).await)
            }
            CaptureResult::Error(e) => {
                if e == CaptureError::PermissionDenied {
                    self.state.lock().unwrap().mic_blocked = true;
                }
                let err = TurnError::from(e);
                Some(self.fail_turn(None, err, TurnTimings::default()))
            }
        }
    }

    /// Typed-input fallback: runs the turn pipeline without capture.
    pub async fn submit_text(&self, text: impl Into<String>) -> TurnOutcome {
        self.run_turn(text.into()).await
    }

    pub async fn run_turn(&self, utterance: String) -> TurnOutcome {
        self.run_turn_with_hook(utterance, |_status| async {}).await
    }

    /// Same as `run_turn`, but emits a status hook as the turn progresses.
    ///
    /// The hook is intended for UI updates and must be fast.
    pub async fn run_turn_with_hook<F, Fut>(&self, utterance: String, on_status: F) -> TurnOutcome
    where
        F: Fn(TurnStatus) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut timings = TurnTimings::default();

        let Some(query) = normalize_utterance(&utterance) else {
            return self.fail_turn(None, ValidationError::EmptyUtterance.into(), timings);
        };

        let cancel = CancellationToken::new();
        self.state.lock().unwrap().turn_cancel = Some(cancel.clone());

        self.set_status(TurnStatus::AwaitingAnswer, None);
        on_status(TurnStatus::AwaitingAnswer).await;

        let t0 = Instant::now();
        let reply = tokio::select! {
            _ = cancel.cancelled() => return self.cancel_outcome(Some(query), timings),
            res = self.backend.ask(&query, &self.session_id) => res,
        };
        timings.ask_ms = Some(ms(t0.elapsed()));

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return self.fail_turn(Some(query), e.into(), timings),
        };

        let answer = strip_markdown_emphasis(&reply.answer);
        {
            let mut state = self.state.lock().unwrap();
            state.session.append(Turn::user(query.clone()));
            state.session.append(Turn::assistant(answer.clone()));
            // The backend's canonical history wins when it keeps one.
            if !reply.chat_history.is_empty() {
                state.session.replace_all(reply.chat_history);
            }
        }

        let (lang, voice) = {
            let state = self.state.lock().unwrap();
            (self.cfg.language.clone(), state.voice)
        };

        self.set_status(TurnStatus::SynthesizingSpeech, None);
        on_status(TurnStatus::SynthesizingSpeech).await;

        let t0 = Instant::now();
        let audio = tokio::select! {
            _ = cancel.cancelled() => return self.cancel_outcome(Some(query), timings),
            res = self.backend.synthesize(&answer, &lang, voice) => res,
        };
        timings.synthesis_ms = Some(ms(t0.elapsed()));

        let audio = match audio {
            Ok(audio) => audio,
            Err(e) => return self.fail_turn(Some(query), e.into(), timings),
        };

        self.set_status(TurnStatus::Playing, None);
        on_status(TurnStatus::Playing).await;

        let t0 = Instant::now();
        let played = tokio::select! {
            _ = cancel.cancelled() => return self.cancel_outcome(Some(query), timings),
            res = self.playback.play(&audio) => res,
        };
        timings.playback_ms = Some(ms(t0.elapsed()));

        if let Err(e) = played {
            return self.fail_turn(Some(query), e.into(), timings);
        }

        self.state.lock().unwrap().turn_cancel = None;
        self.set_status(TurnStatus::Idle, None);
        on_status(TurnStatus::Idle).await;

        info!(
            "turn complete: ask={:?}ms tts={:?}ms play={:?}ms",
            timings.ask_ms, timings.synthesis_ms, timings.playback_ms
        );
        TurnOutcome::completed(query, answer, timings)
    }

    /// Aborts the in-flight turn at its next suspension point. Idempotent;
    /// a no-op when no turn is running. History is never rolled back.
    pub fn cancel_turn(&self) {
        let token = self.state.lock().unwrap().turn_cancel.take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.status_tx.borrow().clone()
    }

    /// Watch channel for a rendering layer; yields on every status change.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status_tx.subscribe()
    }

    pub fn history(&self) -> Vec<Turn> {
        self.state.lock().unwrap().session.history().to_vec()
    }

    /// The display window: at most `history_display_limit` newest turns.
    pub fn recent_history(&self) -> Vec<Turn> {
        let state = self.state.lock().unwrap();
        state
            .session
            .recent(self.cfg.history_display_limit)
            .to_vec()
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn voice(&self) -> Voice {
        self.state.lock().unwrap().voice
    }

    pub fn set_voice(&self, voice: Voice) {
        self.state.lock().unwrap().voice = voice;
    }

    pub fn mic_blocked(&self) -> bool {
        self.state.lock().unwrap().mic_blocked
    }

    fn fail_turn(&self, user_text: Option<String>, err: TurnError, timings: TurnTimings) -> TurnOutcome {
        self.state.lock().unwrap().turn_cancel = None;
        let message = err.user_message();
        warn!("turn failed: {err}");
        self.set_status(TurnStatus::Error, Some(message.clone()));
        self.set_status(TurnStatus::Idle, Some(message.clone()));
        TurnOutcome::failed(user_text, message, timings)
    }

    fn cancel_outcome(&self, user_text: Option<String>, timings: TurnTimings) -> TurnOutcome {
        self.state.lock().unwrap().turn_cancel = None;
        info!("turn cancelled");
        self.set_status(TurnStatus::Idle, None);
        TurnOutcome::cancelled(user_text, timings)
    }

    fn set_status(&self, status: TurnStatus, message: Option<String>) {
        let mic_blocked = self.state.lock().unwrap().mic_blocked;
        let message = message.unwrap_or_else(|| status.message().into());
        self.status_tx.send_replace(EngineStatus {
            status,
            message,
            mic_blocked,
        });
    }
}
