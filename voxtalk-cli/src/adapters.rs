use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::warn;

use voxtalk_audio::{CuePlayer, IntervalFrameClock, PlaybackController, SignalSampler};
use voxtalk_core::error::{CaptureError, PlaybackError};
use voxtalk_core::session::AudioSample;
use voxtalk_engine::traits::{ConfirmationCue, SpeechAudio, SpeechPlayback, SpeechRecognition};

const BAR_GLYPHS: &[char] = &[' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const RENDER_FPS: u32 = 30;

/// Line-based stand-in for platform speech recognition: each capture
/// reads one typed utterance from stdin.
pub struct StdinRecognition;

#[async_trait]
impl SpeechRecognition for StdinRecognition {
    fn is_supported(&self) -> bool {
        true
    }

    async fn recognize(&self) -> Result<String, CaptureError> {
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            let n = std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| CaptureError::Other(format!("stdin: {e}")))?;
            if n == 0 {
                return Err(CaptureError::Other("input closed".into()));
            }
            Ok(line)
        })
        .await
        .map_err(|e| CaptureError::Other(format!("recognizer task: {e}")))??;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(CaptureError::NoSpeech);
        }
        Ok(trimmed.to_string())
    }
}

/// Plays reply audio through the default output device and renders the
/// live 48-bar spectrum to the terminal while sound is coming out.
pub struct SpeakerPlayback {
    controller: PlaybackController,
    rendering: Arc<AtomicBool>,
}

impl SpeakerPlayback {
    pub fn new() -> Self {
        Self {
            controller: PlaybackController::new(),
            rendering: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl SpeechPlayback for SpeakerPlayback {
    async fn play(&self, audio: &SpeechAudio) -> Result<(), PlaybackError> {
        let mut sampler = SignalSampler::new();
        sampler.attach(self.controller.tap());

        self.rendering.store(true, Ordering::SeqCst);
        let rendering = self.rendering.clone();
        let render = tokio::spawn(async move {
            let mut clock = IntervalFrameClock::new(RENDER_FPS);
            sampler
                .run(
                    &mut clock,
                    || rendering.load(Ordering::SeqCst),
                    draw_bars,
                )
                .await;
            println!();
        });

        let result = self
            .controller
            .play(audio.content_type.as_deref(), &audio.bytes)
            .await;
        self.rendering.store(false, Ordering::SeqCst);
        let _ = render.await;

        result.map_err(|e| match e {
            voxtalk_audio::PlayError::Decode(d) => PlaybackError::DecodeFailed(d.to_string()),
            other => PlaybackError::PlaybackFailed(other.to_string()),
        })
    }

    fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }
}

fn draw_bars(bars: AudioSample) {
    let mut line = String::with_capacity(bars.len() + 1);
    line.push('\r');
    for h in &bars {
        let idx = (usize::from(*h) * (BAR_GLYPHS.len() - 1) + 40) / 80;
        line.push(BAR_GLYPHS[idx.min(BAR_GLYPHS.len() - 1)]);
    }
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(line.as_bytes());
    let _ = out.flush();
}

/// Start/stop tones on the output device. Cue failures are logged and
/// swallowed; a missing speaker must not break capture.
pub struct ToneCue {
    player: CuePlayer,
}

impl ToneCue {
    pub fn new() -> Self {
        Self {
            player: CuePlayer::new(),
        }
    }
}

#[async_trait]
impl ConfirmationCue for ToneCue {
    async fn capture_started(&self) {
        if let Err(e) = self.player.capture_started().await {
            warn!("start cue failed: {e}");
        }
    }

    async fn capture_stopped(&self) {
        if let Err(e) = self.player.capture_stopped().await {
            warn!("stop cue failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_glyph_scaling_covers_full_range() {
        let silent: AudioSample = vec![0; 48];
        let loud: AudioSample = vec![80; 48];
        // Exercised through draw_bars' index math.
        let idx_for = |h: u16| (usize::from(h) * (BAR_GLYPHS.len() - 1) + 40) / 80;
        assert_eq!(idx_for(silent[0]), 0);
        assert_eq!(idx_for(loud[0]), BAR_GLYPHS.len() - 1);
        assert!(idx_for(40) > 0 && idx_for(40) < BAR_GLYPHS.len() - 1);
    }
}
