//
// Audible capture confirmation cues.
//
// A short rising tone marks the start of listening and a lower tone marks
// the stop, as a non-visual affordance. Tones are rendered as PCM and
// played through a throwaway output session.

use std::time::Duration;

use crate::decode::AudioClip;
use crate::playback::{AnalysisTap, PlayError};

pub const START_CUE_HZ: f32 = 880.0;
pub const STOP_CUE_HZ: f32 = 520.0;

const CUE_RATE_HZ: u32 = 24_000;
const CUE_LEN: Duration = Duration::from_millis(180);
const ATTACK: Duration = Duration::from_millis(20);
const PEAK_GAIN: f32 = 0.2;
const FLOOR_GAIN: f32 = 0.0001;

/// Render one cue tone: sine with a fast exponential attack and a decay
/// back to silence, so it never clicks.
pub fn render_cue(freq_hz: f32, sample_rate_hz: u32) -> Vec<f32> {
    let total = (CUE_LEN.as_secs_f32() * sample_rate_hz as f32) as usize;
    let attack = (ATTACK.as_secs_f32() * sample_rate_hz as f32) as usize;

    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate_hz as f32;
            let gain = if i < attack {
                // Exponential ramp from the floor up to peak.
                FLOOR_GAIN * (PEAK_GAIN / FLOOR_GAIN).powf(i as f32 / attack as f32)
            } else {
                let decay_pos = (i - attack) as f32 / (total - attack).max(1) as f32;
                PEAK_GAIN * (FLOOR_GAIN / PEAK_GAIN).powf(decay_pos)
            };
            gain * (2.0 * std::f32::consts::PI * freq_hz * t).sin()
        })
        .collect()
}

/// Plays confirmation cues on the default output device.
pub struct CuePlayer;

impl CuePlayer {
    pub fn new() -> Self {
        Self
    }

    pub async fn capture_started(&self) -> Result<(), PlayError> {
        self.play_tone(START_CUE_HZ).await
    }

    pub async fn capture_stopped(&self) -> Result<(), PlayError> {
        self.play_tone(STOP_CUE_HZ).await
    }

    async fn play_tone(&self, freq_hz: f32) -> Result<(), PlayError> {
        let clip = AudioClip {
            sample_rate_hz: CUE_RATE_HZ,
            samples: render_cue(freq_hz, CUE_RATE_HZ),
        };
        // Cues are not playback sessions; they use a private tap nothing
        // samples from.
        tokio::task::spawn_blocking(move || crate::playback::run_session(clip, AnalysisTap::new()))
            .await
            .map_err(|e| PlayError::Worker(e.to_string()))?
    }
}

impl Default for CuePlayer {
    fn default() -> Self {
        Self::new()
    }
}
