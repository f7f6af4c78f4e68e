//
// Decoded-speech playback with a frequency-analysis tap.
//
// Exactly one playback session may run at a time; the orchestrator
// serializes turns so `play` is never entered concurrently. The session
// bundles the output stream, cursor, and tap feed as one owned value so
// every exit path releases the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::decode::{AudioClip, DecodeError, decode_audio};
use crate::resample::resample_mono;

/// Number of recent output samples the tap retains; matches the analysis
/// transform window.
pub const TAP_WINDOW: usize = 256;

/// Delay between natural end and visualization reset, so the bars decay
/// instead of snapping to zero.
const END_GRACE: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no output device available")]
    NoOutputDevice,

    #[error("a playback session is already active")]
    SessionActive,

    #[error("output stream failed: {0}")]
    Stream(String),

    #[error("playback worker failed: {0}")]
    Worker(String),
}

/// Ring of the most recent mono output samples, written by the audio
/// callback and read by the signal sampler.
#[derive(Clone)]
pub struct AnalysisTap {
    inner: Arc<Mutex<TapRing>>,
}

struct TapRing {
    buf: [f32; TAP_WINDOW],
    pos: usize,
}

impl AnalysisTap {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TapRing {
                buf: [0.0; TAP_WINDOW],
                pos: 0,
            })),
        }
    }

    pub fn push(&self, samples: &[f32]) {
        let mut ring = self.inner.lock().unwrap();
        for &s in samples {
            let pos = ring.pos;
            ring.buf[pos] = s;
            ring.pos = (pos + 1) % TAP_WINDOW;
        }
    }

    /// Copy the retained window out, oldest sample first.
    pub fn snapshot(&self, out: &mut [f32; TAP_WINDOW]) {
        let ring = self.inner.lock().unwrap();
        let split = ring.pos;
        out[..TAP_WINDOW - split].copy_from_slice(&ring.buf[split..]);
        out[TAP_WINDOW - split..].copy_from_slice(&ring.buf[..split]);
    }

    pub fn reset(&self) {
        let mut ring = self.inner.lock().unwrap();
        ring.buf = [0.0; TAP_WINDOW];
        ring.pos = 0;
    }
}

impl Default for AnalysisTap {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PlaybackController {
    playing: Arc<AtomicBool>,
    tap: AnalysisTap,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            playing: Arc::new(AtomicBool::new(false)),
            tap: AnalysisTap::new(),
        }
    }

    /// Tap point for the signal sampler.
    pub fn tap(&self) -> AnalysisTap {
        self.tap.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Decode `bytes` and play them to the default output device,
    /// resolving when playback finishes naturally.
    ///
    /// Decode failures never start a session. After the natural end the
    /// device, stream and tap are released, and the tap is reset to
    /// silence after a short grace delay.
    pub async fn play(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<(), PlayError> {
        let clip = decode_audio(content_type, bytes)?;

        if !self.begin() {
            return Err(PlayError::SessionActive);
        }

        let tap = self.tap.clone();
        let res = tokio::task::spawn_blocking(move || run_session(clip, tap)).await;

        tokio::time::sleep(END_GRACE).await;
        self.tap.reset();
        self.end();

        match res {
            Ok(inner) => inner,
            Err(e) => Err(PlayError::Worker(e.to_string())),
        }
    }

    /// Claim the single session slot; `false` means one is active.
    fn begin(&self) -> bool {
        self.playing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn end(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn run_session(clip: AudioClip, tap: AnalysisTap) -> Result<(), PlayError> {
    let session = PlaybackSession::open(clip, tap)?;
    session.wait()
}

/// One decoded-audio output, from start to natural end.
///
/// Owns the stream; dropping it on any path releases the device.
struct PlaybackSession {
    stream: cpal::Stream,
    done_rx: mpsc::Receiver<()>,
    duration: Duration,
}

impl PlaybackSession {
    fn open(clip: AudioClip, tap: AnalysisTap) -> Result<Self, PlayError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlayError::NoOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| PlayError::Stream(e.to_string()))?;

        let device_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;

        let samples = if clip.sample_rate_hz == device_rate {
            clip.samples
        } else {
            resample_mono(&clip.samples, clip.sample_rate_hz, device_rate)
                .map_err(|e| PlayError::Stream(e.to_string()))?
        };

        let duration = Duration::from_secs_f64(samples.len() as f64 / f64::from(device_rate));
        let (done_tx, done_rx) = mpsc::channel();

        let mut pos = 0usize;
        let mut signalled = false;
        let mut chunk: Vec<f32> = Vec::new();

        let stream = device
            .build_output_stream(
                &supported.config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    chunk.clear();
                    for frame in data.chunks_mut(channels) {
                        let s = if pos < samples.len() {
                            let s = samples[pos];
                            pos += 1;
                            s
                        } else {
                            if !signalled {
                                signalled = true;
                                let _ = done_tx.send(());
                            }
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = s;
                        }
                        chunk.push(s);
                    }
                    tap.push(&chunk);
                },
                |err| log::error!("output stream error: {err}"),
                None,
            )
            .map_err(|e| PlayError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PlayError::Stream(e.to_string()))?;

        Ok(Self {
            stream,
            done_rx,
            duration,
        })
    }

    fn wait(self) -> Result<(), PlayError> {
        // The callback signals once it runs past the last sample; the
        // timeout covers stalled devices.
        let timeout = self.duration + Duration::from_secs(2);
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!("playback did not signal completion within {timeout:?}");
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(PlayError::Stream("output callback dropped".into()));
            }
        }

        // Let the device drain its final buffer before teardown.
        std::thread::sleep(Duration::from_millis(100));
        drop(self.stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_snapshot_orders_oldest_first() {
        let tap = AnalysisTap::new();
        let fill: Vec<f32> = (0..TAP_WINDOW as i32).map(|i| i as f32).collect();
        tap.push(&fill);
        tap.push(&[1000.0, 1001.0]);

        let mut out = [0.0; TAP_WINDOW];
        tap.snapshot(&mut out);
        assert_eq!(out[0], 2.0);
        assert_eq!(out[TAP_WINDOW - 2], 1000.0);
        assert_eq!(out[TAP_WINDOW - 1], 1001.0);
    }

    #[test]
    fn tap_reset_zeroes_window() {
        let tap = AnalysisTap::new();
        tap.push(&[0.5; 100]);
        tap.reset();

        let mut out = [1.0; TAP_WINDOW];
        tap.snapshot(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[tokio::test]
    async fn decode_failure_never_starts_a_session() {
        let controller = PlaybackController::new();
        let err = controller
            .play(Some("audio/mpeg"), b"not really an mp3 payload")
            .await
            .unwrap_err();
        assert!(matches!(err, PlayError::Decode(_)));
        assert!(!controller.is_playing());
    }

    #[tokio::test]
    async fn empty_payload_is_a_decode_error() {
        let controller = PlaybackController::new();
        let err = controller.play(None, &[]).await.unwrap_err();
        assert!(matches!(err, PlayError::Decode(DecodeError::Empty)));
    }

    #[tokio::test]
    async fn second_play_while_session_active_is_rejected() {
        let controller = PlaybackController::new();

        // Occupy the session slot the way an in-flight play holds it.
        assert!(controller.begin());
        assert!(controller.is_playing());

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0i16, 1000, -1000, 0] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let err = controller
            .play(Some("audio/wav"), &cursor.into_inner())
            .await
            .unwrap_err();
        assert!(matches!(err, PlayError::SessionActive));

        // The rejected call must not have released the active session.
        assert!(controller.is_playing());
        controller.end();
        assert!(!controller.is_playing());
    }
}
