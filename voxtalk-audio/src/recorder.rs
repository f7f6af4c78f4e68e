//
// CPAL-based microphone recorder for one utterance at a time.
//
// The device stream lives on a dedicated worker thread and is controlled
// over a command channel; capture callbacks never touch shared state
// beyond their own channels. Recognizer frontends sit on top of this and
// turn the captured PCM into a transcript.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream};

use crate::resample::resample_mono;

/// Sample rate most recognizers expect.
pub const RECOGNIZER_RATE_HZ: u32 = 16_000;

#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("no input device found")]
    NoInputDevice,

    #[error("failed to get default config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("audio worker failed: {0}")]
    Worker(String),

    #[error("audio worker startup timeout")]
    WorkerTimeout,

    #[error("capture stop timed out")]
    StopTimeout,

    #[error("failed to resample: {0}")]
    Resample(#[from] anyhow::Error),

    #[error("internal channel error")]
    Channel,
}

pub struct CapturedAudio {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

impl CapturedAudio {
    /// Downsample to the rate recognizers expect.
    pub fn for_recognizer(&self) -> Result<CapturedAudio, AudioCaptureError> {
        let samples = if self.sample_rate_hz == RECOGNIZER_RATE_HZ {
            self.samples.clone()
        } else {
            resample_mono(&self.samples, self.sample_rate_hz, RECOGNIZER_RATE_HZ)?
        };
        Ok(CapturedAudio {
            sample_rate_hz: RECOGNIZER_RATE_HZ,
            samples,
        })
    }
}

type LevelCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

pub struct AudioRecorder {
    cmd_tx: mpsc::Sender<Cmd>,
    worker_handle: Option<std::thread::JoinHandle<()>>,
    sample_rate_hz: u32,
    level_cb: Arc<Mutex<Option<LevelCallback>>>,
}

enum Cmd {
    Start,
    Stop(mpsc::Sender<Vec<f32>>),
    Cancel,
    Shutdown,
}

enum WorkerMsg {
    Ready,
    Error(String),
}

impl AudioRecorder {
    /// Per-chunk mono level callback, for UI metering while listening.
    pub fn set_level_callback<F>(&self, cb: F)
    where
        F: Fn(&[f32]) + Send + Sync + 'static,
    {
        let mut guard = self.level_cb.lock().unwrap();
        *guard = Some(Arc::new(cb));
    }

    pub fn open_default() -> Result<Self, AudioCaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioCaptureError::NoInputDevice)?;
        Self::open(device)
    }

    pub fn open(device: Device) -> Result<Self, AudioCaptureError> {
        // Use the device's native config and resample later if needed.
        let default_cfg = device.default_input_config()?;
        let sample_rate_hz = default_cfg.sample_rate().0;

        let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>();
        let (cmd_tx, cmd_rx) = mpsc::channel::<Cmd>();
        let (worker_tx, worker_rx) = mpsc::channel::<WorkerMsg>();

        let level_cb: Arc<Mutex<Option<LevelCallback>>> = Arc::new(Mutex::new(None));
        let level_cb_worker = level_cb.clone();

        let worker_handle = std::thread::spawn(move || {
            let config = default_cfg;
            let sample_format = config.sample_format();
            let channels = config.channels() as usize;

            let stream = match sample_format {
                SampleFormat::F32 => {
                    build_input_stream::<f32>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::I16 => {
                    build_input_stream::<i16>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::U16 => {
                    build_input_stream::<u16>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::I32 => {
                    build_input_stream::<i32>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::F64 => {
                    build_input_stream::<f64>(&device, &config.clone().into(), channels, sample_tx)
                }
                _ => build_input_stream::<f32>(&device, &config.clone().into(), channels, sample_tx),
            };

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = worker_tx.send(WorkerMsg::Error(format!("build stream: {e}")));
                    log::error!("input stream build failed: {e}");
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = worker_tx.send(WorkerMsg::Error(format!("play stream: {e}")));
                log::error!("input stream play failed: {e}");
                return;
            }

            let _ = worker_tx.send(WorkerMsg::Ready);

            run_consumer(sample_rx, cmd_rx, level_cb_worker);
            drop(stream);
        });

        // Block briefly until the worker has either started the stream or failed.
        match worker_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(WorkerMsg::Ready) => {}
            Ok(WorkerMsg::Error(e)) => return Err(AudioCaptureError::Worker(e)),
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(AudioCaptureError::WorkerTimeout),
            Err(_) => return Err(AudioCaptureError::Channel),
        }

        Ok(Self {
            cmd_tx,
            worker_handle: Some(worker_handle),
            sample_rate_hz,
            level_cb,
        })
    }

    pub fn start(&self) -> Result<(), AudioCaptureError> {
        self.cmd_tx
            .send(Cmd::Start)
            .map_err(|_| AudioCaptureError::Channel)
    }

    /// Stop the current utterance and hand back everything captured.
    pub fn stop(&self) -> Result<CapturedAudio, AudioCaptureError> {
        let (resp_tx, resp_rx) = mpsc::channel();
        self.cmd_tx
            .send(Cmd::Stop(resp_tx))
            .map_err(|_| AudioCaptureError::Channel)?;

        let samples = resp_rx
            .recv_timeout(Duration::from_secs(3))
            .map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => AudioCaptureError::StopTimeout,
                mpsc::RecvTimeoutError::Disconnected => AudioCaptureError::Channel,
            })?;

        Ok(CapturedAudio {
            sample_rate_hz: self.sample_rate_hz,
            samples,
        })
    }

    /// Stop and discard the current utterance. Safe when idle.
    pub fn cancel(&self) -> Result<(), AudioCaptureError> {
        self.cmd_tx
            .send(Cmd::Cancel)
            .map_err(|_| AudioCaptureError::Channel)
    }

    pub fn close(mut self) -> Result<(), AudioCaptureError> {
        let _ = self.cmd_tx.send(Cmd::Shutdown);
        if let Some(h) = self.worker_handle.take() {
            let _ = h.join();
        }
        Ok(())
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sample_tx: mpsc::Sender<Vec<f32>>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: Sample + SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let mut mono: Vec<f32> = Vec::new();

    let cb = move |data: &[T], _: &cpal::InputCallbackInfo| {
        mono.clear();

        if channels == 1 {
            mono.extend(data.iter().map(|&s| s.to_sample::<f32>()));
        } else {
            for frame in data.chunks_exact(channels) {
                let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                mono.push(sum / channels as f32);
            }
        }

        let _ = sample_tx.send(mono.clone());
    };

    device.build_input_stream(
        config,
        cb,
        |err| {
            // These errors are the only clue for "capture started but silent".
            log::error!("input stream error: {err}");
        },
        None,
    )
}

fn run_consumer(
    sample_rx: mpsc::Receiver<Vec<f32>>,
    cmd_rx: mpsc::Receiver<Cmd>,
    level_cb: Arc<Mutex<Option<LevelCallback>>>,
) {
    let mut recording = false;
    let mut captured: Vec<f32> = Vec::new();

    loop {
        // Always drain commands promptly, even if the stream is stalled.
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                Cmd::Start => {
                    recording = true;
                    captured.clear();
                }
                Cmd::Stop(resp) => {
                    recording = false;
                    let out = std::mem::take(&mut captured);
                    let _ = resp.send(out);
                }
                Cmd::Cancel => {
                    recording = false;
                    captured.clear();
                }
                Cmd::Shutdown => return,
            }
        }

        match sample_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(samples) => {
                if let Some(cb) = level_cb.lock().unwrap().as_ref() {
                    cb(&samples);
                }
                if recording {
                    captured.extend_from_slice(&samples);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // No audio chunk yet; loop around to check commands again.
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer_fixture() -> (
        mpsc::Sender<Vec<f32>>,
        mpsc::Sender<Cmd>,
        std::thread::JoinHandle<()>,
        Arc<Mutex<Option<LevelCallback>>>,
    ) {
        let (sample_tx, sample_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let level_cb: Arc<Mutex<Option<LevelCallback>>> = Arc::new(Mutex::new(None));
        let cb = level_cb.clone();
        let handle = std::thread::spawn(move || run_consumer(sample_rx, cmd_rx, cb));
        (sample_tx, cmd_tx, handle, level_cb)
    }

    #[test]
    fn consumer_collects_only_while_recording() {
        let (sample_tx, cmd_tx, handle, _cb) = consumer_fixture();

        sample_tx.send(vec![9.0]).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        cmd_tx.send(Cmd::Start).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        sample_tx.send(vec![1.0, 2.0]).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let (resp_tx, resp_rx) = mpsc::channel();
        cmd_tx.send(Cmd::Stop(resp_tx)).unwrap();
        let captured = resp_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(captured, vec![1.0, 2.0]);

        cmd_tx.send(Cmd::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn cancel_discards_captured_audio() {
        let (sample_tx, cmd_tx, handle, _cb) = consumer_fixture();

        cmd_tx.send(Cmd::Start).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        sample_tx.send(vec![0.5; 8]).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        cmd_tx.send(Cmd::Cancel).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        cmd_tx.send(Cmd::Start).unwrap();
        let (resp_tx, resp_rx) = mpsc::channel();
        cmd_tx.send(Cmd::Stop(resp_tx)).unwrap();
        let captured = resp_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(captured.is_empty());

        cmd_tx.send(Cmd::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn level_callback_sees_chunks_even_when_idle() {
        let (sample_tx, cmd_tx, handle, level_cb) = consumer_fixture();

        let seen = Arc::new(Mutex::new(0usize));
        let seen_cb = seen.clone();
        *level_cb.lock().unwrap() = Some(Arc::new(move |chunk: &[f32]| {
            *seen_cb.lock().unwrap() += chunk.len();
        }));

        sample_tx.send(vec![0.1, 0.2, 0.3]).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(*seen.lock().unwrap(), 3);

        cmd_tx.send(Cmd::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn recognizer_rate_passthrough_skips_resampling() {
        let captured = CapturedAudio {
            sample_rate_hz: RECOGNIZER_RATE_HZ,
            samples: vec![0.0, 0.5],
        };
        let out = captured.for_recognizer().unwrap();
        assert_eq!(out.sample_rate_hz, RECOGNIZER_RATE_HZ);
        assert_eq!(out.samples, captured.samples);
    }
}
