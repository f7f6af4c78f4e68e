//
// Frequency-magnitude visualization sampler.
//
// Reduces the playback tap's sample window to 48 bar heights, once per
// display-refresh tick. The cadence comes from a `FrameClock` so the loop
// can ride a real vsync signal or a plain timer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::playback::{AnalysisTap, TAP_WINDOW};
use voxtalk_core::session::{AudioSample, BAR_COUNT, MAX_BAR_HEIGHT_PX, silent_sample};

/// Transform window size in samples.
pub const FFT_SIZE: usize = TAP_WINDOW;

/// Usable magnitude bins (below Nyquist).
const SPECTRUM_BINS: usize = FFT_SIZE / 2;

/// One tick per displayed frame.
#[async_trait]
pub trait FrameClock: Send {
    async fn tick(&mut self);
}

/// Timer-backed clock for hosts without a native refresh signal.
pub struct IntervalFrameClock {
    interval: tokio::time::Interval,
}

impl IntervalFrameClock {
    pub fn new(frames_per_second: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / f64::from(frames_per_second.max(1)));
        let mut interval = tokio::time::interval(period);
        // Skip, don't burst: a stalled host should not replay missed frames.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl FrameClock for IntervalFrameClock {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

pub struct SignalSampler {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    frame: [f32; FFT_SIZE],
    scale: f32,
    tap: Option<AnalysisTap>,
}

impl SignalSampler {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        // Hann window keeps neighbouring-bin leakage out of the bars.
        let window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| {
                let phase = (i as f32) / (FFT_SIZE as f32);
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * phase).cos())
            })
            .collect();

        // A full-scale sine peaks at window_sum / 2 in its bin; scale so
        // that maps to 1.0.
        let window_sum: f32 = window.iter().sum();
        let scale = 2.0 / window_sum;

        Self {
            fft,
            window,
            scratch,
            frame: [0.0; FFT_SIZE],
            scale,
            tap: None,
        }
    }

    pub fn attach(&mut self, tap: AnalysisTap) {
        self.tap = Some(tap);
    }

    pub fn detach(&mut self) {
        self.tap = None;
    }

    pub fn is_attached(&self) -> bool {
        self.tap.is_some()
    }

    /// Compute one visualization frame from the tap's current window.
    ///
    /// Each bar takes the maximum magnitude over its contiguous bin range
    /// rather than the average, so short transients stay visible.
    pub fn sample(&mut self) -> AudioSample {
        let Some(tap) = &self.tap else {
            return silent_sample();
        };
        tap.snapshot(&mut self.frame);

        let mut buf: Vec<Complex<f32>> = self
            .frame
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| Complex { re: s * w, im: 0.0 })
            .collect();
        self.fft.process_with_scratch(&mut buf, &mut self.scratch);

        let bucket = SPECTRUM_BINS / BAR_COUNT;
        let mut bars = Vec::with_capacity(BAR_COUNT);
        for bar in 0..BAR_COUNT {
            let mut peak = 0.0f32;
            for bin in bar * bucket..(bar + 1) * bucket {
                peak = peak.max(buf[bin].norm());
            }
            let height = (peak * self.scale).clamp(0.0, 1.0) * f32::from(MAX_BAR_HEIGHT_PX);
            bars.push(height.round() as u16);
        }
        bars
    }

    /// Emit one frame per clock tick while attached and `active`, then a
    /// single neutral frame.
    ///
    /// Returning here is what unsubscribes from the refresh signal; no
    /// timer keeps firing once playback stops.
    pub async fn run<C, A, E>(&mut self, clock: &mut C, active: A, mut emit: E)
    where
        C: FrameClock,
        A: Fn() -> bool,
        E: FnMut(AudioSample),
    {
        while self.tap.is_some() && active() {
            clock.tick().await;
            emit(self.sample());
        }
        emit(silent_sample());
    }
}

impl Default for SignalSampler {
    fn default() -> Self {
        Self::new()
    }
}
