pub mod cue;
pub mod decode;
pub mod playback;
pub mod recorder;
pub mod resample;
pub mod sampler;

pub use cue::CuePlayer;
pub use decode::{AudioClip, DecodeError, decode_audio};
pub use playback::{AnalysisTap, PlayError, PlaybackController};
pub use recorder::{AudioCaptureError, AudioRecorder, CapturedAudio};
pub use sampler::{FrameClock, IntervalFrameClock, SignalSampler};
