use std::io::Cursor;

/// Decoded mono PCM audio in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate_hz)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty audio payload")]
    Empty,

    #[error("unrecognized audio format")]
    UnknownFormat,

    #[error("mp3 decode failed: {0}")]
    Mp3(String),

    #[error("wav decode failed: {0}")]
    Wav(String),
}

/// Decode a synthesized speech payload into mono PCM.
///
/// The response content type picks the decoder; when the server omits or
/// mislabels it, the payload magic bytes decide.
pub fn decode_audio(content_type: Option<&str>, bytes: &[u8]) -> Result<AudioClip, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    match sniff_format(content_type, bytes) {
        Some(Format::Wav) => decode_wav(bytes),
        Some(Format::Mp3) => decode_mp3(bytes),
        None => Err(DecodeError::UnknownFormat),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Mp3,
    Wav,
}

fn sniff_format(content_type: Option<&str>, bytes: &[u8]) -> Option<Format> {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("mpeg") || ct.contains("mp3") {
            return Some(Format::Mp3);
        }
        if ct.contains("wav") || ct.contains("wave") {
            return Some(Format::Wav);
        }
    }

    if bytes.len() >= 4 && &bytes[..4] == b"RIFF" {
        return Some(Format::Wav);
    }
    // ID3 tag or raw MPEG frame sync.
    if bytes.len() >= 3 && &bytes[..3] == b"ID3" {
        return Some(Format::Mp3);
    }
    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 {
        return Some(Format::Mp3);
    }

    None
}

fn decode_mp3(bytes: &[u8]) -> Result<AudioClip, DecodeError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate_hz = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate_hz == 0 {
                    sample_rate_hz = frame.sample_rate as u32;
                }

                if frame.channels == 2 {
                    for pair in frame.data.chunks(2) {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        samples.push((left + right) / 2.0);
                    }
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(DecodeError::Mp3(e.to_string())),
        }
    }

    if samples.is_empty() || sample_rate_hz == 0 {
        return Err(DecodeError::Mp3("no decodable frames".into()));
    }

    Ok(AudioClip {
        sample_rate_hz,
        samples,
    })
}

fn decode_wav(bytes: &[u8]) -> Result<AudioClip, DecodeError> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| DecodeError::Wav(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| DecodeError::Wav(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / max))
                .collect::<Result<_, _>>()
                .map_err(|e| DecodeError::Wav(e.to_string()))?
        }
    };

    if interleaved.is_empty() {
        return Err(DecodeError::Wav("no samples".into()));
    }

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioClip {
        sample_rate_hz: spec.sample_rate,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_mono_wav_by_magic_bytes() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[0, i16::MAX, i16::MIN, 0]);

        let clip = decode_audio(None, &bytes).unwrap();
        assert_eq!(clip.sample_rate_hz, 22_050);
        assert_eq!(clip.samples.len(), 4);
        assert!((clip.samples[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn downmixes_stereo_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        // L = max, R = min on every frame: the mono mix is ~0.
        let bytes = wav_bytes(spec, &[i16::MAX, i16::MIN, i16::MAX, i16::MIN]);

        let clip = decode_audio(Some("audio/wav"), &bytes).unwrap();
        assert_eq!(clip.samples.len(), 2);
        assert!(clip.samples[0].abs() < 1e-3);
    }

    #[test]
    fn content_type_wins_over_sniffing() {
        assert_eq!(
            sniff_format(Some("audio/mpeg"), b"RIFFxxxx"),
            Some(Format::Mp3)
        );
        assert_eq!(sniff_format(None, b"RIFFxxxx"), Some(Format::Wav));
        assert_eq!(sniff_format(None, &[0xFF, 0xFB, 0x90]), Some(Format::Mp3));
    }

    #[test]
    fn rejects_empty_and_unknown_payloads() {
        assert!(matches!(decode_audio(None, &[]), Err(DecodeError::Empty)));
        assert!(matches!(
            decode_audio(None, b"<html>bad gateway</html>"),
            Err(DecodeError::UnknownFormat)
        ));
    }

    #[test]
    fn duration_follows_sample_rate() {
        let clip = AudioClip {
            sample_rate_hz: 16_000,
            samples: vec![0.0; 8_000],
        };
        assert!((clip.duration_secs() - 0.5).abs() < 1e-9);
    }
}
