use anyhow::Context;
use rubato::Resampler;

/// Resample mono PCM in [-1, 1] to a different sample rate.
///
/// Used in both directions: decoded speech up to the output device rate,
/// and captured microphone audio down to recognizer rates.
pub fn resample_mono(
    samples: &[f32],
    from_rate_hz: u32,
    to_rate_hz: u32,
) -> anyhow::Result<Vec<f32>> {
    if from_rate_hz == to_rate_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let from: usize = from_rate_hz.try_into().context("invalid source rate")?;
    let to: usize = to_rate_hz.try_into().context("invalid target rate")?;

    let params = rubato::SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: rubato::SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: rubato::WindowFunction::BlackmanHarris2,
    };

    let mut resampler = rubato::SincFixedIn::<f32>::new(
        to as f64 / from as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .context("create resampler")?;

    let out = resampler
        .process(&[samples.to_vec()], None)
        .context("resample")?;
    Ok(out.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_identity() {
        let x = vec![0.0, 0.5, -0.5, 0.25];
        assert_eq!(resample_mono(&x, 24_000, 24_000).unwrap(), x);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(resample_mono(&[], 24_000, 48_000).unwrap().is_empty());
    }

    #[test]
    fn upsampling_roughly_doubles_length() {
        let x = vec![0.1f32; 4_800];
        let y = resample_mono(&x, 24_000, 48_000).unwrap();
        let ratio = y.len() as f64 / x.len() as f64;
        assert!((1.8..=2.2).contains(&ratio), "ratio was {ratio}");
    }
}
