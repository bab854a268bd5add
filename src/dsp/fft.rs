use crate::config::SpectrogramParams;
use crate::dsp::frames::Framer;
use crate::error::Result;
use crate::types::Matrix;
use realfft::{RealFftPlanner, RealToComplex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

thread_local! {
    static FFT_PLANNER: RefCell<RealFftPlanner<f64>> = RefCell::new(RealFftPlanner::new());
    static HANN_CACHE: RefCell<HashMap<usize, Arc<Vec<f64>>>> = RefCell::new(HashMap::new());
}

/// Periodic Hann window: `w[n] = 0.5 - 0.5 cos(2πn / size)`.
///
/// Periodic (denominator `size`, not `size - 1`) so a frame's window matches
/// the DFT-even convention used by reference feature extractors.
pub fn hann_window(size: usize) -> Arc<Vec<f64>> {
    HANN_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .entry(size)
            .or_insert_with(|| {
                Arc::new(
                    (0..size)
                        .map(|i| {
                            0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()
                        })
                        .collect(),
                )
            })
            .clone()
    })
}

pub(crate) fn plan_forward(n_fft: usize) -> Arc<dyn RealToComplex<f64>> {
    FFT_PLANNER.with(|p| p.borrow_mut().plan_fft_forward(n_fft))
}

/// Compute the unnormalized power spectrogram `|X[k, t]|²` of every frame.
///
/// Returns `n_fft/2 + 1` rows (bins) by `frame_count` columns (frames). No
/// scaling is applied: no `1/n_fft`, no window-energy correction.
pub fn power_spectrogram(framer: &Framer<'_>) -> Result<Matrix> {
    let n_fft = framer.frame_len();
    let n_bins = n_fft / 2 + 1;
    let n_frames = framer.frame_count();
    let mut power = Matrix::zeros(n_bins, n_frames);
    if n_frames == 0 {
        return Ok(power);
    }

    let fft = plan_forward(n_fft);

    // Pre-allocate FFT buffers once and reuse across frames
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    for t in 0..n_frames {
        // realfft scrambles the input buffer, so refill it every frame
        framer.fill(t, &mut input);
        fft.process(&mut input, &mut spectrum)?;
        for (k, c) in spectrum.iter().enumerate() {
            power.set(k, t, c.norm_sqr());
        }
    }

    log::debug!("power spectrogram: {n_bins} bins x {n_frames} frames (n_fft={n_fft})");
    Ok(power)
}

/// Convenience wrapper: frame `samples` with `params` and return the power spectrogram.
pub fn compute_power(samples: &[f32], params: &SpectrogramParams) -> Result<Matrix> {
    power_spectrogram(&Framer::new(samples, params)?)
}

/// Index of the bin with the most total energy across all frames.
pub fn peak_bin(power: &Matrix) -> Option<usize> {
    (0..power.rows())
        .map(|k| (k, power.row(k).iter().sum::<f64>()))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f64, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect()
    }

    fn params(n_fft: usize, hop_length: usize, win_length: usize) -> SpectrogramParams {
        SpectrogramParams {
            n_fft,
            hop_length,
            win_length,
            ..SpectrogramParams::default()
        }
    }

    #[test]
    fn test_hann_is_periodic() {
        let w = hann_window(4);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[3], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_is_half_spectrum_by_frames() {
        let samples = vec![0.0f32; 16000];
        let power = compute_power(&samples, &params(512, 160, 400)).unwrap();
        assert_eq!(power.shape(), (257, 98));
    }

    #[test]
    fn test_dc_power_is_unnormalized() {
        // Sum of a periodic Hann window of length N is N/2, so DC power is (N/2)².
        let samples = vec![1.0f32; 8];
        let power = compute_power(&samples, &params(8, 8, 8)).unwrap();
        assert_eq!(power.shape(), (5, 1));
        assert_relative_eq!(power.get(0, 0), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sine_energy_lands_in_nearest_bin() {
        let cases = [
            (440.0, 16000u32, 512usize),
            (1000.0, 44100, 1024),
            (3000.0, 8000, 256),
            (5000.0, 22050, 2048),
        ];
        for (f0, sr, n_fft) in cases {
            let samples = sine(f0, sr, sr as usize);
            let power = compute_power(&samples, &params(n_fft, n_fft / 4, n_fft)).unwrap();
            let expected = (f0 * n_fft as f64 / sr as f64).round() as usize;
            assert_eq!(
                peak_bin(&power),
                Some(expected),
                "f0={f0} sr={sr} n_fft={n_fft}"
            );
        }
    }

    #[test]
    fn test_values_non_negative() {
        let samples = sine(440.0, 16000, 4000);
        let power = compute_power(&samples, &params(512, 160, 400)).unwrap();
        assert!(power.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_empty_when_signal_shorter_than_window() {
        let samples = vec![0.1f32; 100];
        let power = compute_power(&samples, &params(512, 160, 400)).unwrap();
        assert_eq!(power.shape(), (257, 0));
    }

    #[test]
    fn test_window_longer_than_fft_is_params_error() {
        let samples = vec![0.1f32; 4000];
        let result = compute_power(&samples, &params(256, 128, 400));
        assert!(matches!(result, Err(crate::error::ParityError::Params(_))));
    }
}
