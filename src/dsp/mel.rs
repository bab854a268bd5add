//! Mel scales and the triangular mel filterbank.
//!
//! Two conventions are supported and they differ in both the Hz↔mel formula
//! and the filter normalization:
//!
//! - [`MelScale::Htk`]: `mel = 2595 log10(1 + f/700)`, triangles peak at 1.
//! - [`MelScale::Slaney`]: linear below 1 kHz, logarithmic above, each
//!   triangle scaled so its discrete area `Σ_k w[k] · (sr / n_fft)` is 1.

use crate::config::SpectrogramParams;
use crate::error::{ParityError, Result};
use crate::types::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MelScale {
    Htk,
    Slaney,
}

// Slaney scale: 3 mels per 200 Hz up to 1 kHz, then 27 mels per factor of 6.4.
const SLANEY_F_SP: f64 = 200.0 / 3.0;
const SLANEY_MIN_LOG_HZ: f64 = 1000.0;
const SLANEY_MIN_LOG_MEL: f64 = SLANEY_MIN_LOG_HZ / SLANEY_F_SP;

fn slaney_logstep() -> f64 {
    6.4f64.ln() / 27.0
}

impl MelScale {
    pub fn from_htk(htk: bool) -> Self {
        if htk {
            MelScale::Htk
        } else {
            MelScale::Slaney
        }
    }

    pub fn hz_to_mel(self, hz: f64) -> f64 {
        match self {
            MelScale::Htk => 2595.0 * (1.0 + hz / 700.0).log10(),
            MelScale::Slaney => {
                if hz < SLANEY_MIN_LOG_HZ {
                    hz / SLANEY_F_SP
                } else {
                    SLANEY_MIN_LOG_MEL + (hz / SLANEY_MIN_LOG_HZ).ln() / slaney_logstep()
                }
            }
        }
    }

    pub fn mel_to_hz(self, mel: f64) -> f64 {
        match self {
            MelScale::Htk => 700.0 * (10f64.powf(mel / 2595.0) - 1.0),
            MelScale::Slaney => {
                if mel < SLANEY_MIN_LOG_MEL {
                    mel * SLANEY_F_SP
                } else {
                    SLANEY_MIN_LOG_HZ * (slaney_logstep() * (mel - SLANEY_MIN_LOG_MEL)).exp()
                }
            }
        }
    }

    /// Triangles are area-normalized on the Slaney path only.
    pub fn area_normalized(self) -> bool {
        self == MelScale::Slaney
    }
}

/// `n_mels + 2` frequencies (Hz) equally spaced on the mel axis.
pub fn mel_frequencies(n_points: usize, f_min: f64, f_max: f64, scale: MelScale) -> Vec<f64> {
    let mel_min = scale.hz_to_mel(f_min);
    let mel_max = scale.hz_to_mel(f_max);
    let last = n_points.saturating_sub(1).max(1) as f64;
    let mut hz: Vec<f64> = (0..n_points)
        .map(|i| scale.mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / last))
        .collect();
    // Pin the band edges so round-off cannot push them across a bin boundary.
    if let Some(first) = hz.first_mut() {
        *first = f_min;
    }
    if n_points > 1 {
        hz[n_points - 1] = f_max;
    }
    hz
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterSupport {
    pub lo: usize,
    pub center: usize,
    pub hi: usize,
}

/// Dense `n_mels x (n_fft/2 + 1)` triangular filterbank.
#[derive(Clone, Debug)]
pub struct MelFilterBank {
    weights: Matrix,
    supports: Vec<FilterSupport>,
    scale: MelScale,
    hz_points: Vec<f64>,
}

impl MelFilterBank {
    /// Build a filterbank from `params`, whatever their `kind`.
    pub fn new(sample_rate: u32, params: &SpectrogramParams) -> Result<Self> {
        params.validate_framing()?;
        params.validate_mel(sample_rate)?;
        Ok(Self::build(sample_rate, params))
    }

    /// `params` must already have passed framing and mel validation.
    pub(crate) fn build(sample_rate: u32, params: &SpectrogramParams) -> Self {
        let f_max = params.resolved_f_max(sample_rate);
        let scale = MelScale::from_htk(params.htk);
        let n_bins = params.n_freq_bins();
        let n_mels = params.n_mels;

        let hz_points = mel_frequencies(n_mels + 2, params.f_min, f_max, scale);
        let bin_points: Vec<usize> = hz_points
            .iter()
            .map(|&hz| {
                let bin = (hz * params.n_fft as f64 / sample_rate as f64).round();
                (bin.max(0.0) as usize).min(n_bins - 1)
            })
            .collect();

        let bin_hz = sample_rate as f64 / params.n_fft as f64;
        let mut weights = Matrix::zeros(n_mels, n_bins);
        let mut supports = Vec::with_capacity(n_mels);
        for m in 0..n_mels {
            let support = FilterSupport {
                lo: bin_points[m],
                center: bin_points[m + 1],
                hi: bin_points[m + 2],
            };
            // The center bin always carries weight 1, so the sum is at least 1.
            let gain = if scale.area_normalized() {
                let mass: f64 = (support.lo..=support.hi).map(|k| triangle(k, support)).sum();
                1.0 / (mass * bin_hz)
            } else {
                1.0
            };
            for k in support.lo..=support.hi {
                weights.set(m, k, gain * triangle(k, support));
            }
            supports.push(support);
        }

        log::debug!(
            "mel filterbank: {n_mels} filters over {n_bins} bins, {:.1}-{:.1} Hz, {:?}",
            params.f_min,
            f_max,
            scale
        );

        Self {
            weights,
            supports,
            scale,
            hz_points,
        }
    }

    pub fn n_mels(&self) -> usize {
        self.weights.rows()
    }

    pub fn n_bins(&self) -> usize {
        self.weights.cols()
    }

    pub fn scale(&self) -> MelScale {
        self.scale
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn support(&self, m: usize) -> FilterSupport {
        self.supports[m]
    }

    /// Band-edge and center frequencies (Hz), `n_mels + 2` values.
    pub fn hz_points(&self) -> &[f64] {
        &self.hz_points
    }

    /// `mel[m, t] = Σ_k filter[m, k] · power[k, t]`.
    pub fn apply(&self, power: &Matrix) -> Result<Matrix> {
        if power.rows() != self.n_bins() {
            return Err(ParityError::Params(format!(
                "power spectrogram has {} bins, filterbank expects {}",
                power.rows(),
                self.n_bins()
            )));
        }
        let n_frames = power.cols();
        let mut mel = Matrix::zeros(self.n_mels(), n_frames);
        for (m, support) in self.supports.iter().enumerate() {
            for k in support.lo..=support.hi {
                let w = self.weights.get(m, k);
                if w == 0.0 {
                    continue;
                }
                let bin = power.row(k);
                for (t, &p) in bin.iter().enumerate() {
                    let acc = mel.get(m, t) + w * p;
                    mel.set(m, t, acc);
                }
            }
        }
        Ok(mel)
    }
}

/// Unit-peak triangle over `[lo, hi]`, peaking at `center`.
///
/// Degenerate edges (e.g. `lo == center`) collapse to a step at the center bin.
fn triangle(k: usize, s: FilterSupport) -> f64 {
    if k < s.lo || k > s.hi {
        0.0
    } else if k < s.center {
        (k - s.lo) as f64 / (s.center - s.lo) as f64
    } else if k == s.center {
        1.0
    } else {
        (s.hi - k) as f64 / (s.hi - s.center) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mel_params(htk: bool) -> SpectrogramParams {
        SpectrogramParams {
            htk,
            ..SpectrogramParams::mel()
        }
    }

    #[test]
    fn test_htk_mel_zero_and_monotonic() {
        assert_eq!(MelScale::Htk.hz_to_mel(0.0), 0.0);
        let mut prev = MelScale::Htk.hz_to_mel(0.0);
        for hz in (1..2400).map(|i| i as f64 * 10.0) {
            let mel = MelScale::Htk.hz_to_mel(hz);
            assert!(mel > prev, "not increasing at {hz} Hz");
            prev = mel;
        }
        assert_relative_eq!(MelScale::Htk.hz_to_mel(1000.0), 1000.0, epsilon = 0.1);
    }

    #[test]
    fn test_slaney_piecewise() {
        assert_relative_eq!(MelScale::Slaney.hz_to_mel(200.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(MelScale::Slaney.hz_to_mel(1000.0), 15.0, epsilon = 1e-12);
        assert_relative_eq!(MelScale::Slaney.hz_to_mel(6400.0), 42.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scales_invert() {
        for scale in [MelScale::Htk, MelScale::Slaney] {
            for hz in [0.0, 125.0, 999.0, 1000.0, 4321.0, 11025.0] {
                assert_relative_eq!(scale.mel_to_hz(scale.hz_to_mel(hz)), hz, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_filter_shape_and_support() {
        for htk in [true, false] {
            let bank = MelFilterBank::new(16000, &mel_params(htk)).unwrap();
            assert_eq!(bank.weights().shape(), (40, 257));
            for m in 0..bank.n_mels() {
                let s = bank.support(m);
                for k in 0..bank.n_bins() {
                    let w = bank.weights().get(m, k);
                    assert!(w >= 0.0);
                    if k < s.lo || k > s.hi {
                        assert_eq!(w, 0.0, "filter {m} leaks into bin {k}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_htk_triangles_peak_at_one() {
        let bank = MelFilterBank::new(16000, &mel_params(true)).unwrap();
        for m in 0..bank.n_mels() {
            let s = bank.support(m);
            assert_eq!(bank.weights().get(m, s.center), 1.0);
        }
    }

    #[test]
    fn test_slaney_filters_have_equal_area() {
        let cases = [(16000u32, 512usize, 40usize), (22050, 2048, 128), (8000, 256, 64)];
        for (sr, n_fft, n_mels) in cases {
            let params = SpectrogramParams {
                n_fft,
                win_length: n_fft,
                n_mels,
                ..mel_params(false)
            };
            let bank = MelFilterBank::new(sr, &params).unwrap();
            let bin_hz = sr as f64 / n_fft as f64;
            for m in 0..bank.n_mels() {
                let area: f64 = bank.weights().row(m).iter().sum::<f64>() * bin_hz;
                assert_relative_eq!(area, 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_slaney_filters_keep_unit_area() {
        // 128 filters over 129 bins crowd the low end so edges share a bin.
        let params = SpectrogramParams {
            n_fft: 256,
            win_length: 256,
            n_mels: 128,
            ..mel_params(false)
        };
        let bank = MelFilterBank::new(8000, &params).unwrap();
        let degenerate: Vec<usize> = (0..bank.n_mels())
            .filter(|&m| {
                let s = bank.support(m);
                s.lo == s.center || s.center == s.hi
            })
            .collect();
        assert!(!degenerate.is_empty());
        for m in degenerate {
            let area: f64 = bank.weights().row(m).iter().sum::<f64>() * (8000.0 / 256.0);
            assert_relative_eq!(area, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_new_checks_mel_limits_for_any_kind() {
        let params = SpectrogramParams {
            f_min: 9000.0,
            ..SpectrogramParams::default()
        };
        assert!(matches!(
            MelFilterBank::new(16000, &params),
            Err(ParityError::Params(_))
        ));
        let bad_window = SpectrogramParams {
            win_length: 1024,
            ..mel_params(true)
        };
        assert!(MelFilterBank::new(16000, &bad_window).is_err());
    }

    #[test]
    fn test_supports_cover_band() {
        let params = SpectrogramParams {
            f_min: 300.0,
            f_max: Some(6000.0),
            ..mel_params(true)
        };
        let bank = MelFilterBank::new(16000, &params).unwrap();
        let first = (300.0f64 * 512.0 / 16000.0).round() as usize;
        let last = (6000.0f64 * 512.0 / 16000.0).round() as usize;
        for k in first..=last {
            let covered = (0..bank.n_mels()).any(|m| {
                let s = bank.support(m);
                s.lo <= k && k <= s.hi
            });
            assert!(covered, "bin {k} not covered");
        }
        assert_eq!(bank.support(0).lo, first);
        assert_eq!(bank.support(bank.n_mels() - 1).hi, last);
    }

    #[test]
    fn test_apply_projects_power() {
        let bank = MelFilterBank::new(16000, &mel_params(true)).unwrap();
        let mut power = Matrix::zeros(257, 2);
        let target = bank.support(10).center;
        power.set(target, 1, 4.0);
        let mel = bank.apply(&power).unwrap();
        assert_eq!(mel.shape(), (40, 2));
        assert_eq!(mel.get(10, 1), 4.0);
        assert!(mel.row(10)[0] == 0.0);
    }

    #[test]
    fn test_apply_rejects_wrong_bin_count() {
        let bank = MelFilterBank::new(16000, &mel_params(true)).unwrap();
        assert!(bank.apply(&Matrix::zeros(129, 3)).is_err());
    }
}
