//! Spectrogram generating parameters.
//!
//! [`SpectrogramParams`] enumerates every option a producer may set. The
//! serialized key names are the `params` object of the artifact interchange
//! schema, so the same value round-trips through artifact files and through
//! `--params` overlay files.

use crate::error::{ParityError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrogramKind {
    /// Linear-frequency power spectrogram, `n_fft/2 + 1` rows.
    #[default]
    Stft,
    /// Mel-projected power spectrogram, `n_mels` rows.
    Mel,
}

impl SpectrogramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectrogramKind::Stft => "stft",
            SpectrogramKind::Mel => "mel",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramParams {
    #[serde(rename = "type")]
    pub kind: SpectrogramKind,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    /// Reflection-pad `n_fft/2` samples on both sides before framing.
    pub center: bool,
    pub n_mels: usize,
    pub f_min: f64,
    /// Upper filterbank edge in Hz. `None` means Nyquist.
    pub f_max: Option<f64>,
    /// HTK mel formula with unnormalized triangles; otherwise the
    /// piecewise (Slaney) formula with area-normalized triangles.
    pub htk: bool,
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self {
            kind: SpectrogramKind::Stft,
            n_fft: 512,
            hop_length: 160,
            win_length: 400,
            center: false,
            n_mels: 40,
            f_min: 0.0,
            f_max: None,
            htk: true,
        }
    }
}

impl SpectrogramParams {
    pub fn mel() -> Self {
        Self {
            kind: SpectrogramKind::Mel,
            ..Self::default()
        }
    }

    pub fn is_mel(&self) -> bool {
        self.kind == SpectrogramKind::Mel
    }

    /// Rows of the linear power spectrogram.
    pub fn n_freq_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Rows of the final artifact for this configuration.
    pub fn output_bins(&self) -> usize {
        match self.kind {
            SpectrogramKind::Stft => self.n_freq_bins(),
            SpectrogramKind::Mel => self.n_mels,
        }
    }

    pub fn resolved_f_max(&self, sample_rate: u32) -> f64 {
        self.f_max.unwrap_or(sample_rate as f64 / 2.0)
    }

    /// Number of frames produced from `n_samples` input samples.
    pub fn frame_count(&self, n_samples: usize) -> usize {
        let padded = if self.center {
            n_samples + 2 * (self.n_fft / 2)
        } else {
            n_samples
        };
        if self.hop_length == 0 || padded < self.win_length {
            return 0;
        }
        (padded - self.win_length) / self.hop_length + 1
    }

    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(ParityError::Params("sample_rate must be positive".into()));
        }
        self.validate_framing()?;
        if self.is_mel() {
            self.validate_mel(sample_rate)?;
        }
        Ok(())
    }

    /// Checks that only concern framing; no sample rate needed.
    pub fn validate_framing(&self) -> Result<()> {
        if self.n_fft == 0 {
            return Err(ParityError::Params("n_fft must be positive".into()));
        }
        if self.hop_length == 0 {
            return Err(ParityError::Params("hop_length must be positive".into()));
        }
        if self.win_length == 0 || self.win_length > self.n_fft {
            return Err(ParityError::Params(format!(
                "win_length must be in 1..={}, got {}",
                self.n_fft, self.win_length
            )));
        }
        Ok(())
    }

    pub(crate) fn validate_mel(&self, sample_rate: u32) -> Result<()> {
        if self.n_mels == 0 {
            return Err(ParityError::Params("n_mels must be positive".into()));
        }
        let nyquist = sample_rate as f64 / 2.0;
        let f_max = self.resolved_f_max(sample_rate);
        if !self.f_min.is_finite() || self.f_min < 0.0 {
            return Err(ParityError::Params(format!(
                "f_min must be a non-negative frequency, got {}",
                self.f_min
            )));
        }
        if !f_max.is_finite() || f_max > nyquist {
            return Err(ParityError::Params(format!(
                "f_max must not exceed Nyquist ({nyquist} Hz), got {f_max}"
            )));
        }
        if self.f_min >= f_max {
            return Err(ParityError::Params(format!(
                "f_min ({}) must be below f_max ({f_max})",
                self.f_min
            )));
        }
        Ok(())
    }

    /// Merge a partial JSON object over these parameters.
    ///
    /// Only keys present in `overlay` change; unknown keys are rejected.
    pub fn with_overlay(&self, overlay: &serde_json::Value) -> Result<Self> {
        let overlay = overlay.as_object().ok_or_else(|| {
            ParityError::Params("parameter overlay must be a JSON object".into())
        })?;
        let mut merged = serde_json::to_value(self)?;
        if let Some(base) = merged.as_object_mut() {
            for (key, value) in overlay {
                if !base.contains_key(key) {
                    return Err(ParityError::Params(format!("unknown parameter '{key}'")));
                }
                base.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged)
            .map_err(|e| ParityError::Params(format!("bad parameter value: {e}")))
    }

    /// Read a partial parameter file and merge it over `self`.
    pub fn with_overlay_file(&self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ParityError::io(path, e))?;
        let overlay: serde_json::Value = serde_json::from_str(&text)?;
        self.with_overlay(&overlay)
    }

    /// Names and rendered values of every field that differs from `other`.
    ///
    /// `f_max` is compared after resolving `None` to each side's Nyquist.
    pub fn differences(
        &self,
        sample_rate: u32,
        other: &Self,
        other_sample_rate: u32,
    ) -> Vec<(&'static str, String, String)> {
        let mut out = Vec::new();
        let mut check = |name: &'static str, a: String, b: String| {
            if a != b {
                out.push((name, a, b));
            }
        };
        check("type", self.kind.as_str().into(), other.kind.as_str().into());
        check("n_fft", self.n_fft.to_string(), other.n_fft.to_string());
        check("hop_length", self.hop_length.to_string(), other.hop_length.to_string());
        check("win_length", self.win_length.to_string(), other.win_length.to_string());
        check("center", self.center.to_string(), other.center.to_string());
        if self.is_mel() && other.is_mel() {
            check("n_mels", self.n_mels.to_string(), other.n_mels.to_string());
            check("f_min", self.f_min.to_string(), other.f_min.to_string());
            check(
                "f_max",
                self.resolved_f_max(sample_rate).to_string(),
                other.resolved_f_max(other_sample_rate).to_string(),
            );
            check("htk", self.htk.to_string(), other.htk.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_valid() {
        SpectrogramParams::default().validate(16000).unwrap();
        SpectrogramParams::mel().validate(16000).unwrap();
    }

    #[test]
    fn test_frame_count_without_centering() {
        let params = SpectrogramParams::default();
        assert_eq!(params.frame_count(16000), 98);
        assert_eq!(params.frame_count(399), 0);
        assert_eq!(params.frame_count(400), 1);
    }

    #[test]
    fn test_frame_count_with_centering() {
        let params = SpectrogramParams {
            center: true,
            ..SpectrogramParams::default()
        };
        // 16000 + 2 * 256 = 16512 padded samples
        assert_eq!(params.frame_count(16000), (16512 - 400) / 160 + 1);
    }

    #[test]
    fn test_window_longer_than_fft_rejected() {
        let params = SpectrogramParams {
            win_length: 1024,
            ..SpectrogramParams::default()
        };
        assert!(matches!(params.validate(16000), Err(ParityError::Params(_))));
    }

    #[test]
    fn test_mel_band_edges_validated() {
        let inverted = SpectrogramParams {
            f_min: 4000.0,
            f_max: Some(2000.0),
            ..SpectrogramParams::mel()
        };
        assert!(inverted.validate(16000).is_err());

        let above_nyquist = SpectrogramParams {
            f_max: Some(9000.0),
            ..SpectrogramParams::mel()
        };
        assert!(above_nyquist.validate(16000).is_err());
    }

    #[test]
    fn test_mel_limits_ignored_for_stft() {
        let params = SpectrogramParams {
            f_min: 9000.0,
            ..SpectrogramParams::default()
        };
        params.validate(16000).unwrap();
    }

    #[test]
    fn test_overlay_merges_partial_object() {
        let merged = SpectrogramParams::default()
            .with_overlay(&json!({"type": "mel", "htk": false, "f_max": 7600.0}))
            .unwrap();
        assert!(merged.is_mel());
        assert!(!merged.htk);
        assert_eq!(merged.f_max, Some(7600.0));
        assert_eq!(merged.n_fft, 512);
    }

    #[test]
    fn test_overlay_rejects_unknown_key() {
        let err = SpectrogramParams::default()
            .with_overlay(&json!({"window": "hamming"}))
            .unwrap_err();
        assert!(matches!(err, ParityError::Params(_)));
    }

    #[test]
    fn test_serialized_keys_match_schema() {
        let value = serde_json::to_value(SpectrogramParams::default()).unwrap();
        assert_eq!(value["type"], "stft");
        assert!(value["f_max"].is_null());
        assert_eq!(value["hop_length"], 160);
    }

    #[test]
    fn test_differences_reports_htk_swap() {
        let a = SpectrogramParams::mel();
        let b = SpectrogramParams {
            htk: false,
            ..SpectrogramParams::mel()
        };
        let diffs = a.differences(16000, &b, 16000);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].0, "htk");
    }

    #[test]
    fn test_differences_resolve_f_max_to_nyquist() {
        let implicit = SpectrogramParams::mel();
        let explicit = SpectrogramParams {
            f_max: Some(8000.0),
            ..SpectrogramParams::mel()
        };
        assert!(implicit.differences(16000, &explicit, 16000).is_empty());

        // Same null f_max, different Nyquist.
        let diffs = implicit.differences(16000, &implicit, 22050);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0], ("f_max", "8000".to_string(), "11025".to_string()));
    }

    #[test]
    fn test_framing_checked_without_sample_rate() {
        SpectrogramParams::default().validate_framing().unwrap();
        let wide = SpectrogramParams {
            n_fft: 256,
            ..SpectrogramParams::default()
        };
        assert!(matches!(wide.validate_framing(), Err(ParityError::Params(_))));
        let no_hop = SpectrogramParams {
            hop_length: 0,
            ..SpectrogramParams::default()
        };
        assert!(no_hop.validate_framing().is_err());
    }
}
