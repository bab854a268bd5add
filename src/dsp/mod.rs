pub mod fft;
pub mod frames;
pub mod mel;

use crate::artifact::Artifact;
use crate::config::SpectrogramParams;
use crate::error::Result;
use crate::types::AudioData;
use frames::Framer;
use mel::MelFilterBank;

/// Samples → (framing → power → optional mel) → [`Artifact`].
///
/// Parameters are validated once here; `process` can then be called for any
/// number of signals at the same sample rate.
pub struct Extractor {
    sample_rate: u32,
    params: SpectrogramParams,
    filterbank: Option<MelFilterBank>,
}

impl Extractor {
    pub fn new(sample_rate: u32, params: SpectrogramParams) -> Result<Self> {
        params.validate(sample_rate)?;
        let filterbank = if params.is_mel() {
            Some(MelFilterBank::build(sample_rate, &params))
        } else {
            None
        };
        Ok(Self {
            sample_rate,
            params,
            filterbank,
        })
    }

    pub fn params(&self) -> &SpectrogramParams {
        &self.params
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn filterbank(&self) -> Option<&MelFilterBank> {
        self.filterbank.as_ref()
    }

    pub fn process(&self, samples: &[f32]) -> Result<Artifact> {
        let framer = Framer::new(samples, &self.params)?;
        let power = fft::power_spectrogram(&framer)?;
        let data = match &self.filterbank {
            Some(bank) => bank.apply(&power)?,
            None => power,
        };
        log::info!(
            "{} spectrogram: {} x {} from {} samples",
            self.params.kind.as_str(),
            data.rows(),
            data.cols(),
            samples.len()
        );
        Artifact::new(data, self.sample_rate, self.params.clone())
    }

    pub fn process_audio(&self, audio: &AudioData) -> Result<Artifact> {
        self.process(&audio.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpectrogramKind;

    #[test]
    fn test_stft_pipeline_shape() {
        let extractor = Extractor::new(16000, SpectrogramParams::default()).unwrap();
        let artifact = extractor.process(&vec![0.25f32; 16000]).unwrap();
        assert_eq!(artifact.shape(), (257, 98));
        assert_eq!(artifact.params().kind, SpectrogramKind::Stft);
    }

    #[test]
    fn test_mel_pipeline_shape() {
        let extractor = Extractor::new(16000, SpectrogramParams::mel()).unwrap();
        assert!(extractor.filterbank().is_some());
        let artifact = extractor.process(&vec![0.25f32; 16000]).unwrap();
        assert_eq!(artifact.shape(), (40, 98));
    }

    #[test]
    fn test_invalid_params_rejected_at_construction() {
        let params = SpectrogramParams {
            hop_length: 0,
            ..SpectrogramParams::default()
        };
        assert!(Extractor::new(16000, params).is_err());
    }

    #[test]
    fn test_mel_bank_built_from_validated_params() {
        let params = SpectrogramParams {
            htk: false,
            ..SpectrogramParams::mel()
        };
        let extractor = Extractor::new(16000, params.clone()).unwrap();
        let direct = MelFilterBank::new(16000, &params).unwrap();
        assert_eq!(extractor.filterbank().unwrap().weights(), direct.weights());

        let above_nyquist = SpectrogramParams {
            f_max: Some(9000.0),
            ..SpectrogramParams::mel()
        };
        assert!(Extractor::new(16000, above_nyquist).is_err());
    }
}
