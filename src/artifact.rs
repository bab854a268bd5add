//! Spectrogram artifacts and their JSON interchange schema.
//!
//! ```text
//! {
//!   "data":  [[...], ...],            freq_bins x time_frames
//!   "shape": [freq_bins, time_frames],
//!   "sample_rate": 16000,
//!   "params": { "type": "stft" | "mel", "n_fft": .., "hop_length": ..,
//!               "win_length": .., "center": .., "n_mels": .., "f_min": ..,
//!               "f_max": .. | null, "htk": .. }
//! }
//! ```
//!
//! Candidate and reference producers both go through this module, so the
//! comparison side never needs to know which one wrote a file.

use crate::config::{SpectrogramKind, SpectrogramParams};
use crate::error::{ParityError, Result};
use crate::types::Matrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// An immutable spectrogram tensor tagged with the parameters that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    data: Matrix,
    sample_rate: u32,
    params: SpectrogramParams,
}

#[derive(Serialize)]
struct ArtifactOut<'a> {
    data: Vec<Vec<f64>>,
    shape: [usize; 2],
    sample_rate: u32,
    params: &'a SpectrogramParams,
}

#[derive(Deserialize)]
struct ArtifactIn {
    data: Vec<Vec<f64>>,
    shape: [usize; 2],
    sample_rate: u32,
    params: ParamsIn,
}

/// Mel keys are only required on `"mel"` artifacts.
#[derive(Deserialize)]
struct ParamsIn {
    #[serde(rename = "type")]
    kind: SpectrogramKind,
    n_fft: usize,
    hop_length: usize,
    win_length: usize,
    center: bool,
    n_mels: Option<usize>,
    f_min: Option<f64>,
    #[serde(default)]
    f_max: Option<f64>,
    htk: Option<bool>,
}

impl ParamsIn {
    fn into_params(self) -> Result<SpectrogramParams> {
        let defaults = SpectrogramParams::default();
        if self.kind == SpectrogramKind::Mel {
            let missing: Vec<&str> = [
                ("n_mels", self.n_mels.is_none()),
                ("f_min", self.f_min.is_none()),
                ("htk", self.htk.is_none()),
            ]
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| *name)
            .collect();
            if !missing.is_empty() {
                return Err(ParityError::Schema(format!(
                    "mel artifact is missing params: {}",
                    missing.join(", ")
                )));
            }
        }
        Ok(SpectrogramParams {
            kind: self.kind,
            n_fft: self.n_fft,
            hop_length: self.hop_length,
            win_length: self.win_length,
            center: self.center,
            n_mels: self.n_mels.unwrap_or(defaults.n_mels),
            f_min: self.f_min.unwrap_or(defaults.f_min),
            f_max: self.f_max,
            htk: self.htk.unwrap_or(defaults.htk),
        })
    }
}

impl Artifact {
    /// Wrap a computed tensor. Values must be finite and non-negative.
    pub fn new(data: Matrix, sample_rate: u32, params: SpectrogramParams) -> Result<Self> {
        check_values(&data)?;
        Ok(Self {
            data,
            sample_rate,
            params,
        })
    }

    pub fn data(&self) -> &Matrix {
        &self.data
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn params(&self) -> &SpectrogramParams {
        &self.params
    }

    /// Rows implied by the metadata: `n_fft/2 + 1` (stft) or `n_mels` (mel).
    pub fn expected_bins(&self) -> usize {
        self.params.output_bins()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: ArtifactIn = serde_json::from_str(text).map_err(schema_or_json)?;
        let declared = (raw.shape[0], raw.shape[1]);
        // An empty outer array cannot express its column count; `shape` supplies it.
        let data = if raw.data.is_empty() && declared.0 == 0 {
            Matrix::zeros(0, declared.1)
        } else {
            Matrix::from_rows(&raw.data)?
        };
        if declared != data.shape() {
            return Err(ParityError::Schema(format!(
                "declared shape {:?} does not match data shape {:?}",
                declared,
                data.shape()
            )));
        }
        let params = raw.params.into_params()?;
        Artifact::new(data, raw.sample_rate, params)
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ParityError::io(path, e))?;
        let artifact = Self::from_json_str(&text)?;
        log::debug!(
            "read {} artifact {:?} from {}",
            artifact.params.kind.as_str(),
            artifact.shape(),
            path.display()
        );
        Ok(artifact)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_out())?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ParityError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.to_out())?;
        writer.flush().map_err(|e| ParityError::io(path, e))?;
        Ok(())
    }

    /// One row per frequency bin: `freq_bin,frame_0,frame_1,...` header first.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ParityError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_csv_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| ParityError::io(path, e))
    }

    fn write_csv_to(&self, w: &mut impl Write) -> std::io::Result<()> {
        write!(w, "freq_bin")?;
        for t in 0..self.data.cols() {
            write!(w, ",frame_{t}")?;
        }
        writeln!(w)?;
        for k in 0..self.data.rows() {
            write!(w, "{k}")?;
            for v in self.data.row(k) {
                write!(w, ",{v}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    fn to_out(&self) -> ArtifactOut<'_> {
        ArtifactOut {
            data: self.data.to_rows(),
            shape: [self.data.rows(), self.data.cols()],
            sample_rate: self.sample_rate,
            params: &self.params,
        }
    }
}

fn check_values(data: &Matrix) -> Result<()> {
    if let Some(i) = data.values().iter().position(|v| !v.is_finite() || *v < 0.0) {
        let (r, c) = (i / data.cols().max(1), i % data.cols().max(1));
        return Err(ParityError::Schema(format!(
            "value {} at [{r}][{c}] is not a finite non-negative number",
            data.values()[i]
        )));
    }
    Ok(())
}

/// Missing keys and wrong value types are schema problems; broken syntax is a JSON problem.
fn schema_or_json(e: serde_json::Error) -> ParityError {
    match e.classify() {
        serde_json::error::Category::Data => ParityError::Schema(e.to_string()),
        _ => ParityError::Json(e),
    }
}
