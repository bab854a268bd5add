use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParityError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Artifact file is structurally unusable (missing keys, ragged data, bad values).
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Invalid parameters: {0}")]
    Params(String),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("FFT error: {0}")]
    Fft(#[from] realfft::FftError),
    #[error("PNG error: {0}")]
    Png(#[from] png::EncodingError),
}

impl ParityError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParityError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, ParityError::Schema(_) | ParityError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, ParityError>;
