//! Spectrogram parity checking.
//!
//! Produce power or mel spectrograms from audio ([`dsp::Extractor`]), exchange
//! them as JSON [`Artifact`]s, and measure how closely a candidate agrees with
//! a reference ([`compare()`]).

pub mod artifact;
pub mod audio;
pub mod canvas;
pub mod compare;
pub mod config;
pub mod dsp;
pub mod error;
pub mod types;

pub use artifact::Artifact;
pub use compare::{compare, Annotation, ComparisonReport, Summary, Tolerance, Verdict};
pub use config::{SpectrogramKind, SpectrogramParams};
pub use dsp::Extractor;
pub use error::{ParityError, Result};
pub use types::{AudioData, Matrix};
