//! Agreement statistics between a candidate and a reference spectrogram.
//!
//! All ratio-like metrics divide by the reference: `mean_relative_error` is
//! `mean(|A - B| / (B + 1e-10))` and `scale_ratio` is `mean(A) / mean(B)`,
//! with `A` the candidate and `B` the reference. Swapping the arguments
//! changes both numbers even though the agreement is the same.

use crate::artifact::Artifact;
use crate::types::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Guards the relative error against near-zero reference values.
pub const RELATIVE_ERROR_EPSILON: f64 = 1e-10;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let scale = magnitude(values);
        let mean = values.iter().map(|v| v / scale).sum::<f64>() / n;
        let var = values
            .iter()
            .map(|v| (v / scale - mean) * (v / scale - mean))
            .sum::<f64>()
            / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some(Self {
            min,
            max,
            mean: mean * scale,
            std: var.sqrt() * scale,
        })
    }
}

/// Largest finite magnitude in `values`, or 1 when there is none.
///
/// Sums and products run on `v / magnitude` so values near `f64::MAX` stay finite.
fn magnitude(values: &[f64]) -> f64 {
    let m = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if m > 0.0 {
        m
    } else {
        1.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Candidate,
    Reference,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Candidate => "candidate",
            Side::Reference => "reference",
        })
    }
}

/// Non-fatal conditions noticed while comparing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Shapes differed; both tensors were cut to their top-left overlap.
    Trimmed {
        candidate: (usize, usize),
        reference: (usize, usize),
        common: (usize, usize),
    },
    ParamMismatch {
        field: String,
        candidate: String,
        reference: String,
    },
    /// Row count disagrees with the artifact's own metadata.
    BinCountMismatch {
        artifact: Side,
        expected: usize,
        actual: usize,
    },
    EmptyOverlap,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Trimmed {
                candidate,
                reference,
                common,
            } => write!(
                f,
                "shapes differ (candidate {candidate:?}, reference {reference:?}); trimmed to {common:?}"
            ),
            Annotation::ParamMismatch {
                field,
                candidate,
                reference,
            } => write!(
                f,
                "parameter '{field}' differs: candidate {candidate}, reference {reference}"
            ),
            Annotation::BinCountMismatch {
                artifact,
                expected,
                actual,
            } => write!(
                f,
                "{artifact} has {actual} frequency bins but its params imply {expected}"
            ),
            Annotation::EmptyOverlap => write!(f, "no overlapping values to compare"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub min_correlation: f64,
    pub max_relative_error: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            min_correlation: 0.95,
            max_relative_error: 0.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", content = "failures", rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail(Vec<String>),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub candidate_shape: (usize, usize),
    pub reference_shape: (usize, usize),
    pub common_shape: (usize, usize),
    pub candidate: Option<Summary>,
    pub reference: Option<Summary>,
    /// Pearson correlation of the flattened overlap. `None` when one side has
    /// zero variance and the two are not identical, and never `Some(NaN)`.
    pub correlation: Option<f64>,
    pub mean_relative_error: f64,
    /// `mean(candidate) / mean(reference)`; `None` when only the reference mean
    /// is zero or the quotient overflows.
    pub scale_ratio: Option<f64>,
    pub max_abs_diff: f64,
    pub annotations: Vec<Annotation>,
}

impl ComparisonReport {
    pub fn trimmed(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::Trimmed { .. }))
    }

    pub fn verdict(&self, tolerance: &Tolerance) -> Verdict {
        let mut failures = Vec::new();
        if self.annotations.contains(&Annotation::EmptyOverlap) {
            failures.push("no overlapping values".to_string());
        }
        match self.correlation {
            Some(r) if r.is_nan() || r < tolerance.min_correlation => failures.push(format!(
                "correlation {r:.6} below {}",
                tolerance.min_correlation
            )),
            Some(_) => {}
            None => failures.push("correlation undefined (zero variance)".to_string()),
        }
        if self.mean_relative_error.is_nan()
            || self.mean_relative_error > tolerance.max_relative_error
        {
            failures.push(format!(
                "mean relative error {:.6} above {}",
                self.mean_relative_error, tolerance.max_relative_error
            ));
        }
        if failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(failures)
        }
    }
}

/// Compare `candidate` against `reference`.
///
/// Never fails: differing shapes are trimmed to
/// `(min(h_a, h_b), min(w_a, w_b))` from index 0 and reported through
/// [`Annotation::Trimmed`]. Metrics are candidate-over-reference.
pub fn compare(candidate: &Artifact, reference: &Artifact) -> ComparisonReport {
    let mut annotations = Vec::new();
    let (ha, wa) = candidate.shape();
    let (hb, wb) = reference.shape();
    let common = (ha.min(hb), wa.min(wb));

    if (ha, wa) != (hb, wb) {
        log::warn!(
            "shape mismatch: candidate {:?}, reference {:?}; trimming to {:?}",
            (ha, wa),
            (hb, wb),
            common
        );
        annotations.push(Annotation::Trimmed {
            candidate: (ha, wa),
            reference: (hb, wb),
            common,
        });
    }

    if candidate.sample_rate() != reference.sample_rate() {
        annotations.push(Annotation::ParamMismatch {
            field: "sample_rate".into(),
            candidate: candidate.sample_rate().to_string(),
            reference: reference.sample_rate().to_string(),
        });
    }
    let param_diffs = candidate.params().differences(
        candidate.sample_rate(),
        reference.params(),
        reference.sample_rate(),
    );
    for (field, a, b) in param_diffs {
        annotations.push(Annotation::ParamMismatch {
            field: field.into(),
            candidate: a,
            reference: b,
        });
    }
    for (side, artifact) in [(Side::Candidate, candidate), (Side::Reference, reference)] {
        let expected = artifact.expected_bins();
        let actual = artifact.shape().0;
        if expected != actual {
            annotations.push(Annotation::BinCountMismatch {
                artifact: side,
                expected,
                actual,
            });
        }
    }

    let a = candidate.data().trimmed(common.0, common.1);
    let b = reference.data().trimmed(common.0, common.1);
    if a.is_empty() {
        annotations.push(Annotation::EmptyOverlap);
    }
    let stats = PairStats::of(&a, &b);

    ComparisonReport {
        candidate_shape: (ha, wa),
        reference_shape: (hb, wb),
        common_shape: common,
        candidate: Summary::of(a.values()),
        reference: Summary::of(b.values()),
        correlation: stats.correlation,
        mean_relative_error: stats.mean_relative_error,
        scale_ratio: stats.scale_ratio,
        max_abs_diff: stats.max_abs_diff,
        annotations,
    }
}

struct PairStats {
    correlation: Option<f64>,
    mean_relative_error: f64,
    scale_ratio: Option<f64>,
    max_abs_diff: f64,
}

impl PairStats {
    fn of(a: &Matrix, b: &Matrix) -> Self {
        let (a, b) = (a.values(), b.values());
        // Identical inputs agree perfectly even where the formulas are 0/0.
        if a == b {
            return Self {
                correlation: Some(1.0),
                mean_relative_error: 0.0,
                scale_ratio: Some(1.0),
                max_abs_diff: 0.0,
            };
        }
        let n = a.len() as f64;
        let (scale_a, scale_b) = (magnitude(a), magnitude(b));
        // Means and moments of the rescaled values; Pearson is scale-invariant.
        let mean_a = a.iter().map(|x| x / scale_a).sum::<f64>() / n;
        let mean_b = b.iter().map(|y| y / scale_b).sum::<f64>() / n;

        let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        let (mut rel, mut max_abs_diff) = (0.0, 0.0f64);
        for (&x, &y) in a.iter().zip(b) {
            let (dx, dy) = (x / scale_a - mean_a, y / scale_b - mean_b);
            cov += dx * dy;
            var_a += dx * dx;
            var_b += dy * dy;
            let diff = (x - y).abs();
            rel += diff / (y + RELATIVE_ERROR_EPSILON);
            max_abs_diff = max_abs_diff.max(diff);
        }

        let correlation = if var_a > 0.0 && var_b > 0.0 {
            let r = cov / (var_a.sqrt() * var_b.sqrt());
            r.is_finite().then(|| r.clamp(-1.0, 1.0))
        } else {
            None
        };
        let scale_ratio = if mean_b != 0.0 {
            Some((mean_a / mean_b) * (scale_a / scale_b)).filter(|r| r.is_finite())
        } else {
            None
        };
        Self {
            correlation,
            mean_relative_error: rel / n,
            scale_ratio,
            max_abs_diff,
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.6}"))
}

fn fmt_summary(f: &mut fmt::Formatter<'_>, label: &str, s: &Option<Summary>) -> fmt::Result {
    match s {
        Some(s) => writeln!(
            f,
            "{label} - Mean: {:.6}, Std: {:.6}, Min: {:.6}, Max: {:.6}",
            s.mean, s.std, s.min, s.max
        ),
        None => writeln!(f, "{label} - no values"),
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Comparison Results ===")?;
        writeln!(f, "Candidate shape: {:?}", self.candidate_shape)?;
        writeln!(f, "Reference shape: {:?}", self.reference_shape)?;
        if self.trimmed() {
            writeln!(f, "Trimmed to common shape: {:?}", self.common_shape)?;
        }
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        fmt_summary(f, "Candidate", &self.candidate)?;
        fmt_summary(f, "Reference", &self.reference)?;
        writeln!(f, "Correlation: {}", fmt_opt(self.correlation))?;
        writeln!(f, "Mean relative error: {:.6}", self.mean_relative_error)?;
        writeln!(
            f,
            "Mean ratio (candidate/reference): {}",
            fmt_opt(self.scale_ratio)
        )?;
        writeln!(f, "Max absolute difference: {:.6e}", self.max_abs_diff)?;
        let notes: Vec<&Annotation> = self
            .annotations
            .iter()
            .filter(|a| !matches!(a, Annotation::Trimmed { .. }))
            .collect();
        if !notes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Notes:")?;
            for note in notes {
                writeln!(f, "  - {note}")?;
            }
        }
        Ok(())
    }
}
