use crate::error::{ParityError, Result};

/// Decoded mono audio, ready for framing.
#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source file before downmixing.
    pub channels: u32,
    pub duration_secs: f64,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u32) -> Self {
        let duration_secs = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration_secs,
        }
    }
}

/// Dense row-major 2-D tensor: one contiguous buffer plus `(rows, cols)`.
///
/// For spectrograms, rows are frequency bins and columns are time frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ParityError::Schema(format!(
                "buffer of {} values cannot form a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ParityError::Schema(format!(
                    "row {i} has {} values, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.index(row, col);
        self.data[i] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major flattened values.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Copy of the top-left `rows x cols` block, clamped to this matrix's extent.
    pub fn trimmed(&self, rows: usize, cols: usize) -> Matrix {
        let rows = rows.min(self.rows);
        let cols = cols.min(self.cols);
        if rows == self.rows && cols == self.cols {
            return self.clone();
        }
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            data.extend_from_slice(&self.row(r)[..cols]);
        }
        Matrix { rows, cols, data }
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        }))
    }
}
