//! Framing and windowing.
//!
//! Slices a mono signal into overlapping `win_length` frames spaced
//! `hop_length` apart, applies a periodic Hann window, and zero-pads each
//! frame on the right to `n_fft` samples. Trailing samples that do not fill a
//! whole frame are dropped.

use crate::config::SpectrogramParams;
use crate::dsp::fft::hann_window;
use crate::error::Result;
use std::borrow::Cow;
use std::sync::Arc;

pub struct Framer<'a> {
    signal: Cow<'a, [f32]>,
    window: Arc<Vec<f64>>,
    n_fft: usize,
    hop_length: usize,
    n_frames: usize,
}

impl<'a> Framer<'a> {
    /// Fails with `ParityError::Params` unless `0 < win_length <= n_fft` and `hop_length > 0`.
    pub fn new(samples: &'a [f32], params: &SpectrogramParams) -> Result<Self> {
        params.validate_framing()?;
        let signal = if params.center {
            Cow::Owned(reflect_pad(samples, params.n_fft / 2))
        } else {
            Cow::Borrowed(samples)
        };
        Ok(Self {
            signal,
            window: hann_window(params.win_length),
            n_fft: params.n_fft,
            hop_length: params.hop_length,
            n_frames: params.frame_count(samples.len()),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.n_frames
    }

    pub fn frame_len(&self) -> usize {
        self.n_fft
    }

    /// Write windowed, zero-padded frame `index` into `out` (length `n_fft`).
    pub fn fill(&self, index: usize, out: &mut [f64]) {
        debug_assert!(index < self.n_frames);
        debug_assert_eq!(out.len(), self.n_fft);
        let win_length = self.window.len();
        let start = index * self.hop_length;
        let src = &self.signal[start..start + win_length];
        for (dst, (&s, &w)) in out.iter_mut().zip(src.iter().zip(self.window.iter())) {
            *dst = s as f64 * w;
        }
        out[win_length..].fill(0.0);
    }

    /// Lazy iterator over all frames in time order. Call again to restart.
    pub fn iter(&self) -> Frames<'_, 'a> {
        Frames {
            framer: self,
            next: 0,
        }
    }
}

#[derive(Clone)]
pub struct Frames<'f, 'a> {
    framer: &'f Framer<'a>,
    next: usize,
}

impl Iterator for Frames<'_, '_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        if self.next >= self.framer.n_frames {
            return None;
        }
        let mut frame = vec![0.0; self.framer.n_fft];
        self.framer.fill(self.next, &mut frame);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.framer.n_frames - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Frames<'_, '_> {}

/// Mirror `pad` samples onto each end without repeating the edge sample.
///
/// Signals shorter than `pad` keep reflecting back and forth.
pub fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let n = samples.len();
    if n == 0 {
        return vec![0.0; 2 * pad];
    }
    let mut out = Vec::with_capacity(n + 2 * pad);
    for i in 0..n + 2 * pad {
        let pos = i as isize - pad as isize;
        out.push(samples[reflect_index(pos, n)]);
    }
    out
}

fn reflect_index(pos: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = pos.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}
