//! The comparison figure: a 3 x 2 grid of panels.
//!
//! ```text
//! +----------------------+----------------------+
//! | candidate heatmap    | reference heatmap    |
//! +----------------------+----------------------+
//! | dB difference        | log-log scatter      |
//! +----------------------+----------------------+
//! | candidate histogram  | reference histogram  |
//! +----------------------+----------------------+
//! ```
//!
//! Everything is drawn from the trimmed overlap recorded in the report. The
//! scatter panel shows a seeded random subsample; statistics are never
//! recomputed here.

use crate::artifact::Artifact;
use crate::canvas::colors::{power_to_db, Colormap};
use crate::canvas::raster::Raster;
use crate::canvas::spectrogram_renderer::{render_db_difference, render_heatmap};
use crate::compare::ComparisonReport;
use crate::types::Matrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const PANEL_WIDTH: u32 = 400;
pub const PANEL_HEIGHT: u32 = 260;
const MARGIN: u32 = 12;
const PLOT_INSET: u32 = 6;

pub const MAX_SCATTER_POINTS: usize = 10_000;
pub const SCATTER_SEED: u64 = 42;
pub const HISTOGRAM_BINS: usize = 60;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const FRAME: [u8; 3] = [160, 160, 160];
const CANDIDATE_COLOR: [u8; 3] = [221, 132, 82];
const REFERENCE_COLOR: [u8; 3] = [76, 114, 176];
const IDENTITY_COLOR: [u8; 3] = [200, 30, 30];

#[derive(Clone, Copy, Debug)]
struct Panel {
    x: i64,
    y: i64,
    w: u32,
    h: u32,
}

impl Panel {
    fn at(col: u32, row: u32) -> Self {
        Self {
            x: (MARGIN + col * (PANEL_WIDTH + MARGIN)) as i64,
            y: (MARGIN + row * (PANEL_HEIGHT + MARGIN)) as i64,
            w: PANEL_WIDTH,
            h: PANEL_HEIGHT,
        }
    }

    /// Drawing area inside the frame.
    fn inner(&self) -> Self {
        Self {
            x: self.x + PLOT_INSET as i64,
            y: self.y + PLOT_INSET as i64,
            w: self.w - 2 * PLOT_INSET,
            h: self.h - 2 * PLOT_INSET,
        }
    }

    /// Map unit coordinates (`0..=1`, y up) to pixels.
    fn point(&self, u: f64, v: f64) -> (i64, i64) {
        let x = self.x + (u.clamp(0.0, 1.0) * (self.w - 1) as f64).round() as i64;
        let y = self.y + ((1.0 - v.clamp(0.0, 1.0)) * (self.h - 1) as f64).round() as i64;
        (x, y)
    }
}

/// Render the comparison figure for `candidate` vs `reference`.
pub fn render_comparison(
    report: &ComparisonReport,
    candidate: &Artifact,
    reference: &Artifact,
) -> Raster {
    let (rows, cols) = report.common_shape;
    let a = candidate.data().trimmed(rows, cols);
    let b = reference.data().trimmed(rows, cols);

    let width = 2 * PANEL_WIDTH + 3 * MARGIN;
    let height = 3 * PANEL_HEIGHT + 4 * MARGIN;
    let mut canvas = Raster::new(width, height, BACKGROUND);

    let panels = [
        Panel::at(0, 0),
        Panel::at(1, 0),
        Panel::at(0, 1),
        Panel::at(1, 1),
        Panel::at(0, 2),
        Panel::at(1, 2),
    ];
    for p in &panels {
        canvas.stroke_rect(p.x, p.y, p.w, p.h, FRAME);
    }

    if a.is_empty() {
        log::warn!("nothing to draw: empty overlap {:?}", report.common_shape);
        return canvas;
    }

    let heat = |m: &Matrix, canvas: &mut Raster, p: Panel| {
        let inner = p.inner();
        let image = render_heatmap(m, Colormap::Viridis);
        canvas.blit_scaled(&image, inner.x, inner.y, inner.w, inner.h);
    };
    heat(&a, &mut canvas, panels[0]);
    heat(&b, &mut canvas, panels[1]);

    let inner = panels[2].inner();
    let (diff, span) = render_db_difference(&a, &b);
    canvas.blit_scaled(&diff, inner.x, inner.y, inner.w, inner.h);
    log::debug!("difference panel spans ±{span:.2} dB");

    draw_scatter(&mut canvas, panels[3].inner(), &a, &b);

    let db_a: Vec<f64> = a.values().iter().map(|&v| power_to_db(v)).collect();
    let db_b: Vec<f64> = b.values().iter().map(|&v| power_to_db(v)).collect();
    let lo = db_a.iter().chain(&db_b).copied().fold(f64::INFINITY, f64::min);
    let hi = db_a.iter().chain(&db_b).copied().fold(f64::NEG_INFINITY, f64::max);
    let counts_a = histogram(&db_a, lo, hi, HISTOGRAM_BINS);
    let counts_b = histogram(&db_b, lo, hi, HISTOGRAM_BINS);
    draw_histogram(&mut canvas, panels[4].inner(), &counts_a, CANDIDATE_COLOR);
    draw_histogram(&mut canvas, panels[5].inner(), &counts_b, REFERENCE_COLOR);

    canvas
}

/// Counts of `values` in `bins` equal-width bins over `[lo, hi]`.
/// The top edge belongs to the last bin.
pub fn histogram(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 {
        return counts;
    }
    let width = hi - lo;
    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let i = if width > 0.0 {
            (((v - lo) / width * bins as f64) as usize).min(bins - 1)
        } else {
            0
        };
        counts[i] += 1;
    }
    counts
}

/// Bars with log-scaled heights so sparse tails stay visible.
fn draw_histogram(canvas: &mut Raster, p: Panel, counts: &[usize], color: [u8; 3]) {
    let peak = counts.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        return;
    }
    let norm = (1.0 + peak as f64).ln();
    let bar_w = (p.w / counts.len() as u32).max(1);
    for (i, &n) in counts.iter().enumerate() {
        if n == 0 {
            continue;
        }
        let h = ((1.0 + n as f64).ln() / norm * p.h as f64).round() as u32;
        let x = p.x + (i as u32 * p.w / counts.len() as u32) as i64;
        canvas.fill_rect(x, p.y + (p.h - h) as i64, bar_w, h, color);
    }
}

/// Up to `max` (reference, candidate) pairs with both values positive,
/// drawn without replacement by a seeded RNG.
pub fn scatter_sample(a: &Matrix, b: &Matrix, max: usize, seed: u64) -> Vec<(f64, f64)> {
    let positive: Vec<(f64, f64)> = b
        .values()
        .iter()
        .zip(a.values())
        .filter(|&(&r, &c)| r > 0.0 && c > 0.0)
        .map(|(&r, &c)| (r, c))
        .collect();
    if positive.len() <= max {
        return positive;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, positive.len(), max)
        .into_iter()
        .map(|i| positive[i])
        .collect()
}

fn draw_scatter(canvas: &mut Raster, p: Panel, a: &Matrix, b: &Matrix) {
    let pairs = scatter_sample(a, b, MAX_SCATTER_POINTS, SCATTER_SEED);
    if pairs.is_empty() {
        return;
    }
    let logs: Vec<(f64, f64)> = pairs.iter().map(|&(r, c)| (r.log10(), c.log10())).collect();
    let lo = logs.iter().map(|&(r, c)| r.min(c)).fold(f64::INFINITY, f64::min);
    let hi = logs.iter().map(|&(r, c)| r.max(c)).fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };

    let (x0, y0) = p.point(0.0, 0.0);
    let (x1, y1) = p.point(1.0, 1.0);
    canvas.draw_line(x0, y0, x1, y1, IDENTITY_COLOR);

    for (r, c) in logs {
        let (x, y) = p.point((r - lo) / span, (c - lo) / span);
        canvas.put_pixel(x, y, REFERENCE_COLOR);
    }
}
