use crate::canvas::colors::{db_level, power_to_db, Colormap};
use crate::canvas::raster::Raster;
use crate::types::Matrix;

/// Render a power spectrogram to one pixel per (frame, bin).
/// Width = number of frames, height = number of frequency bins.
/// Frequency axis: row 0 = highest bin (top), last row = bin 0 (bottom).
pub fn render_heatmap(power: &Matrix, colormap: Colormap) -> Raster {
    let (rows, cols) = power.shape();
    let mut raster = Raster::new(cols as u32, rows as u32, colormap.rgb(0.0));
    let Some((_, max_power)) = power.min_max() else {
        return raster;
    };
    let max_db = power_to_db(max_power);

    for bin in 0..rows {
        // Flip vertically: bin 0 = lowest freq → bottom row
        let y = (rows - 1 - bin) as i64;
        for (t, &p) in power.row(bin).iter().enumerate() {
            raster.put_pixel(t as i64, y, colormap.rgb(db_level(p, max_db)));
        }
    }
    raster
}

/// Signed dB difference `db(a) - db(b)` on a diverging map, symmetric about 0 dB.
///
/// Both matrices must have the same shape. Returns the raster and the dB
/// half-range that maps to the extreme colors.
pub fn render_db_difference(a: &Matrix, b: &Matrix) -> (Raster, f64) {
    let rows = a.rows().min(b.rows());
    let cols = a.cols().min(b.cols());
    let mut raster = Raster::new(cols as u32, rows as u32, Colormap::Diverging.rgb(0.5));
    let diff = |r: usize, c: usize| power_to_db(a.get(r, c)) - power_to_db(b.get(r, c));

    let mut span = 0.0f64;
    for r in 0..rows {
        for c in 0..cols {
            span = span.max(diff(r, c).abs());
        }
    }
    if span == 0.0 {
        return (raster, 0.0);
    }

    for r in 0..rows {
        let y = (rows - 1 - r) as i64;
        for c in 0..cols {
            let level = 0.5 + 0.5 * diff(r, c) / span;
            raster.put_pixel(c as i64, y, Colormap::Diverging.rgb(level));
        }
    }
    (raster, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_bins_at_bottom() {
        let mut power = Matrix::zeros(3, 2);
        power.set(0, 0, 1.0);
        let raster = render_heatmap(&power, Colormap::Grey);
        assert_eq!((raster.width(), raster.height()), (2, 3));
        assert_eq!(raster.pixel(0, 2), Some([255, 255, 255, 255]));
        assert_eq!(raster.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_empty_heatmap() {
        let raster = render_heatmap(&Matrix::zeros(257, 0), Colormap::Viridis);
        assert_eq!(raster.width(), 0);
    }

    #[test]
    fn test_identical_difference_is_neutral() {
        let mut m = Matrix::zeros(2, 2);
        m.set(1, 1, 3.0);
        let (raster, span) = render_db_difference(&m, &m);
        assert_eq!(span, 0.0);
        assert_eq!(raster.pixel(1, 0), Some([247, 247, 247, 255]));
    }

    #[test]
    fn test_louder_candidate_is_red() {
        let a = Matrix::from_rows(&[vec![10.0, 1.0]]).unwrap();
        let b = Matrix::from_rows(&[vec![1.0, 1.0]]).unwrap();
        let (raster, span) = render_db_difference(&a, &b);
        assert!((span - 10.0).abs() < 1e-6);
        assert_eq!(raster.pixel(0, 0), Some([180, 4, 38, 255]));
    }
}
