/// Floor added before taking logs so zero power maps to -100 dB instead of -inf.
pub const DB_FLOOR: f64 = 1e-10;

/// Dynamic range shown by heatmaps, in dB below the maximum.
pub const DYNAMIC_RANGE_DB: f64 = 80.0;

/// Power to decibels: `10 log10(p + 1e-10)`.
pub fn power_to_db(power: f64) -> f64 {
    10.0 * (power + DB_FLOOR).log10()
}

/// Map a power value to `[0, 1]` over an 80 dB window ending at `max_db`.
pub fn db_level(power: f64, max_db: f64) -> f64 {
    let db = power_to_db(power).clamp(max_db - DYNAMIC_RANGE_DB, max_db);
    (db - (max_db - DYNAMIC_RANGE_DB)) / DYNAMIC_RANGE_DB
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Colormap {
    /// Perceptually uniform; used for spectrogram heatmaps.
    #[default]
    Viridis,
    /// Blue below the midpoint, white at it, red above. Used for signed differences.
    Diverging,
    Grey,
}

const VIRIDIS: [[u8; 3]; 9] = [
    [68, 1, 84],
    [71, 44, 122],
    [59, 81, 139],
    [44, 113, 142],
    [33, 144, 141],
    [39, 173, 129],
    [92, 200, 99],
    [170, 220, 50],
    [253, 231, 37],
];

const DIVERGING: [[u8; 3]; 3] = [[59, 76, 192], [247, 247, 247], [180, 4, 38]];

impl Colormap {
    /// RGB for a level in `[0, 1]` (clamped; NaN maps to 0).
    pub fn rgb(self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Viridis => interpolate(&VIRIDIS, t),
            Colormap::Diverging => interpolate(&DIVERGING, t),
            Colormap::Grey => {
                let g = (t * 255.0).round() as u8;
                [g, g, g]
            }
        }
    }
}

/// Piecewise-linear interpolation between evenly spaced color stops.
fn interpolate(stops: &[[u8; 3]], t: f64) -> [u8; 3] {
    let segments = (stops.len() - 1) as f64;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(stops.len() - 2);
    let frac = pos - i as f64;
    let (a, b) = (stops[i], stops[i + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}
