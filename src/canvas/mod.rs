pub mod colors;
pub mod diagnostics;
pub mod raster;
pub mod spectrogram_renderer;

pub use colors::Colormap;
pub use diagnostics::render_comparison;
pub use raster::Raster;
pub use spectrogram_renderer::render_heatmap;
