use crate::error::{ParityError, Result};
use png::{BitDepth, ColorType, Encoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// An RGBA pixel buffer. Row 0 is the top of the image.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, background: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&[background[0], background[1], background[2], 255]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Set one pixel; coordinates outside the raster are clipped.
    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 3].copy_from_slice(&rgb);
        self.pixels[i + 3] = 255;
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, rgb: [u8; 3]) {
        for yy in y..y + h as i64 {
            for xx in x..x + w as i64 {
                self.put_pixel(xx, yy, rgb);
            }
        }
    }

    /// One-pixel outline.
    pub fn stroke_rect(&mut self, x: i64, y: i64, w: u32, h: u32, rgb: [u8; 3]) {
        if w == 0 || h == 0 {
            return;
        }
        let (x1, y1) = (x + w as i64 - 1, y + h as i64 - 1);
        self.draw_line(x, y, x1, y, rgb);
        self.draw_line(x, y1, x1, y1, rgb);
        self.draw_line(x, y, x, y1, rgb);
        self.draw_line(x1, y, x1, y1, rgb);
    }

    /// Bresenham line, both endpoints inclusive.
    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, rgb: [u8; 3]) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.put_pixel(x, y, rgb);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Nearest-neighbour copy of `src` scaled into the `w x h` box at `(x, y)`.
    pub fn blit_scaled(&mut self, src: &Raster, x: i64, y: i64, w: u32, h: u32) {
        if src.width == 0 || src.height == 0 {
            return;
        }
        for dy in 0..h {
            let sy = (dy as u64 * src.height as u64 / h as u64) as u32;
            for dx in 0..w {
                let sx = (dx as u64 * src.width as u64 / w as u64) as u32;
                if let Some(p) = src.pixel(sx, sy) {
                    self.put_pixel(x + dx as i64, y + dy as i64, [p[0], p[1], p[2]]);
                }
            }
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn write_png(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ParityError::io(path, e))?;
        let mut out = BufWriter::new(file);
        self.encode_into(&mut out)?;
        out.flush().map_err(|e| ParityError::io(path, e))?;
        log::debug!("wrote {}x{} PNG to {}", self.width, self.height, path.display());
        Ok(())
    }

    fn encode_into<W: Write>(&self, w: W) -> Result<()> {
        // PNG cannot represent an empty image.
        if self.width == 0 || self.height == 0 {
            return Raster::new(1, 1, [0, 0, 0]).encode_into(w);
        }
        let mut encoder = Encoder::new(w, self.width, self.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        writer.finish()?;
        Ok(())
    }
}
