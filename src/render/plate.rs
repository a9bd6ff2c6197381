//! Decoded stereo plate and CPU-side sampling.

use std::path::Path;

use image::{RgbaImage, imageops};
use tracing::debug;

use crate::error::{Error, Result};

/// A decoded plate: left and right halves side by side, split at the midline.
#[derive(Debug, Clone)]
pub struct Plate {
    image: RgbaImage,
}

impl Plate {
    pub fn from_rgba(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyPlate { width, height });
        }
        Ok(Self { image })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Self::from_rgba(img.to_rgba8())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let img = image::ImageReader::open(path.as_ref())?
            .with_guessed_format()?
            .decode()?;
        Self::from_rgba(img.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn half_width(&self) -> u32 {
        self.width() / 2
    }

    /// Aspect of one half; this is the aspect of the stereo output frame.
    pub fn content_aspect(&self) -> f64 {
        f64::from(self.half_width()) / f64::from(self.height())
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// Shrink so neither side exceeds `max_dim`, keeping the aspect.
    pub fn fit_within(self, max_dim: u32) -> Self {
        let (w, h) = self.image.dimensions();
        let max_dim = max_dim.max(1);
        if w <= max_dim && h <= max_dim {
            return self;
        }
        let scale = f64::from(max_dim) / f64::from(w.max(h));
        let nw = ((f64::from(w) * scale).round() as u32).clamp(1, max_dim);
        let nh = ((f64::from(h) * scale).round() as u32).clamp(1, max_dim);
        debug!(from_w = w, from_h = h, to_w = nw, to_h = nh, "downscaling plate");
        let image = imageops::resize(&self.image, nw, nh, imageops::FilterType::Triangle);
        Self { image }
    }
}

/// Texture lookup in plate UV space (`v` up), edge-clamped, linear RGB out.
pub trait PlateSampler {
    fn sample(&self, plate_uv: [f32; 2]) -> [f32; 3];
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

impl PlateSampler for Plate {
    fn sample(&self, plate_uv: [f32; 2]) -> [f32; 3] {
        let (w, h) = self.image.dimensions();
        let u = plate_uv[0].clamp(0.0, 1.0);
        let t = 1.0 - plate_uv[1].clamp(0.0, 1.0);
        let x = ((u * w as f32) as u32).min(w - 1);
        let y = ((t * h as f32) as u32).min(h - 1);
        let px = self.image.get_pixel(x, y).0;
        [
            srgb_to_linear(f32::from(px[0]) / 255.0),
            srgb_to_linear(f32::from(px[1]) / 255.0),
            srgb_to_linear(f32::from(px[2]) / 255.0),
        ]
    }
}
