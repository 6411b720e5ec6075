//! Framebuffer and cache-image export.
//!
//! Colors are linear RGB in [0, 1]; export clamps and scales to 8-bit,
//! matching the plain linear dump the cache images are compared against.

use std::path::Path;

use log::info;
use lux_core::Object;
use lux_math::Vec3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("image dimensions do not match pixel data")]
    Dimensions,
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Row-major grid of linear RGB pixels.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl Framebuffer {
    /// Create a framebuffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vec3) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Replace row `y` with `row` (must be `width` pixels).
    pub fn set_row(&mut self, y: u32, row: &[Vec3]) {
        let start = (y * self.width) as usize;
        self.pixels[start..start + self.width as usize].copy_from_slice(row);
    }

    /// Clamp to [0, 1] and pack as interleaved RGB bytes.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgb8(*color));
        }
        bytes
    }

    /// Save as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let img: image::RgbImage =
            image::ImageBuffer::from_raw(self.width, self.height, self.to_rgb8())
                .ok_or(ExportError::Dimensions)?;
        img.save(path)?;
        info!("saved {}", path.display());
        Ok(())
    }
}

/// Convert a linear color to 8-bit RGB with a plain clamp.
pub fn color_to_rgb8(color: Vec3) -> [u8; 3] {
    [
        (255.0 * color.x.clamp(0.0, 1.0)) as u8,
        (255.0 * color.y.clamp(0.0, 1.0)) as u8,
        (255.0 * color.z.clamp(0.0, 1.0)) as u8,
    ]
}

/// Image of an object's irradiance cache: one pixel per surface cell,
/// `h_res` wide by `v_res` tall, row-major.
pub fn irradiance_image(object: &Object) -> Framebuffer {
    let (v_res, h_res) = (object.surfaces.v_res(), object.surfaces.h_res());
    let mut fb = Framebuffer::new(h_res, v_res);
    for v in 0..v_res {
        for h in 0..h_res {
            fb.set(h, v, object.surfaces.cell(v, h).diffuse_amt);
        }
    }
    fb
}

/// Image of one cell's exit-radiance cache (cell (0, 0), as a
/// representative sample): one pixel per hemisphere bucket. `None` when
/// the object carries no angular grids.
pub fn angle_image(object: &Object) -> Option<Framebuffer> {
    let grid = object.surfaces.cell(0, 0).angles()?;
    let mut fb = Framebuffer::new(grid.h_res(), grid.v_res());
    for v in 0..grid.v_res() {
        for h in 0..grid.h_res() {
            fb.set(h, v, grid.at(v, h).color);
        }
    }
    Some(fb)
}
