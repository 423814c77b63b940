//! Letterbox preprocessing for square model inputs

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::domain::BoundingBox;

const PAD_VALUE: u8 = 114;

/// Geometry of a letterboxed image, used to map boxes back
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Compute scale and padding for fitting `width x height` into `size x size`
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, scale, size);

        Self {
            scale,
            pad_x: ((size - new_w) / 2) as f32,
            pad_y: ((size - new_h) / 2) as f32,
            source_width: width,
            source_height: height,
        }
    }

    /// Map a box from model input space to source image pixels
    pub fn to_source(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (bbox.x_min - self.pad_x) / self.scale,
            (bbox.y_min - self.pad_y) / self.scale,
            (bbox.x_max - self.pad_x) / self.scale,
            (bbox.y_max - self.pad_y) / self.scale,
        )
        .clamp(self.source_width as f32, self.source_height as f32)
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32, size: u32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    (new_w, new_h)
}

/// Resize preserving aspect ratio, pad to a square and lay out as
/// normalized NCHW `f32` planes (R, G, B)
pub fn letterbox(image: &RgbImage, size: u32) -> (Vec<f32>, Letterbox) {
    let geometry = Letterbox::fit(image.width(), image.height(), size);
    let (new_w, new_h) = scaled_dims(image.width(), image.height(), geometry.scale, size);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::replace(
        &mut canvas,
        &resized,
        geometry.pad_x as i64,
        geometry.pad_y as i64,
    );

    let plane = (size * size) as usize;
    let mut tensor = vec![0.0f32; plane * 3];

    for (x, y, pixel) in canvas.enumerate_pixels() {
        let idx = (y * size + x) as usize;
        tensor[idx] = pixel[0] as f32 / 255.0;
        tensor[plane + idx] = pixel[1] as f32 / 255.0;
        tensor[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }

    (tensor, geometry)
}
