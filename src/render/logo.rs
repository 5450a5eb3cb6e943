//! Logo decoding into a raw RGB image for embedding.

use image::GenericImageView;

use crate::error::RenderError;

/// A decoded logo, flattened onto white, as 8-bit RGB samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogoImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl LogoImage {
    /// Decodes PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, RenderError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| RenderError::LogoDecode {
            message: e.to_string(),
        })?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::LogoDecode {
                message: "image has no pixels".to_string(),
            });
        }

        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = u32::from(a);
            for channel in [r, g, b] {
                let blended = (u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
                rgb.push(blended as u8);
            }
        }

        Ok(Self { width, height, rgb })
    }

    /// Size that fits within `max_width` x `max_height` keeping the aspect ratio.
    pub fn fit(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let scale = (max_width / self.width as f32).min(max_height / self.height as f32);
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}
