// Heatmap rendering: channel mean, min-max normalization, blue-to-red colormap.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use serde::Deserialize;

use crate::error::PrepError;

/// Raw network activations, channel-major (`channels x height x width`).
#[derive(Debug, Clone, Deserialize)]
pub struct Heatmap {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<f32>,
}

impl Heatmap {
    /// Returns the number of pixels per channel.
    fn validate(&self) -> crate::error::Result<usize> {
        let plane = (self.width as usize).checked_mul(self.height as usize);
        let Some((plane, expected)) =
            plane.and_then(|p| p.checked_mul(self.channels as usize).map(|e| (p, e)))
        else {
            return Err(PrepError::input(format!(
                "heatmap size {}x{}x{} is too large",
                self.channels, self.height, self.width
            )));
        };
        if self.channels == 0 || plane == 0 || self.data.len() != expected {
            return Err(PrepError::input(format!(
                "heatmap data has {} values, expected {}x{}x{} = {expected}",
                self.data.len(),
                self.channels,
                self.height,
                self.width
            )));
        }
        Ok(plane)
    }

    /// Mean over channels, one value per pixel.
    fn channel_mean(&self, plane: usize) -> Vec<f32> {
        let mut mean = vec![0.0f32; plane];
        for chunk in self.data.chunks_exact(plane) {
            for (m, v) in mean.iter_mut().zip(chunk) {
                *m += *v;
            }
        }
        let n = self.channels as f32;
        mean.iter_mut().for_each(|m| *m /= n);
        mean
    }
}

/// Render the heatmap into an RGB image where low activation is blue and high is red.
pub fn render(heatmap: &Heatmap) -> crate::error::Result<RgbImage> {
    let plane = heatmap.validate()?;
    let mean = heatmap.channel_mean(plane);

    let (min, max) = mean
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let mut img = RgbImage::new(heatmap.width, heatmap.height);
    for (pixel, &v) in img.pixels_mut().zip(&mean) {
        let level = if range > 0.0 && v.is_finite() {
            ((v - min) / range * 255.0) as u8
        } else {
            0
        };
        *pixel = Rgb([level, 0, 255 - level]);
    }
    Ok(img)
}

/// Render and encode the heatmap for `path`. The encoding follows the file
/// extension and falls back to PNG.
pub fn encode_heatmap(heatmap: &Heatmap, path: &Path) -> crate::error::Result<Vec<u8>> {
    let img = render(heatmap)?;
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).map_err(|e| {
        PrepError::output(format!(
            "failed to encode heatmap {}: {e}",
            path.display()
        ))
    })?;
    Ok(buf.into_inner())
}
