//! Carrier image decoding and stego image encoding.
//!
//! Only lossless formats keep LSB data intact. Carriers may be read from PNG,
//! BMP or JPEG, but output is always written as PNG; re-encoding a stego image
//! as JPEG destroys the payload.

use crate::error::StegoError;
use crate::stego::PixelBuffer;
use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decodes an image file into an RGBA pixel buffer.
pub fn load_carrier(path: &Path) -> Result<PixelBuffer> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("unrecognised image type: {}", path.display()))?;

    match format {
        ImageFormat::Png | ImageFormat::Bmp => {}
        ImageFormat::Jpeg => {
            warn!(path = %path.display(), "carrier is JPEG - output will be PNG to preserve hidden data");
        }
        other => {
            return Err(StegoError::image(format!(
                "unsupported image type {:?}, use PNG, BMP or JPEG",
                other
            ))
            .into());
        }
    }

    let rgba = image::open(path)
        .with_context(|| format!("decoding {}", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path.display(), width, height, "carrier loaded");

    Ok(PixelBuffer::new(width, height, rgba.into_raw())?)
}

/// Writes `pixels` to `path` as PNG.
pub fn save_png(pixels: &PixelBuffer, path: &Path) -> Result<()> {
    let img = RgbaImage::from_raw(pixels.width(), pixels.height(), pixels.as_bytes().to_vec())
        .ok_or_else(|| StegoError::image("pixel buffer does not match its dimensions"))?;
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("writing PNG to {}", path.display()))?;
    debug!(path = %path.display(), "stego image written");
    Ok(())
}

/// `photos/cat.jpg` becomes `photos/cat_stego.png`.
pub fn stego_output_name(carrier: &Path) -> PathBuf {
    let stem = carrier
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    carrier.with_file_name(format!("{}_stego.png", stem))
}
