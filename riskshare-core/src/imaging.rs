//! Image normalization for inline embedding
//!
//! Every row image is decoded, scaled to fit a bounding box and re-encoded as
//! a JPEG `data:` URI so the report stays self-contained and small.
//!
//! Global invariants enforced:
//! - Output slot i always belongs to input slot i
//! - One image failing never fails the batch

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Where a row's image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Already-inline `data:` URI
    Inline(String),
    /// Local file
    File(PathBuf),
    /// http(s) URL; passed through, never fetched
    Remote(String),
}

impl ImageRef {
    /// Classify a raw reference. Relative file paths resolve against `base_dir`.
    pub fn from_reference(reference: &str, base_dir: Option<&Path>) -> Option<ImageRef> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if reference.starts_with("data:") {
            return Some(ImageRef::Inline(reference.to_string()));
        }
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(ImageRef::Remote(reference.to_string()));
        }
        let path = Path::new(reference);
        let resolved = match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        Some(ImageRef::File(resolved))
    }

    /// Reference usable as-is when normalization fails
    fn fallback(&self) -> Option<String> {
        match self {
            ImageRef::Inline(uri) => Some(uri.clone()),
            ImageRef::Remote(url) => Some(url.clone()),
            ImageRef::File(_) => None,
        }
    }
}

/// Bounding box and encoder quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            max_dimension: 800,
            jpeg_quality: 60,
        }
    }
}

/// Scale (width, height) so neither side exceeds `max`, preserving aspect ratio.
///
/// Images already inside the box are returned unchanged. The longer side
/// becomes exactly `max`; the shorter side is truncated, never below 1.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    if width > height {
        let scaled = (height as f64 / width as f64 * max as f64) as u32;
        (max, scaled.max(1))
    } else {
        let scaled = (width as f64 / height as f64 * max as f64) as u32;
        (scaled.max(1), max)
    }
}

/// Normalize a single image into a JPEG data URI
pub fn normalize_image(reference: &ImageRef, options: &ImageOptions) -> Result<String> {
    let bytes = load_bytes(reference)?;
    let decoded = image::load_from_memory(&bytes).context("failed to decode image")?;

    let (width, height) = fit_within(decoded.width(), decoded.height(), options.max_dimension);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, options.jpeg_quality)
        .encode_image(&rgb)
        .context("failed to encode JPEG")?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        BASE64_STANDARD.encode(&encoded)
    ))
}

/// Normalize every slot concurrently and join.
///
/// A failed slot falls back to its original reference when that is directly
/// embeddable, otherwise to `None`.
pub fn normalize_all(references: &[Option<ImageRef>], options: &ImageOptions) -> Vec<Option<String>> {
    let pending = references.iter().filter(|r| r.is_some()).count();
    tracing::debug!(images = pending, "normalizing row images");

    references
        .par_iter()
        .enumerate()
        .map(|(idx, reference)| {
            let reference = reference.as_ref()?;
            if let ImageRef::Remote(url) = reference {
                tracing::debug!(row = idx + 1, %url, "remote image passed through");
                return Some(url.clone());
            }
            match normalize_image(reference, options) {
                Ok(uri) => Some(uri),
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::warn!(row = idx + 1, %error, "failed to normalize image");
                    reference.fallback()
                }
            }
        })
        .collect()
}

fn load_bytes(reference: &ImageRef) -> Result<Vec<u8>> {
    match reference {
        ImageRef::Inline(uri) => decode_data_uri(uri),
        ImageRef::File(path) => std::fs::read(path)
            .with_context(|| format!("failed to read image: {}", path.display())),
        ImageRef::Remote(url) => anyhow::bail!("remote images are not fetched: {}", url),
    }
}

/// Decode the payload of a base64 `data:` URI
fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow::anyhow!("not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("malformed data URI: missing ','"))?;
    if !meta.ends_with(";base64") {
        anyhow::bail!("unsupported data URI encoding: {}", meta);
    }
    BASE64_STANDARD
        .decode(payload.trim())
        .context("invalid base64 in data URI")
}
