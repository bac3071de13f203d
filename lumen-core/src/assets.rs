//! Image thumbnail preparation.
//!
//! Every image in the source directory gets a width-300 thumbnail written
//! alongside it, named `<stem>_sum.<ext>`. Sources that already have one are
//! skipped, so the pass is idempotent and cheap on a warm tree.

use image::imageops::FilterType;
use image::GenericImageView;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Width of generated thumbnails, in pixels.
const THUMBNAIL_WIDTH: u32 = 300;

/// Stem suffix marking a generated thumbnail.
const THUMBNAIL_SUFFIX: &str = "_sum";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "gif"];

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to scan for images: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("failed to convert {path:?}: {source}")]
    Convert {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to write thumbnail {path:?}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Thumbnail location for an image source: `photo.jpg` to `photo_sum.jpg`,
/// in the same directory.
pub fn thumbnail_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = source
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{THUMBNAIL_SUFFIX}.{ext}"))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
}

fn is_thumbnail(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(THUMBNAIL_SUFFIX))
}

/// Create missing thumbnails for every image directly inside `dir`.
/// Conversions run in parallel; the first failure aborts the pass.
/// Returns the sources that were converted.
pub fn prepare_thumbnails(dir: &Path) -> Result<Vec<PathBuf>, AssetError> {
    let mut pending = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_image(path) || is_thumbnail(path) || thumbnail_path(path).exists() {
            continue;
        }
        pending.push(path.to_path_buf());
    }

    pending.par_iter().try_for_each(|path| convert(path))?;

    if !pending.is_empty() {
        tracing::info!("converted {} thumbnails", pending.len());
    }

    Ok(pending)
}

fn convert(source: &Path) -> Result<(), AssetError> {
    let img = image::open(source).map_err(|err| AssetError::Convert {
        path: source.to_path_buf(),
        source: err,
    })?;

    let (width, height) = img.dimensions();
    let (thumb_w, thumb_h) = thumbnail_dimensions(width, height);
    let thumb = img.resize_exact(thumb_w, thumb_h, FilterType::Lanczos3);

    let target = thumbnail_path(source);
    thumb.save(&target).map_err(|err| AssetError::Save {
        path: target.clone(),
        source: err,
    })?;

    tracing::debug!("thumbnail {target:?}");
    Ok(())
}

/// Proportional dimensions for a width-300 thumbnail.
fn thumbnail_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (THUMBNAIL_WIDTH, THUMBNAIL_WIDTH);
    }
    let scaled = u64::from(height) * u64::from(THUMBNAIL_WIDTH) / u64::from(width);
    (THUMBNAIL_WIDTH, (scaled as u32).max(1))
}
