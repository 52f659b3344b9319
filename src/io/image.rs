//! Frame stack loading and 16-bit greyscale export

use crate::io::configuration::{FRAME_EXTENSIONS, OUTPUT_WHITE_LEVEL};
use crate::io::error::{MusicalError, Result, shape_mismatch};
use image::{ImageBuffer, Luma};
use ndarray::{Array3, ArrayView2, Axis};
use std::path::{Path, PathBuf};

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Frame files of `directory`, sorted by name
///
/// # Errors
///
/// Returns an error if the directory cannot be read
pub fn collect_frames(directory: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(directory).map_err(|e| MusicalError::FileSystem {
        path: directory.to_path_buf(),
        operation: "read directory",
        source: e,
    })?;

    let mut frames = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_frame_file(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Load every frame of `directory` into a `[height, width, frames]` stack
///
/// Frames are converted to single-channel floating point intensities in
/// file name order.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be read or holds no frame files
/// - A frame cannot be decoded
/// - Frames differ in size
pub fn load_frame_stack(directory: &Path) -> Result<Array3<f64>> {
    let paths = collect_frames(directory)?;
    if paths.is_empty() {
        return Err(MusicalError::InvalidSourceData {
            reason: format!("no frame files found in '{}'", directory.display()),
        });
    }

    let mut stack: Option<Array3<f64>> = None;
    for (frame, path) in paths.iter().enumerate() {
        let img = image::open(path).map_err(|e| MusicalError::ImageLoad {
            path: path.clone(),
            source: e,
        })?;
        let luma = img.to_luma32f();
        let (width, height) = (luma.width() as usize, luma.height() as usize);

        let data = stack.get_or_insert_with(|| Array3::zeros((height, width, paths.len())));
        let (expected_height, expected_width, _) = data.dim();
        if (height, width) != (expected_height, expected_width) {
            return Err(shape_mismatch(
                "frame size",
                &(expected_height, expected_width),
                &(height, width),
            ));
        }

        let mut plane = data.index_axis_mut(Axis(2), frame);
        for (x, y, pixel) in luma.enumerate_pixels() {
            let Luma([intensity]) = *pixel;
            if let Some(value) = plane.get_mut((y as usize, x as usize)) {
                *value = f64::from(intensity);
            }
        }
    }

    stack.ok_or_else(|| MusicalError::InvalidSourceData {
        reason: "frame stack is empty".to_string(),
    })
}

/// Export `values` as a 16-bit greyscale PNG
///
/// Finite values are stretched to the full range; NaN and infinite cells are
/// written as black.
///
/// # Errors
///
/// Returns an error if:
/// - No cell holds a finite value
/// - The parent directory cannot be created
/// - The image cannot be saved to the specified path
pub fn export_image(values: ArrayView2<'_, f64>, output_path: &Path) -> Result<()> {
    let (low, high) = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |range: Option<(f64, f64)>, value| {
            Some(range.map_or((value, value), |(lo, hi)| (lo.min(value), hi.max(value))))
        })
        .ok_or_else(|| MusicalError::InvalidSourceData {
            reason: "image has no finite values to export".to_string(),
        })?;
    let span = high - low;

    let (rows, cols) = values.dim();
    let mut img = ImageBuffer::<Luma<u16>, Vec<u16>>::new(cols as u32, rows as u32);
    for ((row, col), &value) in values.indexed_iter() {
        let level = if !value.is_finite() {
            0.0
        } else if span > 0.0 {
            (value - low) / span * OUTPUT_WHITE_LEVEL
        } else {
            OUTPUT_WHITE_LEVEL
        };
        img.put_pixel(col as u32, row as u32, Luma([level.round() as u16]));
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MusicalError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    img.save(output_path)
        .map_err(|e| MusicalError::ImageExport {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
