//! Row-strip parallel execution with halo overlap
//!
//! The valid center rows `[pad, height - pad)` are split into `cores`
//! contiguous strips. Each worker accumulates its strip plus `pad` rows of
//! halo on both sides into private grids; once every worker has joined, the
//! strips are added into the full-size grids one after another.

use crate::algorithm::accumulator::{Accumulation, accumulate};
use crate::algorithm::window::WindowEvaluator;
use crate::io::error::{MusicalError, Result, computation_error, invalid_parameter};
use crate::io::progress::ProgressSink;
use log::debug;
use ndarray::{ArrayView3, s};
use rayon::prelude::*;

/// `cores + 1` row breakpoints evenly spanning `[pad, height - pad]`
///
/// Strip `k` owns the window centers in rows `[b[k], b[k + 1])`.
pub fn strip_breakpoints(height: usize, pad: usize, cores: usize) -> Vec<usize> {
    let valid = height.saturating_sub(2 * pad);
    let cores = cores.max(1);
    (0..=cores).map(|k| pad + k * valid / cores).collect()
}

// Strip-local window rows back to image rows
fn shift_window(mut error: MusicalError, rows: usize) -> MusicalError {
    if let MusicalError::NumericalFailure {
        window: Some((row, _)),
        ..
    }
    | MusicalError::DegenerateRank {
        window: Some((row, _)),
        ..
    } = &mut error
    {
        *row += rows;
    }
    error
}

/// Accumulate `image` with `cores` concurrent row strips
///
/// Produces the same grids as [`accumulate`] over the whole image, up to
/// floating point summation order in rows shared by neighboring strips.
///
/// # Errors
///
/// Returns an error if:
/// - `cores` is zero or the worker pool cannot be created
/// - Any strip fails; the error names the first failing strip from the top
pub fn accumulate_tiled<P>(
    image: ArrayView3<'_, f64>,
    evaluator: &WindowEvaluator<'_>,
    cores: usize,
    progress: &P,
) -> Result<Accumulation>
where
    P: ProgressSink + ?Sized,
{
    if cores == 0 {
        return Err(invalid_parameter("cores", &cores, &"must be at least 1"));
    }

    let geometry = evaluator.geometry();
    let pad = geometry.pad();
    let (height, width, _) = image.dim();
    if height < 2 * pad {
        // Not even a halo fits, so there is nothing to split
        return accumulate(image, evaluator, progress);
    }

    let breakpoints = strip_breakpoints(height, pad, cores);
    let strips: Vec<(usize, usize)> = breakpoints
        .windows(2)
        .filter_map(|bounds| match *bounds {
            [start, end] => Some((start, end)),
            _ => None,
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cores)
        .build()
        .map_err(|e| computation_error("worker pool", &e))?;

    let partials: Vec<Result<Accumulation>> = pool.install(|| {
        strips
            .par_iter()
            .map(|&(start, end)| {
                debug!("strip rows [{start}, {end}) with halo [{}, {})", start - pad, end + pad);
                let strip = image.slice(s![start - pad..end + pad, .., ..]);
                accumulate(strip, evaluator, progress)
            })
            .collect()
    });

    let mut merged = Accumulation::empty(height, width, pad, geometry.subpixels());
    for (strip, (partial, &(start, _))) in partials.into_iter().zip(&strips).enumerate() {
        let partial = partial.map_err(|source| MusicalError::StripFailed {
            strip,
            source: Box::new(shift_window(source, start - pad)),
        })?;
        merged.merge_strip(&partial, start - pad);
    }

    Ok(merged)
}
