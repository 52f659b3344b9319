//! Tests for window masking and the per-window failure policies

#[cfg(test)]
mod tests {
    use musical::MusicalError;
    use musical::algorithm::window::{
        SkipReason, WindowEvaluator, WindowPolicy, WindowScratch, WindowStatus,
    };
    use musical::math::layout::flat_index;
    use musical::spatial::WhitenedGeometry;
    use ndarray::{Array3, array};

    fn geometry(subpixels: usize) -> WhitenedGeometry {
        let (mask, gmatrix) = crate::gaussian_setup(3, subpixels, 1.0);
        match WhitenedGeometry::new(mask.view(), gmatrix.view(), subpixels) {
            Ok(geometry) => geometry,
            Err(error) => unreachable!("consistent setup: {error}"),
        }
    }

    // Tests that the patch holds masked samples at column-major flat indices
    // Verified by flattening the window row-major
    #[test]
    fn test_patch_is_masked_column_major() {
        let geometry = geometry(2);
        let roi = crate::random_stack(3, 3, 8, 11);
        let evaluator = WindowEvaluator::new(&geometry, 10.0, 4.0);
        let mut scratch = WindowScratch::new(&geometry, 8);

        let status = evaluator.evaluate(roi.view(), &mut scratch);
        assert!(matches!(status, Ok(WindowStatus::Evaluated { rank: 5 })));

        let mask = geometry.mask_flat();
        let patch = scratch.patch();
        assert_eq!(patch.dim(), (9, 8));
        for ((row, col, frame), &sample) in roi.indexed_iter() {
            let index = flat_index(row, col, 3);
            assert!((patch[[index, frame]] - sample * mask[index]).abs() < f64::EPSILON);
        }
        assert_eq!(scratch.tile().dim(), (6, 6));
    }

    // Tests that an asymmetric mask weights flat window element i by mask cell (i / side, i % side)
    // Verified by weighting the patch with the column-major mask
    #[test]
    fn test_asymmetric_mask_is_read_row_major() {
        let mask = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let (_, gmatrix) = crate::gaussian_setup(3, 1, 1.0);
        let Ok(geometry) = WhitenedGeometry::new(mask.view(), gmatrix.view(), 1) else {
            unreachable!("consistent shapes");
        };
        let roi = Array3::<f64>::ones((3, 3, 4));
        let evaluator = WindowEvaluator::new(&geometry, -0.5, 4.0);
        let mut scratch = WindowScratch::new(&geometry, 4);

        assert!(evaluator.evaluate(roi.view(), &mut scratch).is_ok());

        let patch = scratch.patch();
        for frame in 0..4 {
            let column: Vec<f64> = patch.column(frame).to_vec();
            assert_eq!(column, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        }
    }

    // Tests that a zero contrast exponent turns every cell into one
    // Verified by leaving the tile untouched on evaluation
    #[test]
    fn test_zero_alpha_tile_is_ones() {
        let geometry = geometry(2);
        let roi = crate::random_stack(3, 3, 8, 12);
        let evaluator = WindowEvaluator::new(&geometry, 10.0, 0.0);
        let mut scratch = WindowScratch::new(&geometry, 8);

        assert!(evaluator.evaluate(roi.view(), &mut scratch).is_ok());
        assert!(scratch.tile().iter().all(|&v| (v - 1.0).abs() < f64::EPSILON));
    }

    // Tests the degenerate rank policy with three frames and every value above threshold
    // Verified by swapping the Skip and Abort branches
    #[test]
    fn test_degenerate_rank_policy() {
        let geometry = geometry(1);
        let roi = crate::random_stack(3, 3, 3, 13);
        let mut scratch = WindowScratch::new(&geometry, 3);

        let skipping = WindowEvaluator::new(&geometry, -10.0, 4.0);
        assert_eq!(
            skipping.evaluate(roi.view(), &mut scratch).ok(),
            Some(WindowStatus::Skipped(SkipReason::DegenerateRank(0)))
        );

        let aborting = skipping.with_policies(WindowPolicy::Abort, WindowPolicy::Skip);
        assert!(matches!(
            aborting.evaluate(roi.view(), &mut scratch),
            Err(MusicalError::DegenerateRank {
                window: None,
                rank: 0,
                singular_values: 3
            })
        ));
    }

    // Tests the numerical failure policy on a window holding NaN
    // Verified by applying the degenerate policy to numerical failures
    #[test]
    fn test_numerical_failure_policy() {
        let geometry = geometry(1);
        let mut roi = crate::random_stack(3, 3, 6, 14);
        roi[[1, 2, 4]] = f64::NAN;
        let mut scratch = WindowScratch::new(&geometry, 6);

        let skipping = WindowEvaluator::new(&geometry, -0.5, 4.0)
            .with_policies(WindowPolicy::Abort, WindowPolicy::Skip);
        assert_eq!(
            skipping.evaluate(roi.view(), &mut scratch).ok(),
            Some(WindowStatus::Skipped(SkipReason::NumericalFailure))
        );

        let aborting = skipping.with_policies(WindowPolicy::Skip, WindowPolicy::Abort);
        assert!(matches!(
            aborting.evaluate(roi.view(), &mut scratch),
            Err(MusicalError::NumericalFailure { .. })
        ));
    }

    // Tests rejection of a neighborhood that does not match the mask
    // Verified by removing the window shape check
    #[test]
    fn test_wrong_window_shape() {
        let geometry = geometry(1);
        let roi = Array3::<f64>::ones((3, 2, 4));
        let evaluator = WindowEvaluator::new(&geometry, -0.5, 4.0);
        let mut scratch = WindowScratch::new(&geometry, 4);

        assert!(matches!(
            evaluator.evaluate(roi.view(), &mut scratch),
            Err(MusicalError::ShapeMismatch { what: "window", .. })
        ));
    }

    // Tests that scratch sized for fewer frames adapts to the window
    // Verified by keeping the first patch allocation
    #[test]
    fn test_scratch_resizes_to_frame_count() {
        let geometry = geometry(1);
        let roi = crate::random_stack(3, 3, 7, 15);
        let evaluator = WindowEvaluator::new(&geometry, 10.0, 4.0);
        let mut scratch = WindowScratch::new(&geometry, 2);

        assert!(matches!(
            evaluator.evaluate(roi.view(), &mut scratch),
            Ok(WindowStatus::Evaluated { rank: 4 })
        ));
        assert_eq!(scratch.patch().dim(), (9, 7));
    }
}
