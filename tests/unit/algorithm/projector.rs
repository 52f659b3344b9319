//! Tests for rank selection, subspace energy and tile folding

#[cfg(test)]
mod tests {
    use musical::algorithm::projector::{
        CovarianceProjector, Projection, ProjectionBuffers, fold_tile, pseudo_spectrum,
        select_rank, signal_energy,
    };
    use musical::math::svd::NalgebraSvd;
    use musical::spatial::WhitenedGeometry;
    use ndarray::{Array1, Array2, array};

    // Tests counting of leading values at or above the threshold
    // Verified by counting the first value below the threshold as well
    #[test]
    fn test_select_rank_counts_leading_values() {
        assert_eq!(select_rank(array![5.0, 3.0, 0.5, 0.1].view(), 1.0), 2);
        assert_eq!(select_rank(array![5.0, 1.0, 0.5, 0.1].view(), 1.0), 2);
    }

    // Tests the len - 3 fallback when no value or every value passes
    // Verified by returning the raw count
    #[test]
    fn test_select_rank_fallback() {
        assert_eq!(select_rank(array![0.9, 0.8, 0.7].view(), 1.0), 0);
        assert_eq!(select_rank(array![5.0, 4.0, 3.0, 2.0, 1.0].view(), 0.5), 2);
        assert_eq!(select_rank(array![0.5, 0.2].view(), 1.0), -1);
    }

    // Tests reversal followed by a column-major fold
    // Verified by folding row-major
    #[test]
    fn test_fold_tile_reverses_column_major() {
        let mut tile = Array2::zeros((2, 2));
        fold_tile(array![4.0, 3.0, 2.0, 1.0].view(), &mut tile);

        assert_eq!(tile, array![[1.0, 3.0], [2.0, 4.0]]);
    }

    // Tests the contrast exponent on a known signal/noise ratio
    // Verified by applying alpha instead of alpha / 2
    #[test]
    fn test_pseudo_spectrum_exponent() {
        let signal = array![1.0, 2.0];
        let gmod = array![3.0, 3.0];
        let mut spectrum = Array1::zeros(2);

        pseudo_spectrum(signal.view(), gmod.view(), 2.0, &mut spectrum);
        assert!((spectrum[0] - 0.5).abs() < 1e-15);
        assert!((spectrum[1] - 2.0).abs() < 1e-15);

        pseudo_spectrum(signal.view(), gmod.view(), 0.0, &mut spectrum);
        assert!(spectrum.iter().all(|&v| (v - 1.0).abs() < f64::EPSILON));
    }

    // Tests that only the first rank columns of U contribute
    // Verified by projecting onto every column
    #[test]
    fn test_signal_energy_uses_leading_columns() {
        let gm = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let u = Array2::<f64>::eye(2);
        let mut projection = Array2::zeros((0, 0));
        let mut signal = Array1::zeros(0);

        signal_energy(gm.view(), u.view(), 1, &mut projection, &mut signal);
        assert_eq!(signal.to_vec(), vec![1.0, 9.0, 25.0]);

        signal_energy(gm.view(), u.view(), 2, &mut projection, &mut signal);
        assert_eq!(signal.to_vec(), vec![5.0, 25.0, 61.0]);
    }

    // Tests a full projection whose rank comes from the fallback rule
    // Verified by ignoring the fallback and using every singular vector
    #[test]
    fn test_project_random_patch() {
        let (mask, gmatrix) = crate::gaussian_setup(3, 2, 1.0);
        let Ok(geometry) = WhitenedGeometry::new(mask.view(), gmatrix.view(), 2) else {
            unreachable!("consistent setup");
        };
        let patch = crate::random_stack(9, 8, 1, 3).into_shape_with_order((9, 8));
        let Ok(patch) = patch else {
            unreachable!("reshape of a contiguous stack");
        };

        let projector = CovarianceProjector::new(&geometry, 10.0, 4.0);
        let mut solver = NalgebraSvd::new();
        let mut buffers = ProjectionBuffers::new(&geometry, 8);
        let mut tile = Array2::zeros((6, 6));

        let result = projector.project(patch.view(), &mut solver, &mut buffers, &mut tile);
        assert!(matches!(result, Ok(Projection::Tile { rank: 5 })));
        assert!((projector.threshold10() - 1e10).abs() < 1.0);

        let signal = buffers.signal();
        assert!(
            signal
                .iter()
                .zip(geometry.gmod().iter())
                .all(|(&s, &g)| s >= 0.0 && s <= g * (1.0 + 1e-12))
        );
        let last = buffers.spectrum()[geometry.points() - 1];
        assert!((tile[[0, 0]] - last).abs() < f64::EPSILON);
    }

    // Tests that too few singular values report a degenerate rank
    // Verified by clamping the fallback at zero
    #[test]
    fn test_project_degenerate_rank() {
        let (mask, gmatrix) = crate::gaussian_setup(3, 1, 1.0);
        let Ok(geometry) = WhitenedGeometry::new(mask.view(), gmatrix.view(), 1) else {
            unreachable!("consistent setup");
        };
        let patch = Array2::from_shape_fn((9, 2), |(i, f)| (i + f + 1) as f64);

        let projector = CovarianceProjector::new(&geometry, -10.0, 4.0);
        let mut buffers = ProjectionBuffers::new(&geometry, 2);
        let mut tile = Array2::zeros((3, 3));
        let result = projector.project(
            patch.view(),
            &mut NalgebraSvd::new(),
            &mut buffers,
            &mut tile,
        );

        assert!(matches!(
            result,
            Ok(Projection::DegenerateRank {
                rank: -1,
                singular_values: 2
            })
        ));
    }
}
