//! Tests for configuration constants

#[cfg(test)]
mod tests {
    use musical::MusicalConfig;
    use musical::io::configuration::{
        DEFAULT_ALPHA, DEFAULT_MASK_SIZE, DEFAULT_PSF_SIGMA, DEFAULT_SUBPIXELS, DEFAULT_THRESHOLD,
        FRAME_EXTENSIONS, OUTPUT_WHITE_LEVEL, SVD_MAX_ITERATIONS,
    };
    use musical::spatial::mask::calculate_padding;

    // Tests that the default window has a center pixel
    // Verified by setting an even mask size
    #[test]
    fn test_default_mask_size_is_odd() {
        assert!(calculate_padding(DEFAULT_MASK_SIZE).is_ok());
        assert!(DEFAULT_PSF_SIGMA > 0.0);
    }

    // Tests that the library defaults follow the constants
    // Verified by hard-coding a different default
    #[test]
    fn test_config_defaults_follow_constants() {
        let config = MusicalConfig::default();
        assert_eq!(config.subpixels, DEFAULT_SUBPIXELS);
        assert!((config.threshold - DEFAULT_THRESHOLD).abs() < f64::EPSILON);
        assert!((config.alpha - DEFAULT_ALPHA).abs() < f64::EPSILON);
    }

    // Tests output and decomposition limits
    // Verified by changing the white level
    #[test]
    fn test_limits() {
        assert!((OUTPUT_WHITE_LEVEL - f64::from(u16::MAX)).abs() < f64::EPSILON);
        assert!(SVD_MAX_ITERATIONS > 0);
        assert!(FRAME_EXTENSIONS.iter().all(|ext| ext.chars().all(|c| c.is_ascii_lowercase())));
    }
}
