/// Command-line parsing and end-to-end processing
pub mod cli;
/// Named constants and defaults
pub mod configuration;
/// Error types and context helpers
pub mod error;
/// Frame stack loading and image export
pub mod image;
/// Window progress reporting
pub mod progress;
