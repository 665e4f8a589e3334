//! Output formatting and progress indicators

use indicatif::{ProgressBar, ProgressStyle};

/// Output preferences shared by all commands
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Suppress progress output
    pub quiet: bool,
    /// Emit machine-readable JSON where supported
    pub json: bool,
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Display a top-level error
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error:#}", status::ERROR);
}

/// Status message prefixes
pub mod status {
    /// Success prefix
    pub const SUCCESS: &str = "✓";

    /// Error prefix
    pub const ERROR: &str = "✗";

    /// Warning prefix
    pub const WARNING: &str = "⚠";
}
