//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and an appropriate exit code.

use std::fmt;
use std::process;

use photomosaic::error::MosaicError;
use photomosaic::fetch::FetchError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to create the Tokio runtime
    Runtime(String),
    /// Configuration error
    Config(String),
    /// Failed to read the input image
    Input { path: String, reason: String },
    /// Mosaic generation failed
    Generate(MosaicError),
    /// Failed to write the output file
    FileWrite { path: String, reason: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        if let CliError::Generate(MosaicError::Fetch(FetchError::InsufficientTiles {
            requested,
            ..
        })) = self
        {
            eprintln!();
            eprintln!("The gallery ran out of usable images before {} tiles", requested);
            eprintln!("were collected. Try:");
            eprintln!("  1. A more active topic (--topic)");
            eprintln!("  2. A smaller tile count (--count)");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Input { path, reason } => {
                write!(f, "Failed to read input image '{}': {}", path, reason)
            }
            CliError::Generate(e) => write!(f, "Mosaic generation failed: {}", e),
            CliError::FileWrite { path, reason } => {
                write!(f, "Failed to write file '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Generate(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MosaicError> for CliError {
    fn from(e: MosaicError) -> Self {
        CliError::Generate(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CliError::Config("missing topic".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("missing topic"));
    }

    #[test]
    fn test_generate_error_wraps_mosaic_error() {
        let err: CliError = MosaicError::Config("tile size must be positive".into()).into();
        assert!(matches!(err, CliError::Generate(_)));
        assert!(err.to_string().contains("Mosaic generation failed"));
    }
}
