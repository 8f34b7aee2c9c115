//! Error message formatting with actionable suggestions.

use pkgfetch_core::error::FetchError;
use super::colors::ColorSupport;
use std::error::Error;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its suggestion and cause chain
    pub fn format_error(&self, error: &FetchError) -> String {
        let mut output = String::new();

        // Main error message
        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        if let Some(suggestion) = error.suggestion() {
            output.push_str("\n\n");
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
        }

        if error.is_recoverable() {
            output.push('\n');
            output.push_str(&self.colors.dim("note"));
            output.push_str(": this failure may be temporary, running the command again can help");
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn formatter() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_message_and_suggestion() {
        let error = FetchError::PackageNotFound {
            name: "ghost".to_string(),
        };

        assert_eq!(
            formatter().format_error(&error),
            "error: Package 'ghost' not found in registry\n\n\
             help: Check the package name spelling or try searching the registry"
        );
    }

    #[test]
    fn test_cause_chain() {
        let error = FetchError::DestinationWrite {
            path: PathBuf::from("/out/bower-1.7.7.tgz"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };

        let formatted = formatter().format_error(&error);
        assert!(formatted.starts_with("error: Failed to write /out/bower-1.7.7.tgz: disk full"));
        assert!(formatted.contains("\ncaused by: disk full"));
        assert!(formatted.contains("help: Make sure the target directory exists"));
        assert!(!formatted.contains("note:"));
    }

    #[test]
    fn test_recoverable_errors_get_retry_note() {
        let error = FetchError::Network {
            message: "Registry returned status 503 Service Unavailable: bower".to_string(),
            source: None,
        };

        let formatted = formatter().format_error(&error);
        assert!(formatted.ends_with(
            "help: Check your internet connection and try again\n\
             note: this failure may be temporary, running the command again can help"
        ));
    }
}
