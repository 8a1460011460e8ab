//! Error handling for the MineScope CLI

use minescope_service::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for MineScope CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Parsing error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Service error: {message}")]
    Service { message: String, unreachable: bool },

    #[error("Block not found: {key}")]
    BlockNotFound { key: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn parse<S: Into<String>>(file: S, message: S) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn block_not_found<S: Into<String>>(key: S) -> Self {
        Self::BlockNotFound { key: key.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        let unreachable = matches!(err, ServiceError::AllSourcesFailed { .. } | ServiceError::Http(_));
        Self::Service {
            message: err.to_string(),
            unreachable,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::Parse { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Ensure the file is JSON as returned by the analysis service\n\
                 • Check that the file is not truncated",
            );
        }

        CliError::Service { unreachable: true, .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that the local compute service is running (see [service] local_url)\n\
                 • Configure a proxy with --proxy-url or [service] proxy_url\n\
                 • Previously fetched baselines are only available from the history store",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your minescope.toml configuration file\n\
                 • Use 'minescope config --example' to generate a sample configuration",
            );
        }

        CliError::BlockNotFound { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Blocks are matched by persistent id, then block id, then label\n\
                 • Use 'minescope rows' to list the available blocks",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("results.json"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_unreachable_service_suggests_proxy() {
        let err: CliError = ServiceError::AllSourcesFailed {
            analysis_id: "a1".into(),
            attempts: vec!["local: refused".into()],
        }
        .into();
        assert!(format_error_with_suggestions(&err).contains("proxy"));

        let decode: CliError = ServiceError::NotFound("a1".into()).into();
        assert!(!format_error_with_suggestions(&decode).contains("Suggestions"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
