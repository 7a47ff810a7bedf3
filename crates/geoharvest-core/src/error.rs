use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur in the harvester.
/// It uses the `thiserror` crate for ergonomic error handling and automatic
/// conversion from underlying library errors.
///
/// # Error Conversion
///
/// Most errors automatically convert from their source types using the
/// `#[from]` attribute:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
/// - `roxmltree::Error` → `AppError::XmlError`
/// - `std::io::Error` → `AppError::IoError`
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// This error wraps all errors from SQLx database operations, including
    /// connection failures, query errors, and constraint violations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client request failed.
    ///
    /// This error occurs when catalog requests fail due to network issues,
    /// timeouts, or server errors.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// JSON serialization or deserialization failed.
    ///
    /// This error occurs when converting between Rust types and JSON,
    /// typically when parsing raw feed payloads or preparing package values.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// XML document could not be parsed.
    #[error("XML error: {0}")]
    XmlError(String),

    /// URL parsing failed.
    ///
    /// This error occurs when attempting to parse an invalid URL string,
    /// typically when constructing catalog endpoints.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A caller-supplied date filter could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Writing to the output destination failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file error.
    ///
    /// This error occurs when reading or parsing the configuration file
    /// fails, such as when harvester.toml is malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl From<roxmltree::Error> for AppError {
    fn from(e: roxmltree::Error) -> Self {
        AppError::XmlError(e.to_string())
    }
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                format!("Database error: {}\n   Check the DATABASE_URL setting.", e)
            }
            AppError::ClientError(msg) => {
                if msg.contains("timeout") || msg.contains("timed out") {
                    "Request timed out. The catalog may be slow or unreachable.\n   Try again later or check the catalog URL.".to_string()
                } else if msg.contains("connect") {
                    format!("Cannot connect to catalog: {}\n   Check your internet connection and the catalog URL.", msg)
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::InvalidDate(s) => {
                format!("Invalid date: {}\n   Use YYYY-MM-DD.", s)
            }
            AppError::ConfigError(msg) => {
                format!(
                    "Configuration error: {}\n   Check your configuration file.",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is transient and a later run may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ClientError(_))
    }
}
