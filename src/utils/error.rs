use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::AuthError { .. } => ErrorCategory::Authentication,
            EtlError::CsvError(_) | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Authentication | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML file, CLI flags and XUBIO_* environment variables"
            }
            ErrorCategory::Authentication => {
                "Verify the client id / secret pair and that the token endpoint is reachable"
            }
            ErrorCategory::Data => "Inspect the upstream payloads with --verbose",
            ErrorCategory::Storage => "Make sure the output directory exists and is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            EtlError::AuthError { .. } => "Could not obtain an access token".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// 單一請求的非致命錯誤，由各 fetcher 自行吸收
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_critical() {
        let err = EtlError::AuthError {
            message: "401".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.user_friendly_message(), "Could not obtain an access token");
    }

    #[test]
    fn test_config_errors_are_high() {
        let err = EtlError::MissingConfigError {
            field: "client_id".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("client_id"));
    }

    #[test]
    fn test_storage_and_data_errors() {
        let io = EtlError::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(io.category(), ErrorCategory::Storage);
        assert_eq!(io.severity(), ErrorSeverity::Critical);

        let processing = EtlError::ProcessingError {
            message: "csv buffer".to_string(),
        };
        assert_eq!(processing.category(), ErrorCategory::Data);
        assert_eq!(processing.severity(), ErrorSeverity::High);
    }
}
