use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Dataset download failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Pattern compilation error: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Reference index build failed: {message}")]
    IndexBuildError { message: String },

    #[error("Dataset source error ({source_name}): {message}")]
    DatasetSourceError {
        source_name: String,
        message: String,
    },

    #[error("Analysis task failed: {message}")]
    TaskError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Dataset,
    Network,
    Io,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RiskError::ConfigValidationError { .. }
            | RiskError::InvalidConfigValueError { .. }
            | RiskError::MissingConfigError { .. }
            | RiskError::PatternError(_) => ErrorCategory::Configuration,
            RiskError::IndexBuildError { .. }
            | RiskError::DatasetSourceError { .. }
            | RiskError::CsvError(_) => ErrorCategory::Dataset,
            RiskError::HttpError(_) => ErrorCategory::Network,
            RiskError::IoError(_) | RiskError::ZipError(_) => ErrorCategory::Io,
            RiskError::SerializationError(_) | RiskError::TaskError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Critical,
            ErrorCategory::Dataset => ErrorSeverity::Critical,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RiskError::ConfigValidationError { field, .. }
            | RiskError::InvalidConfigValueError { field, .. } => {
                format!("Check the value of '{}' in the configuration file", field)
            }
            RiskError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration file or command line", field)
            }
            RiskError::IndexBuildError { .. } => {
                "Make sure the reference dataset contains at least one valid ingredient row"
                    .to_string()
            }
            RiskError::DatasetSourceError { source_name, .. } => {
                format!("Verify that the dataset at '{}' is reachable", source_name)
            }
            RiskError::HttpError(_) => {
                "Check network connectivity and the dataset URL, then retry".to_string()
            }
            RiskError::CsvError(_) => {
                "Check that the dataset header is canonical_name,aliases,hazards,cas_number,ec_number,popularity"
                    .to_string()
            }
            RiskError::IoError(_) => "Check file paths and permissions".to_string(),
            RiskError::ZipError(_) => "Check free disk space for the output archive".to_string(),
            RiskError::SerializationError(_) => {
                "Check that the profile or dataset is valid JSON".to_string()
            }
            RiskError::PatternError(_) => {
                "Check normalizer markers and phrases in the configuration".to_string()
            }
            RiskError::TaskError { .. } => "Retry the analysis".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Dataset => format!("Reference dataset problem: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Processing => format!("Analysis problem: {}", self),
        }
    }

    pub(crate) fn invalid_value(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        RiskError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_critical() {
        let err = RiskError::invalid_value("matcher.acceptance_threshold", 1.5, "out of range");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("matcher.acceptance_threshold"));
    }

    #[test]
    fn test_user_friendly_message_mentions_category() {
        let err = RiskError::IndexBuildError {
            message: "no valid rows".to_string(),
        };
        assert!(err.user_friendly_message().starts_with("Reference dataset problem"));
    }
}
