use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    TableFetchFailed,
    TableInvalid,

    ProjectionAmbiguous,

    FileDecodeFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::TableFetchFailed => "table.fetch_failed",
            ErrorCode::TableInvalid => "table.invalid",

            ErrorCode::ProjectionAmbiguous => "projection.ambiguous",

            ErrorCode::FileDecodeFailed => "file.decode_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetails {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionAmbiguousDetails {
    pub reference: String,
    pub package: String,
    pub targets: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDecodeDetails {
    pub path: String,
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.clone(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid configuration value: {}", problem),
            details,
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            details,
        )
    }

    pub fn table_fetch_failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        let source = source.into();
        let error = error.into();
        let message = format!("Failed to fetch mapping table '{}': {}", source, error);
        let details = to_details(TableDetails {
            source,
            line: None,
            problem: error,
        });

        Self::new(ErrorCode::TableFetchFailed, message, details)
            .with_hint("Check the table URL or path; no file has been modified")
    }

    pub fn table_invalid(
        source: impl Into<String>,
        line: Option<u64>,
        problem: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let problem = problem.into();
        let message = match line {
            Some(line) => format!("Invalid mapping table '{}' at line {}: {}", source, line, problem),
            None => format!("Invalid mapping table '{}': {}", source, problem),
        };
        let details = to_details(TableDetails {
            source,
            line,
            problem,
        });

        Self::new(ErrorCode::TableInvalid, message, details)
    }

    pub fn projection_ambiguous(
        reference: impl Into<String>,
        package: impl Into<String>,
        targets: Vec<String>,
    ) -> Self {
        let reference = reference.into();
        let package = package.into();
        let message = format!(
            "Package projection '{}' is ambiguous: '{}' maps to {} packages ({})",
            reference,
            package,
            targets.len(),
            targets.join(", ")
        );
        let details = to_details(ProjectionAmbiguousDetails {
            reference,
            package,
            targets,
        });

        Self::new(ErrorCode::ProjectionAmbiguous, message, details)
            .with_hint("Replace the wildcard import with explicit imports before migrating")
    }

    pub fn file_decode_failed(path: &Path, line: usize, error: impl Into<String>) -> Self {
        let error = error.into();
        let message = format!(
            "File '{}' is not valid UTF-8 (line {}): {}",
            path.display(),
            line,
            error
        );
        let details = to_details(FileDecodeDetails {
            path: path.display().to_string(),
            line,
            error,
        });

        Self::new(ErrorCode::FileDecodeFailed, message, details)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let message = match &context {
            Some(context) => format!("IO error ({}): {}", context, error),
            None => format!("IO error: {}", error),
        };
        let details = to_details(InternalIoErrorDetails { error, context });

        Self::new(ErrorCode::InternalIoError, message, details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    /// Attach the file and line a rewrite failed at.
    pub fn at(mut self, path: &Path, line: usize) -> Self {
        if let Value::Object(map) = &mut self.details {
            map.insert("file".to_string(), Value::String(path.display().to_string()));
            map.insert("lineNumber".to_string(), Value::from(line));
        }
        self.message = format!("{} (at {}:{})", self.message, path.display(), line);
        self
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_error_names_package_and_targets() {
        let err = Error::projection_ambiguous(
            "android.support.v4.*",
            "android.support.v4.",
            vec!["androidx.core.".to_string(), "androidx.fragment.".to_string()],
        );

        assert_eq!(err.code.as_str(), "projection.ambiguous");
        assert!(err.message.contains("android.support.v4."));
        assert!(err.message.contains("androidx.core."));
        assert!(err.message.contains("androidx.fragment."));
        assert_eq!(err.details["targets"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn at_records_location_in_details_and_message() {
        let err = Error::projection_ambiguous("a.*", "a.", vec!["x.".into(), "y.".into()])
            .at(Path::new("src/Main.java"), 12);

        assert_eq!(err.details["file"], "src/Main.java");
        assert_eq!(err.details["lineNumber"], 12);
        assert!(err.message.ends_with("(at src/Main.java:12)"));
    }

    #[test]
    fn table_invalid_message_includes_line() {
        let err = Error::table_invalid("symbols.csv", Some(4), "missing 'to' column");
        assert_eq!(err.code.as_str(), "table.invalid");
        assert!(err.message.contains("line 4"));
        assert_eq!(err.details["source"], "symbols.csv");
    }
}
