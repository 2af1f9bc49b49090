//! Error taxonomy shared by the classification and naming engines.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A problem with one unit of configuration (a trigger, a rule, a category).
/// The unit is skipped; the rest of the configuration stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("score must be positive (got {0})")]
    NonPositiveScore(i64),
    #[error("score is not an integer: {0}")]
    InvalidScore(String),
    #[error("regex trigger missing pattern")]
    MissingPattern,
    #[error("{0} trigger missing values")]
    MissingValues(&'static str),
    #[error("unsupported trigger type '{0}'")]
    UnsupportedTrigger(String),
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("malformed {what}: {message}")]
    Malformed { what: &'static str, message: String },
    #[error("no naming rules configured for category '{0}'")]
    MissingRuleSet(String),
    #[error("category '{0}' is missing a pattern")]
    MissingNamingPattern(String),
    #[error("invalid date format '{0}'")]
    InvalidDateFormat(String),
}

/// A [`ConfigError`] together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub scope: String,
    pub error: ConfigError,
}

impl ConfigIssue {
    pub fn new(scope: impl Into<String>, error: ConfigError) -> Self {
        Self {
            scope: scope.into(),
            error,
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.error)
    }
}

/// Failure while classifying or naming a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("score for category '{0}' overflowed")]
    ScoreOverflow(String),
    #[error("failed to build new file name from pattern '{0}'")]
    EmptyFileName(String),
    #[error("failed to render date with format '{0}'")]
    DateRender(String),
}

/// Top-level input could not be loaded. Fatal to the run.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Missing(&'static str),
}

impl InputError {
    pub(crate) fn json(origin: impl Into<String>, source: serde_json::Error) -> Self {
        InputError::Json {
            origin: origin.into(),
            source,
        }
    }
}

pub(crate) fn read_text(path: &std::path::Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}
