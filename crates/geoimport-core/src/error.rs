//! Custom error types for import operations.
//!
//! This module provides structured error handling using `thiserror`. Errors raised
//! by independently authored collaborators (format handlers, store factories,
//! transforms) arrive as `anyhow::Error` and are wrapped here with the context the
//! engine knows about: which unit, which transform, which phase.
//!
//! An input that no format can read is *not* an error; resolution returns
//! `Ok(None)` for it.

use std::fmt;
use std::path::PathBuf;

use geoimport_core_common::SchemaError;
use thiserror::Error;

/// Main error type for import operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Format resolution errors (ambiguous candidates)
    #[error(transparent)]
    Format(#[from] FormatError),

    /// I/O-class errors (transform failures, failed units, invalid paths)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Schema construction and record conformance errors
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Errors raised by collaborators without further classification
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Format resolution errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Several grid formats claim the input and none is the preferred format
    #[error("Multiple formats can read '{input}' and none is preferred: {}", candidates.join(", "))]
    Ambiguous {
        /// The input being resolved
        input: String,
        /// Display names of every candidate format
        candidates: Vec<String>,
    },
}

/// The pass of a pipeline during which a transform failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPhase {
    /// The once-per-unit schema pass.
    Schema,
    /// The per-record pass.
    Record,
}

impl TransformPhase {
    /// Returns the string representation of this phase.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TransformPhase::Schema => "schema",
            TransformPhase::Record => "record",
        }
    }
}

impl fmt::Display for TransformPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// I/O-class errors.
///
/// Transform failures are reported in this class: they abort the import unit the
/// same way a failed read would.
#[derive(Debug, Error)]
pub enum IoError {
    /// A transform raised an error
    #[error("Transform '{transform}' failed during the {phase} pass of unit '{unit}': {source}")]
    Transform {
        /// The import unit being processed
        unit: String,
        /// The failing transform's name
        transform: String,
        /// The pass that was running
        phase: TransformPhase,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The unit already failed; no further output is produced for it
    #[error("Import unit '{unit}' has failed and produces no further output")]
    UnitFailed {
        /// The failed unit
        unit: String,
    },

    /// Path is invalid for the requested operation
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path
        path: PathBuf,
        /// Why the path is invalid
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Type alias for Results using `ImportError`.
pub type Result<T> = std::result::Result<T, ImportError>;

impl ImportError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Format(e) => e.user_message(),
            Self::Io(e) => e.user_message(),
            Self::Schema(e) => format!("Schema error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Format(e) => e.recovery_suggestion(),
            Self::Io(e) => e.recovery_suggestion(),
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by retrying with different
    /// configuration or after the user takes some action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(IoError::InvalidPath { .. }))
    }
}

impl FormatError {
    fn user_message(&self) -> String {
        match self {
            Self::Ambiguous { input, candidates } => {
                format!(
                    "Cannot decide which format reads '{input}'.\n\nCandidates:\n{}",
                    candidates
                        .iter()
                        .map(|c| format!("  - {c}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Ambiguous { .. } => Some(
                "Rename the file or remove sidecar files so that a single format claims it."
                    .to_string(),
            ),
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Transform {
                unit,
                transform,
                phase,
                ..
            } => format!("Import of '{unit}' failed in transform '{transform}' ({phase} pass)"),
            Self::UnitFailed { .. } | Self::InvalidPath { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::InvalidPath { .. } => {
                Some("Ensure the path is valid and points to a readable file.".to_string())
            },
            Self::UnitFailed { .. } => {
                Some("Discard the unit and start a new import of the dataset.".to_string())
            },
            Self::Transform { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = ImportError::from(FormatError::Ambiguous {
            input: "scan.png".to_string(),
            candidates: vec!["WorldImage".to_string(), "PNGPlus".to_string()],
        });
        assert_eq!(
            err.to_string(),
            "Multiple formats can read 'scan.png' and none is preferred: WorldImage, PNGPlus"
        );
        assert!(err.user_message().contains("  - PNGPlus"));
        assert!(err.recovery_suggestion().is_some());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_transform_error_keeps_source() {
        use std::error::Error as _;

        let err = IoError::Transform {
            unit: "trails".to_string(),
            transform: "KmlFolderTransform".to_string(),
            phase: TransformPhase::Record,
            source: anyhow::anyhow!("boom").into(),
        };
        assert_eq!(
            err.to_string(),
            "Transform 'KmlFolderTransform' failed during the record pass of unit 'trails': boom"
        );
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_config_error_is_recoverable() {
        let err = ImportError::from(ConfigError::InvalidOption {
            option: "GEOIMPORT_PER_INSTANCE_METRICS".to_string(),
            message: "expected a boolean".to_string(),
        });
        assert!(err.is_recoverable());
        assert!(err.user_message().starts_with("Configuration error:"));
    }
}
