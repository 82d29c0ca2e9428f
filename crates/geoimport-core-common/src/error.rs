//! Errors raised while building schemas or populating records.

use thiserror::Error;

/// Schema and record validation errors.
///
/// These errors occur when a schema is built with conflicting field
/// definitions, or when a record is written through a field name the
/// record's schema does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields share the same name
    #[error("Duplicate field '{field}' in schema '{schema}'")]
    DuplicateField {
        /// The schema being built
        schema: String,
        /// The repeated field name
        field: String,
    },

    /// The declared default geometry is not one of the schema's fields
    #[error("Default geometry '{field}' is not a field of schema '{schema}'")]
    MissingDefaultGeometry {
        /// The schema being built
        schema: String,
        /// The declared default geometry name
        field: String,
    },

    /// The declared default geometry exists but is not geometry-typed
    #[error("Default geometry '{field}' of schema '{schema}' is not a geometry field")]
    InvalidDefaultGeometry {
        /// The schema being built
        schema: String,
        /// The declared default geometry name
        field: String,
    },

    /// A record was addressed through a field its schema does not have
    #[error("Field '{field}' does not exist in schema '{schema}'")]
    UnknownField {
        /// The record's schema
        schema: String,
        /// The requested field name
        field: String,
    },
}
