//! Common types shared across `geoimport` crates.
//!
//! This crate provides the in-memory data model that format handlers, transforms
//! and the import engine exchange, keeping `geoimport-core` free of the model
//! definitions and preventing circular dependencies with handler crates.

pub mod descriptor;
pub mod error;
pub mod record;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use descriptor::{ConnectionParams, FileDescriptor, InputDescriptor, normalize_extension};
pub use error::SchemaError;
pub use record::{EXTENDED_DATA_KEY, FOLDER_KEY, Folder, Metadata, Record, STYLE_KEY};
pub use schema::{FieldDescriptor, FieldType, GeometryKind, Schema, SchemaBuilder};
pub use value::{Style, Value};
