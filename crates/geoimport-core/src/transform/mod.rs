//! Schema and record transforms.
//!
//! A [`Transform`] reshapes imported data. It advertises up to two capabilities:
//!
//! - [`SchemaTransform`]: rewrites the unit's schema, once per unit.
//! - [`RecordTransform`]: rewrites each record against the schema the schema
//!   pass produced.
//!
//! Transforms are stateless or configuration-only, so a single instance can be
//! shared by many units. Ordered transforms are grouped in a
//! [`TransformPipeline`].

mod kml;
mod pipeline;

pub use kml::{
    CANONICAL_GEOMETRY, FOLDER_FIELD, FOLDER_SEPARATOR, KmlFolderTransform, STYLE_FIELD, folder_path,
};
pub use pipeline::TransformPipeline;

use std::fmt;

use anyhow::Result;
use geoimport_core_common::{Record, Schema, SchemaError};

use crate::handler::StoreHandle;

/// Identity of the unit a transform is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit (layer) name.
    pub name: String,
    /// Name of the format handler that produced the unit.
    pub format: String,
}

/// Rewrites a schema.
pub trait SchemaTransform: Send + Sync {
    /// Returns the transformed schema.
    ///
    /// # Errors
    ///
    /// Any error aborts the import of the unit.
    fn apply(&self, unit: &UnitInfo, store: &StoreHandle, schema: Schema) -> Result<Schema>;
}

/// Rewrites a record.
pub trait RecordTransform: Send + Sync {
    /// Returns the transformed record.
    ///
    /// `old` is the record as read from the source. `new` already conforms to
    /// the target schema and holds the output of the previous record transform;
    /// the returned record must conform to the same schema.
    ///
    /// # Errors
    ///
    /// Any error aborts the import of the unit.
    fn apply(
        &self,
        unit: &UnitInfo,
        store: &StoreHandle,
        old: &Record,
        new: Record,
    ) -> Result<Record>;
}

/// A unit of schema and/or record reshaping.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// The schema capability, if implemented.
    fn as_schema_transform(&self) -> Option<&dyn SchemaTransform> {
        None
    }

    /// The record capability, if implemented.
    fn as_record_transform(&self) -> Option<&dyn RecordTransform> {
        None
    }
}

/// Copies values from `old` into `new` wherever both schemas have a field of the
/// same name.
///
/// Field order does not matter. Values are converted to the target field type
/// with [`geoimport_core_common::Value::convert_to`]; fields only the target has
/// keep their current value.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownField`] if `new` rejects a field its own schema
/// lists, which only happens for a malformed schema.
pub fn copy_attributes(old: &Record, new: &mut Record) -> Result<(), SchemaError> {
    let target = std::sync::Arc::clone(new.schema());
    for field in target.fields() {
        if let Some(value) = old.get(field.name()) {
            new.set_converted(field.name(), value)?;
        }
    }
    Ok(())
}
