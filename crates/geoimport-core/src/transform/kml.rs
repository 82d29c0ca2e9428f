//! Flattening of KML placemark metadata into plain attributes.
//!
//! KML readers expose the folder hierarchy, style and `<ExtendedData>` of each
//! placemark through the record metadata rather than as fields. This transform
//! promotes them to attributes so they survive in a tabular store.

use std::collections::BTreeMap;

use anyhow::Result;
use geoimport_core_common::{
    EXTENDED_DATA_KEY, FOLDER_KEY, FieldType, Folder, GeometryKind, Record, STYLE_KEY, Schema,
    Style, Value,
};

use crate::formats::KML_CRS;
use crate::handler::StoreHandle;

use super::{RecordTransform, SchemaTransform, Transform, UnitInfo};

/// Name of the geometry field in transformed KML schemas.
pub const CANONICAL_GEOMETRY: &str = "Geometry";

/// Name of the text field holding the rendered style.
pub const STYLE_FIELD: &str = "Style";

/// Name of the text field holding the folder path.
pub const FOLDER_FIELD: &str = "Folder";

/// Separator between folder names in the folder path.
pub const FOLDER_SEPARATOR: &str = " -> ";

/// Promotes KML style, folder and extended data to attributes.
///
/// Schema pass: the geometry becomes `Geometry` (default geometry, any type),
/// other attributes are kept, the CRS is forced to [`KML_CRS`] and text fields
/// `Style` and `Folder` are appended, replacing fields of the same name.
///
/// Record pass: the style is rendered to text, the folder hierarchy is joined
/// with [`FOLDER_SEPARATOR`] and every extended data entry is written to the
/// field of the same name, converted to that field's type.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmlFolderTransform;

impl KmlFolderTransform {
    /// Builds the KML target schema from a reader schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting schema is invalid.
    pub fn convert_schema(&self, old: &Schema) -> Result<Schema> {
        let mut builder = Schema::builder(old.name());
        builder
            .add(CANONICAL_GEOMETRY, FieldType::Geometry(GeometryKind::Any))
            .set_default_geometry(CANONICAL_GEOMETRY);

        for field in old.fields() {
            if field.name() != CANONICAL_GEOMETRY && !field.field_type().is_geometry() {
                builder.add_descriptor(field.clone());
            }
        }

        builder.description(old.description()).crs(KML_CRS);
        builder.remove(STYLE_FIELD);
        builder.add(STYLE_FIELD, FieldType::text());
        builder.remove(FOLDER_FIELD);
        builder.add(FOLDER_FIELD, FieldType::text());

        Ok(builder.build()?)
    }

    /// Fills `new` from the reader record `old`.
    ///
    /// `new` is expected to already hold the generic attribute copy.
    ///
    /// # Errors
    ///
    /// Returns an error if an extended data key is not a field of the target schema.
    pub fn convert_record(&self, old: &Record, mut new: Record) -> Result<Record> {
        if new.get(CANONICAL_GEOMETRY).is_some_and(Value::is_null) {
            if let Some(geometry @ Value::Geometry(_)) = old.default_geometry() {
                new.set(CANONICAL_GEOMETRY, geometry.clone())?;
            }
        }

        let metadata = old.metadata();

        if let Some(style) = metadata.get::<Style>(STYLE_KEY) {
            new.set(STYLE_FIELD, style.to_string())?;
        }

        if let Some(folders) = metadata.get::<Vec<Folder>>(FOLDER_KEY) {
            new.set(FOLDER_FIELD, folder_path(folders))?;
        }

        if let Some(extended) = metadata.get::<BTreeMap<String, String>>(EXTENDED_DATA_KEY) {
            for (key, value) in extended {
                new.set_converted(key, &Value::from(value.as_str()))?;
            }
        }

        Ok(new)
    }
}

/// Joins non-empty folder names, outermost first.
///
/// # Examples
///
/// ```
/// use geoimport_core::transform::folder_path;
/// use geoimport_core_common::Folder;
///
/// let folders = [Folder::new("Placemarks"), Folder::new(""), Folder::new("Trails")];
/// assert_eq!(folder_path(&folders), "Placemarks -> Trails");
/// assert_eq!(folder_path(&[]), "");
/// ```
#[must_use]
pub fn folder_path(folders: &[Folder]) -> String {
    folders
        .iter()
        .filter_map(|folder| folder.name.as_deref())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(FOLDER_SEPARATOR)
}

impl Transform for KmlFolderTransform {
    fn name(&self) -> &str {
        "KmlFolderTransform"
    }

    fn as_schema_transform(&self) -> Option<&dyn SchemaTransform> {
        Some(self)
    }

    fn as_record_transform(&self) -> Option<&dyn RecordTransform> {
        Some(self)
    }
}

impl SchemaTransform for KmlFolderTransform {
    fn apply(&self, _unit: &UnitInfo, _store: &StoreHandle, schema: Schema) -> Result<Schema> {
        self.convert_schema(&schema)
    }
}

impl RecordTransform for KmlFolderTransform {
    fn apply(
        &self,
        _unit: &UnitInfo,
        _store: &StoreHandle,
        old: &Record,
        new: Record,
    ) -> Result<Record> {
        self.convert_record(old, new)
    }
}
