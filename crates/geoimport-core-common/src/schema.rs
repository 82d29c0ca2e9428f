//! Feature schemas for imported datasets.
//!
//! A [`Schema`] is an ordered sequence of named, typed fields. At most one field is
//! designated the default geometry. Schemas also carry a coordinate reference
//! identifier and a free-text description. Schemas are immutable once built; use
//! [`SchemaBuilder`] (or [`Schema::to_builder`]) to derive a modified copy.
//!
//! # Examples
//!
//! ```
//! use geoimport_core_common::{FieldType, GeometryKind, Schema};
//!
//! let schema = Schema::builder("roads")
//!     .add("Geometry", FieldType::Geometry(GeometryKind::LineString))
//!     .add("Name", FieldType::text())
//!     .set_default_geometry("Geometry")
//!     .crs("EPSG:4326")
//!     .build()
//!     .expect("valid schema");
//!
//! assert_eq!(schema.fields().len(), 2);
//! assert_eq!(schema.default_geometry().unwrap().name(), "Geometry");
//! ```

use std::collections::HashSet;
use std::fmt;

use arrow_schema::DataType;

use crate::error::SchemaError;

/// Geometry type constraint of a geometry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Any geometry type.
    Any,
    /// Single point.
    Point,
    /// Single line string.
    LineString,
    /// Single polygon.
    Polygon,
    /// Collection of points.
    MultiPoint,
    /// Collection of line strings.
    MultiLineString,
    /// Collection of polygons.
    MultiPolygon,
    /// Heterogeneous geometry collection.
    GeometryCollection,
}

impl GeometryKind {
    /// Returns the string representation of this geometry kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            GeometryKind::Any => "Geometry",
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }
}

/// Type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Scalar attribute described with an Arrow data type.
    Attribute(DataType),
    /// Geometry attribute.
    Geometry(GeometryKind),
    /// Reader-exposed style object, not yet rendered to text.
    Style,
}

impl FieldType {
    /// Plain text attribute (`Utf8`).
    #[must_use]
    pub fn text() -> Self {
        FieldType::Attribute(DataType::Utf8)
    }

    /// Returns `true` if this is a geometry type.
    #[must_use]
    pub fn is_geometry(&self) -> bool {
        matches!(self, FieldType::Geometry(_))
    }

    /// Returns `true` if this is a text attribute.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            FieldType::Attribute(DataType::Utf8 | DataType::LargeUtf8)
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Attribute(data_type) => write!(f, "{data_type}"),
            FieldType::Geometry(kind) => f.write_str(kind.as_str()),
            FieldType::Style => f.write_str("Style"),
        }
    }
}

/// A named, typed field of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    nullable: bool,
}

impl FieldDescriptor {
    /// Creates a nullable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Sets whether the field accepts null values.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Whether the field accepts null values.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// An ordered, validated set of fields describing one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    description: Option<String>,
    crs: Option<String>,
    fields: Vec<FieldDescriptor>,
    default_geometry: Option<String>,
}

impl Schema {
    /// Starts building a schema with the given feature-type name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Returns a builder pre-populated with this schema's name, description,
    /// CRS, fields and default geometry.
    #[must_use]
    pub fn to_builder(&self) -> SchemaBuilder {
        SchemaBuilder {
            name: self.name.clone(),
            description: self.description.clone(),
            crs: self.crs.clone(),
            fields: self.fields.clone(),
            default_geometry: self.default_geometry.clone(),
        }
    }

    /// Feature-type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Coordinate reference identifier (e.g. `"EPSG:4326"`).
    #[must_use]
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The default geometry field, if one is declared.
    #[must_use]
    pub fn default_geometry(&self) -> Option<&FieldDescriptor> {
        self.default_geometry
            .as_deref()
            .and_then(|name| self.field(name))
    }
}

/// Incremental builder for [`Schema`].
///
/// Adding a field whose name already exists is allowed while building; the
/// duplicate is reported by [`SchemaBuilder::build`]. Use
/// [`SchemaBuilder::remove`] first to replace a field.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    description: Option<String>,
    crs: Option<String>,
    fields: Vec<FieldDescriptor>,
    default_geometry: Option<String>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            crs: None,
            fields: Vec::new(),
            default_geometry: None,
        }
    }

    /// Sets the feature-type name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Sets or clears the description.
    pub fn description(&mut self, description: Option<impl Into<String>>) -> &mut Self {
        self.description = description.map(Into::into);
        self
    }

    /// Sets the coordinate reference identifier.
    pub fn crs(&mut self, crs: impl Into<String>) -> &mut Self {
        self.crs = Some(crs.into());
        self
    }

    /// Appends a nullable field.
    pub fn add(&mut self, name: impl Into<String>, field_type: FieldType) -> &mut Self {
        self.fields.push(FieldDescriptor::new(name, field_type));
        self
    }

    /// Appends an existing descriptor unchanged.
    pub fn add_descriptor(&mut self, descriptor: FieldDescriptor) -> &mut Self {
        self.fields.push(descriptor);
        self
    }

    /// Removes the first field with the given name, returning it.
    ///
    /// Removing the default geometry clears the default geometry designation.
    pub fn remove(&mut self, name: &str) -> Option<FieldDescriptor> {
        let index = self.fields.iter().position(|f| f.name == name)?;
        if self.default_geometry.as_deref() == Some(name) {
            self.default_geometry = None;
        }
        Some(self.fields.remove(index))
    }

    /// Declares the default geometry field by name.
    pub fn set_default_geometry(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_geometry = Some(name.into());
        self
    }

    /// Validates and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if two fields share a name, or if the declared default
    /// geometry is missing or not geometry-typed.
    pub fn build(&self) -> Result<Schema, SchemaError> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        if let Some(geometry) = &self.default_geometry {
            match self.fields.iter().find(|f| &f.name == geometry) {
                None => {
                    return Err(SchemaError::MissingDefaultGeometry {
                        schema: self.name.clone(),
                        field: geometry.clone(),
                    });
                },
                Some(field) if !field.field_type.is_geometry() => {
                    return Err(SchemaError::InvalidDefaultGeometry {
                        schema: self.name.clone(),
                        field: geometry.clone(),
                    });
                },
                Some(_) => {},
            }
        }

        Ok(Schema {
            name: self.name.clone(),
            description: self.description.clone(),
            crs: self.crs.clone(),
            fields: self.fields.clone(),
            default_geometry: self.default_geometry.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_duplicate_fields() {
        let err = Schema::builder("t")
            .add("Name", FieldType::text())
            .add("Name", FieldType::text())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField {
                schema: "t".to_string(),
                field: "Name".to_string(),
            }
        );
    }

    #[test]
    fn test_build_rejects_missing_default_geometry() {
        let err = Schema::builder("t")
            .add("Name", FieldType::text())
            .set_default_geometry("Geometry")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingDefaultGeometry { .. }));
    }

    #[test]
    fn test_build_rejects_non_geometry_default() {
        let err = Schema::builder("t")
            .add("Name", FieldType::text())
            .set_default_geometry("Name")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefaultGeometry { .. }));
    }

    #[test]
    fn test_remove_then_add_moves_field_to_end() {
        let mut builder = Schema::builder("t");
        builder
            .add("Style", FieldType::Style)
            .add("Name", FieldType::text());
        let removed = builder.remove("Style").unwrap();
        assert_eq!(removed.field_type(), &FieldType::Style);
        builder.add("Style", FieldType::text());

        let schema = builder.build().unwrap();
        let names: Vec<_> = schema.fields().iter().map(FieldDescriptor::name).collect();
        assert_eq!(names, ["Name", "Style"]);
        assert!(schema.field("Style").unwrap().field_type().is_text());
    }

    #[test]
    fn test_removing_default_geometry_clears_designation() {
        let mut builder = Schema::builder("t");
        builder
            .add("the_geom", FieldType::Geometry(GeometryKind::Point))
            .set_default_geometry("the_geom");
        builder.remove("the_geom");
        let schema = builder.build().unwrap();
        assert!(schema.default_geometry().is_none());
    }

    #[test]
    fn test_to_builder_round_trips_metadata() {
        let schema = Schema::builder("places")
            .add("Geometry", FieldType::Geometry(GeometryKind::Any))
            .set_default_geometry("Geometry")
            .description(Some("Points of interest"))
            .crs("EPSG:4326")
            .build()
            .unwrap();
        let copy = schema.to_builder().build().unwrap();
        assert_eq!(schema, copy);
        assert_eq!(copy.description(), Some("Points of interest"));
        assert_eq!(copy.crs(), Some("EPSG:4326"));
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::text().to_string(), "Utf8");
        assert_eq!(
            FieldType::Geometry(GeometryKind::MultiPolygon).to_string(),
            "MultiPolygon"
        );
        assert_eq!(FieldType::Style.to_string(), "Style");
    }
}
