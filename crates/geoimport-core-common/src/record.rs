//! Records and their metadata side-channel.
//!
//! A [`Record`] holds one value per field of its [`Schema`] plus a [`Metadata`]
//! bag. The bag carries reader-specific hints that are not schema fields, such
//! as the KML folder hierarchy of a placemark. Transforms read it through the
//! well-known keys [`FOLDER_KEY`], [`STYLE_KEY`] and [`EXTENDED_DATA_KEY`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::schema::{FieldDescriptor, Schema};
use crate::value::Value;

/// Metadata key for the folder hierarchy, a `Vec<Folder>` ordered outermost first.
pub const FOLDER_KEY: &str = "Folder";

/// Metadata key for the feature style, a [`crate::Style`].
pub const STYLE_KEY: &str = "Style";

/// Metadata key for extended attributes, a `BTreeMap<String, String>`.
pub const EXTENDED_DATA_KEY: &str = "ExtendedData";

/// A container in a KML document hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Folder {
    /// Folder name, possibly absent or empty.
    pub name: Option<String>,
}

impl Folder {
    /// Creates a named folder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Arbitrary key to opaque value mapping attached to a record.
///
/// Values are stored type-erased and read back with [`Metadata::get`], which
/// returns `None` when the key is missing or holds a different type.
#[derive(Clone, Default)]
pub struct Metadata {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Metadata {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value under `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Reads a value of type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns `true` if a value of any type is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes the value under `key`, returning whether one existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Stored keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

/// A feature conforming to exactly one [`Schema`].
#[derive(Debug, Clone)]
pub struct Record {
    id: String,
    schema: Arc<Schema>,
    values: Vec<Value>,
    metadata: Metadata,
}

impl Record {
    /// Creates a record with every field set to [`Value::Null`] and no metadata.
    pub fn new(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.fields().len()];
        Self {
            id: id.into(),
            schema,
            values,
            metadata: Metadata::new(),
        }
    }

    /// Feature identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The schema this record conforms to.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values in schema field order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Reads a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    /// Value of the schema's default geometry field.
    #[must_use]
    pub fn default_geometry(&self) -> Option<&Value> {
        self.schema
            .default_geometry()
            .and_then(|field| self.get(field.name()))
    }

    /// Writes a field value by name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] if the schema has no such field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })?;
        self.values[index] = value.into();
        Ok(())
    }

    /// Writes `value` converted to the declared type of the field.
    ///
    /// See [`Value::convert_to`] for the conversion rules.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] if the schema has no such field.
    pub fn set_converted(&mut self, name: &str, value: &Value) -> Result<(), SchemaError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })?;
        self.values[index] = value.convert_to(self.schema.fields()[index].field_type());
        Ok(())
    }

    /// Builder-style variant of [`Record::set`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] if the schema has no such field.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, SchemaError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Iterates fields paired with their values.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.schema.fields().iter().zip(&self.values)
    }

    /// The metadata side-channel.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable access to the metadata side-channel.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use std::collections::BTreeMap;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("places")
                .add("Name", FieldType::text())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_new_record_is_all_null() {
        let record = Record::new("places.1", schema());
        assert_eq!(record.id(), "places.1");
        assert_eq!(record.get("Name"), Some(&Value::Null));
        assert!(record.metadata().is_empty());
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let mut record = Record::new("places.1", schema());
        let err = record.set("elevation", "120").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                schema: "places".to_string(),
                field: "elevation".to_string(),
            }
        );
    }

    #[test]
    fn test_set_converted_follows_field_type() {
        let schema = Arc::new(
            Schema::builder("summits")
                .add("Name", FieldType::text())
                .add("elevation", FieldType::Attribute(arrow_schema::DataType::Int64))
                .build()
                .unwrap(),
        );
        let mut record = Record::new("summits.1", schema);
        record.set_converted("elevation", &Value::from("4808")).unwrap();
        record.set_converted("Name", &Value::Integer(7)).unwrap();

        assert_eq!(record.get("elevation"), Some(&Value::Integer(4808)));
        assert_eq!(record.get("Name"), Some(&Value::from("7")));
        assert!(record.set_converted("capacity", &Value::Null).is_err());
    }

    #[test]
    fn test_metadata_typed_access() {
        let mut metadata = Metadata::new();
        metadata.insert(FOLDER_KEY, vec![Folder::new("Trails")]);
        let mut extended = BTreeMap::new();
        extended.insert("elevation".to_string(), "120".to_string());
        metadata.insert(EXTENDED_DATA_KEY, extended);

        let folders = metadata.get::<Vec<Folder>>(FOLDER_KEY).unwrap();
        assert_eq!(folders[0].name.as_deref(), Some("Trails"));
        assert!(metadata.get::<String>(FOLDER_KEY).is_none());
        assert_eq!(metadata.keys(), ["ExtendedData", "Folder"]);
        assert!(metadata.remove(FOLDER_KEY));
        assert_eq!(metadata.len(), 1);
    }
}
