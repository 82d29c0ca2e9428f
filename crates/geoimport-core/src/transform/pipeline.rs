//! Ordered transform execution for one import unit.

use std::sync::Arc;

use geoimport_core_common::{Record, Schema};
use log::debug;

use crate::error::{IoError, Result, TransformPhase};
use crate::handler::StoreHandle;

use super::{Transform, UnitInfo, copy_attributes};

/// An ordered list of transforms.
///
/// The schema pass runs every [`super::SchemaTransform`] in order, each receiving
/// the previous output. The record pass seeds a fresh record with
/// [`copy_attributes`] and then runs every [`super::RecordTransform`] in the same
/// order. Transforms lacking a capability are skipped in that pass.
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transform, builder style.
    #[must_use]
    pub fn with(mut self, transform: Arc<dyn Transform>) -> Self {
        self.push(transform);
        self
    }

    /// Appends a transform.
    pub fn push(&mut self, transform: Arc<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Transforms in execution order.
    #[must_use]
    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }

    /// Number of transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` if the pipeline holds no transforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Runs the schema pass over `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Transform`] for the first transform that fails.
    pub fn compute_schema(
        &self,
        unit: &UnitInfo,
        store: &StoreHandle,
        raw: &Schema,
    ) -> Result<Schema> {
        let mut schema = raw.clone();
        for transform in &self.transforms {
            let Some(schema_transform) = transform.as_schema_transform() else {
                continue;
            };
            debug!("Applying schema transform '{}' to '{}'", transform.name(), unit.name);
            schema = schema_transform
                .apply(unit, store, schema)
                .map_err(|e| failure(unit, transform.as_ref(), TransformPhase::Schema, e))?;
        }
        Ok(schema)
    }

    /// Runs the record pass over `raw`, producing a record of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Transform`] for the first transform that fails or that
    /// returns a record of a different schema.
    pub fn transform_record(
        &self,
        unit: &UnitInfo,
        store: &StoreHandle,
        raw: &Record,
        target: &Arc<Schema>,
    ) -> Result<Record> {
        let mut record = Record::new(raw.id(), Arc::clone(target));
        copy_attributes(raw, &mut record)?;

        for transform in &self.transforms {
            let Some(record_transform) = transform.as_record_transform() else {
                continue;
            };
            record = record_transform
                .apply(unit, store, raw, record)
                .map_err(|e| failure(unit, transform.as_ref(), TransformPhase::Record, e))?;

            if !Arc::ptr_eq(record.schema(), target) && record.schema() != target {
                return Err(failure(
                    unit,
                    transform.as_ref(),
                    TransformPhase::Record,
                    anyhow::anyhow!(
                        "returned a record of schema '{}' instead of '{}'",
                        record.schema().name(),
                        target.name()
                    ),
                ));
            }
        }
        Ok(record)
    }
}

fn failure(
    unit: &UnitInfo,
    transform: &dyn Transform,
    phase: TransformPhase,
    source: anyhow::Error,
) -> crate::error::ImportError {
    IoError::Transform {
        unit: unit.name.clone(),
        transform: transform.name().to_string(),
        phase,
        source: source.into(),
    }
    .into()
}
