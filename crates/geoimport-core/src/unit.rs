//! Import units: one dataset bound to its transform pipeline.

use std::sync::Arc;
use std::time::Instant;

use geoimport_core_common::{Record, Schema};
use log::{debug, warn};

use crate::error::{ImportError, IoError, Result};
use crate::handler::StoreHandle;
use crate::metrics::{MetricEncoder, MetricSink, MetricUnit};
use crate::transform::{TransformPipeline, UnitInfo};

/// Metric reporting how many records a unit produced.
pub const RECORDS_TRANSFORMED_METRIC: &str = "RecordsTransformed";

/// Metric reporting how long a unit took to transform, in milliseconds.
pub const TRANSFORM_TIME_METRIC: &str = "TransformTime";

/// Processing state of an [`ImportUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// The target schema has not been computed yet.
    Pending,
    /// The target schema is known and records can be transformed.
    Ready,
    /// A transform failed; the unit produces no further output.
    Failed,
}

/// A dataset discovered by a format handler, together with the transforms
/// that turn it into its canonical form.
///
/// The target schema is computed once, on first use, from the raw schema the
/// reader supplies. Any transform failure moves the unit to
/// [`UnitState::Failed`] for good.
#[derive(Debug)]
pub struct ImportUnit {
    name: String,
    store: StoreHandle,
    pipeline: TransformPipeline,
    target: Option<Arc<Schema>>,
    state: UnitState,
}

impl ImportUnit {
    /// Creates a pending unit.
    pub fn new(name: impl Into<String>, store: StoreHandle, pipeline: TransformPipeline) -> Self {
        Self {
            name: name.into(),
            store,
            pipeline,
            target: None,
            state: UnitState::Pending,
        }
    }

    /// Unit (layer) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the format the unit is read with.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.store.format
    }

    /// The source store.
    #[must_use]
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    #[must_use]
    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// The target schema, once computed.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.target.as_ref()
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            name: self.name.clone(),
            format: self.store.format.clone(),
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state == UnitState::Failed {
            return Err(IoError::UnitFailed {
                unit: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn fail(&mut self, error: ImportError) -> ImportError {
        warn!("Import unit '{}' failed: {error}", self.name);
        self.state = UnitState::Failed;
        error
    }

    /// Returns the target schema, computing it from `raw` on the first call.
    ///
    /// Later calls return the cached schema and ignore `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Transform`] if a schema transform fails, and
    /// [`IoError::UnitFailed`] once the unit has failed.
    pub fn target_schema(&mut self, raw: &Schema) -> Result<Arc<Schema>> {
        self.ensure_usable()?;
        if let Some(target) = &self.target {
            return Ok(Arc::clone(target));
        }

        debug!("Computing target schema of '{}'", self.name);
        match self.pipeline.compute_schema(&self.info(), &self.store, raw) {
            Ok(schema) => {
                let schema = Arc::new(schema);
                self.target = Some(Arc::clone(&schema));
                self.state = UnitState::Ready;
                Ok(schema)
            },
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Transforms one raw record into a record of the target schema.
    ///
    /// If the target schema is still pending, it is computed from the record's schema.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Transform`] if a transform fails, and
    /// [`IoError::UnitFailed`] once the unit has failed.
    pub fn transform_record(&mut self, raw: &Record) -> Result<Record> {
        let target = self.target_schema(raw.schema())?;
        match self
            .pipeline
            .transform_record(&self.info(), &self.store, raw, &target)
        {
            Ok(record) => Ok(record),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Transforms a complete dataset.
    ///
    /// Returns the target schema and every transformed record, or the first
    /// error. No records are returned when any of them fails.
    ///
    /// # Errors
    ///
    /// See [`Self::target_schema`] and [`Self::transform_record`].
    pub fn process<I>(&mut self, raw_schema: &Schema, records: I) -> Result<(Arc<Schema>, Vec<Record>)>
    where
        I: IntoIterator<Item = Record>,
    {
        let target = self.target_schema(raw_schema)?;
        let records = records
            .into_iter()
            .map(|raw| self.transform_record(&raw))
            .collect::<Result<Vec<_>>>()?;
        debug!("Transformed {} records of '{}'", records.len(), self.name);
        Ok((target, records))
    }

    /// Like [`Self::process`], and reports the record count and elapsed time
    /// to `sink` on success.
    ///
    /// Failing to deliver a measurement is logged and does not fail the unit.
    ///
    /// # Errors
    ///
    /// See [`Self::process`].
    pub fn process_with_metrics<I>(
        &mut self,
        raw_schema: &Schema,
        records: I,
        encoder: &MetricEncoder,
        sink: &dyn MetricSink,
    ) -> Result<(Arc<Schema>, Vec<Record>)>
    where
        I: IntoIterator<Item = Record>,
    {
        let started = Instant::now();
        let output = self.process(raw_schema, records)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        #[allow(clippy::cast_precision_loss)]
        let measurements = [
            encoder.encode(
                RECORDS_TRANSFORMED_METRIC,
                output.1.len() as f64,
                MetricUnit::Count,
            ),
            encoder.encode(TRANSFORM_TIME_METRIC, elapsed_ms, MetricUnit::Milliseconds),
        ];
        for measurement in measurements {
            if let Err(e) = sink.record(measurement) {
                warn!("Could not record metrics for '{}': {e:#}", self.name);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::metrics::MemorySink;
    use crate::transform::{RecordTransform, SchemaTransform, Transform};
    use geoimport_core_common::FieldType;

    /// Rejects records whose `name` is `"bad"`.
    #[derive(Debug)]
    struct RejectBad;

    impl Transform for RejectBad {
        fn name(&self) -> &str {
            "RejectBad"
        }

        fn as_record_transform(&self) -> Option<&dyn RecordTransform> {
            Some(self)
        }
    }

    impl RecordTransform for RejectBad {
        fn apply(
            &self,
            _unit: &UnitInfo,
            _store: &StoreHandle,
            old: &Record,
            new: Record,
        ) -> anyhow::Result<Record> {
            if old.get("name").and_then(|v| v.as_text()) == Some("bad") {
                anyhow::bail!("bad record {}", old.id());
            }
            Ok(new)
        }
    }

    #[derive(Debug)]
    struct Counting(std::sync::atomic::AtomicUsize);

    impl Transform for Counting {
        fn name(&self) -> &str {
            "Counting"
        }

        fn as_schema_transform(&self) -> Option<&dyn SchemaTransform> {
            Some(self)
        }
    }

    impl SchemaTransform for Counting {
        fn apply(&self, _: &UnitInfo, _: &StoreHandle, schema: Schema) -> anyhow::Result<Schema> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(schema)
        }
    }

    fn store() -> StoreHandle {
        StoreHandle {
            name: "towns".to_string(),
            format: "CSV".to_string(),
            workspace: None,
            connection: Default::default(),
        }
    }

    fn raw_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("towns")
                .add("name", FieldType::text())
                .build()
                .unwrap(),
        )
    }

    fn record(schema: &Arc<Schema>, id: &str, name: &str) -> Record {
        Record::new(id, Arc::clone(schema)).with("name", name).unwrap()
    }

    #[test]
    fn test_schema_is_computed_once() {
        let counting = Arc::new(Counting(Default::default()));
        let mut unit = ImportUnit::new(
            "towns",
            store(),
            TransformPipeline::new().with(counting.clone()),
        );
        assert_eq!(unit.state(), UnitState::Pending);
        assert!(unit.schema().is_none());

        let raw = raw_schema();
        unit.target_schema(&raw).unwrap();
        unit.transform_record(&record(&raw, "towns.1", "Lyon")).unwrap();
        unit.target_schema(&raw).unwrap();

        assert_eq!(counting.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(unit.state(), UnitState::Ready);
    }

    #[test]
    fn test_failure_yields_no_partial_output() {
        let mut unit = ImportUnit::new(
            "towns",
            store(),
            TransformPipeline::new().with(Arc::new(RejectBad)),
        );
        let raw = raw_schema();
        let records = vec![
            record(&raw, "towns.1", "Lyon"),
            record(&raw, "towns.2", "bad"),
            record(&raw, "towns.3", "Nice"),
        ];

        let err = unit.process(&raw, records).unwrap_err();
        assert!(matches!(err, ImportError::Io(IoError::Transform { .. })));
        assert_eq!(unit.state(), UnitState::Failed);

        let again = unit.transform_record(&record(&raw, "towns.4", "Metz")).unwrap_err();
        assert!(matches!(again, ImportError::Io(IoError::UnitFailed { .. })));
    }

    #[test]
    fn test_process_with_metrics_reports_count_and_time() {
        let mut unit = ImportUnit::new("towns", store(), TransformPipeline::new());
        let raw = raw_schema();
        let sink = MemorySink::new();
        let encoder = MetricEncoder::new(MetricsConfig::default());

        let (schema, records) = unit
            .process_with_metrics(
                &raw,
                vec![record(&raw, "towns.1", "Lyon"), record(&raw, "towns.2", "Nice")],
                &encoder,
                &sink,
            )
            .unwrap();
        assert_eq!(schema.as_ref(), raw.as_ref());
        assert_eq!(records.len(), 2);

        let measurements = sink.take();
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].name, RECORDS_TRANSFORMED_METRIC);
        assert_eq!(measurements[0].value, 2.0);
        assert_eq!(measurements[0].unit, MetricUnit::Count);
        assert_eq!(measurements[1].name, TRANSFORM_TIME_METRIC);
        assert_eq!(measurements[1].unit, MetricUnit::Milliseconds);
    }
}
