//! Vector store factories and the handler that adapts them.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use geoimport_core_common::{ConnectionParams, FileDescriptor, InputDescriptor, normalize_extension};
use log::debug;

use crate::handler::{
    Catalog, Destination, FormatHandler, ProgressMonitor, StoreHandle, URL_PARAM, UnitStream,
    unique_name,
};
use crate::transform::TransformPipeline;
use crate::unit::ImportUnit;

use super::{file_base_name, lazy_units};

/// Connection parameters that name a database-backed store, checked in order.
const STORE_NAME_PARAMS: &[&str] = &["database", "dbname", "namespace"];

/// A factory for one kind of vector data store.
///
/// Factories are discovered by the resolver when no registered handler
/// matches an input. A factory claims an input through
/// [`DataStoreFactory::can_process`] on the connection parameters derived from it.
pub trait DataStoreFactory: Send + Sync + fmt::Debug {
    /// Display name of the store kind.
    fn display_name(&self) -> &str;

    /// Lowercase file extensions the factory reads, without leading dot.
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Returns `true` if `extension` is one of [`Self::file_extensions`].
    fn supports_extension(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        self.file_extensions().iter().any(|e| *e == extension)
    }

    /// Checks whether a store can be opened with `params`.
    fn can_process(&self, params: &ConnectionParams) -> bool;

    /// Connection parameters for `input`.
    ///
    /// Files map to a single [`URL_PARAM`] entry; connection inputs are passed through.
    fn connection_params(&self, input: &InputDescriptor) -> ConnectionParams {
        match input {
            InputDescriptor::File(file) => {
                let mut params = ConnectionParams::new();
                params.insert(URL_PARAM.to_string(), file.path().display().to_string());
                params
            },
            InputDescriptor::Connection(params) => params.clone(),
        }
    }

    /// Names of the feature types the store holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    fn type_names(&self, params: &ConnectionParams) -> Result<Vec<String>>;
}

/// A single-file store holding one feature type named after the file.
#[derive(Debug, Clone)]
pub struct FileStoreFactory {
    display_name: String,
    extensions: Vec<&'static str>,
}

impl FileStoreFactory {
    /// Creates a factory for files with the given extensions.
    pub fn new(display_name: impl Into<String>, extensions: &[&'static str]) -> Self {
        Self {
            display_name: display_name.into(),
            extensions: extensions.to_vec(),
        }
    }

    fn file(params: &ConnectionParams) -> Option<FileDescriptor> {
        params.get(URL_PARAM).map(FileDescriptor::new)
    }
}

impl DataStoreFactory for FileStoreFactory {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn file_extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn can_process(&self, params: &ConnectionParams) -> bool {
        Self::file(params)
            .and_then(|file| file.extension().map(|ext| self.supports_extension(ext)))
            .unwrap_or(false)
    }

    fn type_names(&self, params: &ConnectionParams) -> Result<Vec<String>> {
        let file = Self::file(params)
            .ok_or_else(|| anyhow!("{} store needs a '{URL_PARAM}' parameter", self.display_name))?;
        Ok(vec![file_base_name(&file)?])
    }
}

/// The vector store factories known out of the box.
#[must_use]
pub fn builtin_data_stores() -> Vec<Arc<dyn DataStoreFactory>> {
    vec![
        Arc::new(FileStoreFactory::new("ESRI Shapefile", &["shp"])),
        Arc::new(FileStoreFactory::new("GeoJSON", &["geojson", "json"])),
        Arc::new(FileStoreFactory::new("CSV", &["csv"])),
    ]
}

/// Exposes a [`DataStoreFactory`] as a [`FormatHandler`].
///
/// Each feature type of the store becomes one import unit with an empty
/// transform pipeline.
#[derive(Debug, Clone)]
pub struct DataStoreFormat {
    factory: Arc<dyn DataStoreFactory>,
}

impl DataStoreFormat {
    /// Wraps `factory`.
    pub fn new(factory: Arc<dyn DataStoreFactory>) -> Self {
        Self { factory }
    }

    /// The wrapped factory.
    #[must_use]
    pub fn factory(&self) -> &Arc<dyn DataStoreFactory> {
        &self.factory
    }

    fn store_name(&self, input: &InputDescriptor) -> Result<String> {
        match input {
            InputDescriptor::File(file) => file_base_name(file),
            InputDescriptor::Connection(params) => Ok(STORE_NAME_PARAMS
                .iter()
                .find_map(|key| params.get(*key))
                .cloned()
                .unwrap_or_else(|| self.factory.display_name().to_lowercase())),
        }
    }

    fn source_store(&self, input: &InputDescriptor) -> Result<StoreHandle> {
        Ok(StoreHandle {
            name: self.store_name(input)?,
            format: self.factory.display_name().to_string(),
            workspace: None,
            connection: self.factory.connection_params(input),
        })
    }
}

/// Names handed out during one enumeration, on top of the catalog's layers.
struct Reserved<'a> {
    catalog: &'a dyn Catalog,
    taken: HashSet<String>,
}

impl Reserved<'_> {
    fn claim(&mut self, base: &str) -> String {
        let name = unique_name(self, base);
        self.taken.insert(name.clone());
        name
    }
}

impl Catalog for Reserved<'_> {
    fn layer_exists(&self, name: &str) -> bool {
        self.catalog.layer_exists(name) || self.taken.contains(name)
    }
}

#[async_trait]
impl FormatHandler for DataStoreFormat {
    fn name(&self) -> &str {
        self.factory.display_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn can_read(&self, input: &InputDescriptor) -> Result<bool> {
        Ok(self.factory.can_process(&self.factory.connection_params(input)))
    }

    async fn create_store(
        &self,
        input: &InputDescriptor,
        destination: &Destination,
    ) -> Result<StoreHandle> {
        let mut store = self.source_store(input)?;
        store.workspace = Some(destination.workspace.clone());
        Ok(store)
    }

    async fn list_units<'a>(
        &'a self,
        input: &'a InputDescriptor,
        catalog: &'a dyn Catalog,
        progress: &'a dyn ProgressMonitor,
    ) -> Result<UnitStream<'a>> {
        let store = self.source_store(input)?;
        progress.set_task(&format!("Listing {} store '{}'", self.name(), store.name));

        let type_names = self.factory.type_names(&store.connection)?;
        debug!("Store '{}' holds {} type(s)", store.name, type_names.len());
        let mut reserved = Reserved {
            catalog,
            taken: HashSet::new(),
        };

        Ok(lazy_units(type_names, progress, move |type_name| {
            let name = reserved.claim(&type_name);
            ImportUnit::new(name, store.clone(), TransformPipeline::new())
        }))
    }
}
