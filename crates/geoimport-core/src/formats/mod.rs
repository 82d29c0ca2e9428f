//! Built-in format handlers and store factories.
//!
//! - [`KmlFileFormat`]: KML documents, registered for the `kml` extension.
//! - [`DataStoreFormat`]: wraps a [`DataStoreFactory`] for tabular/vector stores.
//! - [`GridFormatHandler`]: wraps a [`GridFormat`] for raster files.

mod grid;
mod kml;
mod vector;

pub use grid::{
    GeoTiffFormat, GridFormat, GridFormatHandler, UnknownFormat, WorldImageFormat,
    builtin_grid_formats,
};
pub use kml::{KML_CRS, KmlFileFormat};
pub use vector::{DataStoreFactory, DataStoreFormat, FileStoreFactory, builtin_data_stores};

use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};
use geoimport_core_common::{ConnectionParams, FileDescriptor, InputDescriptor};
use log::debug;

use crate::error::IoError;
use crate::handler::{ProgressMonitor, StoreHandle, URL_PARAM, UnitStream};
use crate::registry::{FormatRegistry, handler_factory};
use crate::unit::ImportUnit;

/// Registers the built-in extension mappings with `registry`.
///
/// This is called once at startup, before any resolution happens.
pub fn register_builtin_formats(registry: &FormatRegistry) {
    debug!("Registering built-in formats");
    registry.register("kml", handler_factory(|| Ok(Arc::new(KmlFileFormat))));
}

/// Returns the file reference of `input`, or an error naming `format` for
/// connection inputs.
pub(crate) fn require_file(input: &InputDescriptor, format: &str) -> anyhow::Result<FileDescriptor> {
    input
        .as_file()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("The {format} format reads files, but got {input}"))
}

/// Name used for stores and units read from `file`.
pub(crate) fn file_base_name(file: &FileDescriptor) -> anyhow::Result<String> {
    file.stem().map(str::to_string).ok_or_else(|| {
        IoError::InvalidPath {
            path: file.path().to_path_buf(),
            reason: "the file name is not valid UTF-8 or is empty".to_string(),
        }
        .into()
    })
}

/// Source store handle for a file read by `format`.
pub(crate) fn file_source_store(file: &FileDescriptor, format: &str) -> anyhow::Result<StoreHandle> {
    let mut connection = ConnectionParams::new();
    connection.insert(URL_PARAM.to_string(), file.path().display().to_string());
    Ok(StoreHandle {
        name: file_base_name(file)?,
        format: format.to_string(),
        workspace: None,
        connection,
    })
}

/// Streams one unit per item, building each as it is read.
///
/// `progress` is asked before every unit; once it reports cancellation the
/// stream ends.
pub(crate) fn lazy_units<'a, I, F>(
    items: I,
    progress: &'a dyn ProgressMonitor,
    mut make_unit: F,
) -> UnitStream<'a>
where
    I: IntoIterator,
    I::IntoIter: Send + 'a,
    I::Item: Send + 'a,
    F: FnMut(I::Item) -> ImportUnit + Send + 'a,
{
    stream::iter(items)
        .take_while(move |_| {
            let canceled = progress.is_canceled();
            if canceled {
                debug!("Unit enumeration canceled");
            }
            future::ready(!canceled)
        })
        .map(move |item| Ok(make_unit(item)))
        .boxed()
}
