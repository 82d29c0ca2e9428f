//! KML document handler.

use std::any::Any;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use geoimport_core_common::InputDescriptor;
use log::debug;

use crate::handler::{
    Catalog, Destination, FormatHandler, ProgressMonitor, StoreHandle, UnitStream, unique_name,
};
use crate::transform::{KmlFolderTransform, TransformPipeline};
use crate::unit::ImportUnit;

use super::{file_source_store, lazy_units, require_file};

/// Coordinate reference system of every KML document (WGS 84 longitude/latitude).
pub const KML_CRS: &str = "EPSG:4326";

const NAME: &str = "KML";

/// Reads `.kml` documents as a single vector unit.
///
/// Each unit flattens placemark folders, styles and extended data through
/// [`KmlFolderTransform`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KmlFileFormat;

#[async_trait]
impl FormatHandler for KmlFileFormat {
    fn name(&self) -> &str {
        NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn can_read(&self, input: &InputDescriptor) -> Result<bool> {
        let Some(file) = input.as_file() else {
            return Ok(false);
        };
        if file.extension() != Some("kml") {
            return Ok(false);
        }
        Ok(tokio::fs::metadata(file.path())
            .await
            .is_ok_and(|m| m.is_file()))
    }

    async fn create_store(
        &self,
        input: &InputDescriptor,
        destination: &Destination,
    ) -> Result<StoreHandle> {
        let file = require_file(input, NAME)?;
        let mut store = file_source_store(&file, NAME)?;
        store.workspace = Some(destination.workspace.clone());
        Ok(store)
    }

    async fn list_units<'a>(
        &'a self,
        input: &'a InputDescriptor,
        catalog: &'a dyn Catalog,
        progress: &'a dyn ProgressMonitor,
    ) -> Result<UnitStream<'a>> {
        let file = require_file(input, NAME)?;
        progress.set_task(&format!("Listing KML document {}", file.path().display()));

        let store = file_source_store(&file, NAME)?;
        Ok(lazy_units([store], progress, move |store| {
            let name = unique_name(catalog, &store.name);
            debug!("KML document {} becomes unit '{name}'", file.path().display());
            let pipeline = TransformPipeline::new().with(Arc::new(KmlFolderTransform));
            ImportUnit::new(name, store, pipeline)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Destination, EmptyCatalog, NullProgress};
    use futures::TryStreamExt;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_kml(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#).unwrap();
        path
    }

    #[tokio::test]
    async fn test_can_read_existing_kml_only() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_kml(&dir, "trails.KML");

        assert!(KmlFileFormat.can_read(&InputDescriptor::file(&path)).await?);
        assert!(
            !KmlFileFormat
                .can_read(&InputDescriptor::file(dir.path().join("missing.kml")))
                .await?
        );
        assert!(
            !KmlFileFormat
                .can_read(&InputDescriptor::connection([("dbtype", "postgis")]))
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_store_targets_destination() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_kml(&dir, "trails.kml");
        let store = KmlFileFormat
            .create_store(&InputDescriptor::file(&path), &Destination::new("hiking"))
            .await?;
        assert_eq!(store.name, "trails");
        assert_eq!(store.format, "KML");
        assert_eq!(store.workspace.as_deref(), Some("hiking"));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_units_yields_one_kml_unit() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_kml(&dir, "trails.kml");
        let units: Vec<ImportUnit> = KmlFileFormat
            .list_units(&InputDescriptor::file(&path), &EmptyCatalog, &NullProgress)
            .await?
            .try_collect()
            .await?;

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name(), "trails");
        assert_eq!(units[0].format(), "KML");
        assert_eq!(units[0].pipeline().len(), 1);
        assert_eq!(units[0].pipeline().transforms()[0].name(), "KmlFolderTransform");
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_input_is_rejected() {
        let input = InputDescriptor::connection([("dbtype", "postgis")]);
        let result = KmlFileFormat
            .list_units(&input, &EmptyCatalog, &NullProgress)
            .await;
        assert!(result.is_err());
    }
}
