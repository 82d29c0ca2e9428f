//! Raster (grid coverage) formats.

use std::any::Any;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use geoimport_core_common::{InputDescriptor, normalize_extension};

use crate::handler::{
    Catalog, Destination, FormatHandler, ProgressMonitor, StoreHandle, UnitStream, unique_name,
};
use crate::transform::TransformPipeline;
use crate::unit::ImportUnit;

use super::{file_source_store, lazy_units, require_file};

/// A raster format that can recognize files it reads.
pub trait GridFormat: Send + Sync + fmt::Debug {
    /// Display name of the format.
    fn name(&self) -> &str;

    /// Checks whether the file at `path` is in this format.
    fn can_read(&self, path: &Path) -> bool;

    /// Returns `true` for the catch-all format that stands for "no format".
    fn is_unknown(&self) -> bool {
        false
    }
}

/// TIFF and BigTIFF files, recognized by their byte-order header.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffFormat;

const TIFF_MAGIC: [[u8; 4]; 4] = [*b"II*\0", *b"MM\0*", *b"II+\0", *b"MM\0+"];

fn read_header(path: &Path) -> Option<[u8; 4]> {
    let mut file = File::open(path).ok()?;
    let mut header = [0_u8; 4];
    file.read_exact(&mut header).ok()?;
    Some(header)
}

impl GridFormat for GeoTiffFormat {
    fn name(&self) -> &str {
        "GeoTIFF"
    }

    fn can_read(&self, path: &Path) -> bool {
        read_header(path).is_some_and(|header| TIFF_MAGIC.contains(&header))
    }
}

/// Plain images georeferenced by a sibling world file.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldImageFormat;

const WORLD_IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg", "gif", "bmp"];

/// Candidate world file extensions for an image extension.
///
/// `tif` gives `tfw`, `tifw` and `wld`.
fn world_file_extensions(extension: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(3);
    let mut chars = extension.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        candidates.push(format!("{first}{last}w"));
    }
    candidates.push(format!("{extension}w"));
    candidates.push("wld".to_string());
    candidates
}

fn world_file(path: &Path) -> Option<PathBuf> {
    let extension = normalize_extension(path.extension()?.to_str()?);
    world_file_extensions(&extension)
        .into_iter()
        .flat_map(|ext| [ext.to_uppercase(), ext])
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

impl GridFormat for WorldImageFormat {
    fn name(&self) -> &str {
        "WorldImage"
    }

    fn can_read(&self, path: &Path) -> bool {
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| WORLD_IMAGE_EXTENSIONS.contains(&normalize_extension(ext).as_str()));
        supported && path.is_file() && world_file(path).is_some()
    }
}

/// The catch-all format reported when nothing else matches.
///
/// It accepts every file, and the resolver treats it as no match.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownFormat;

impl GridFormat for UnknownFormat {
    fn name(&self) -> &str {
        "Unknown Format"
    }

    fn can_read(&self, _path: &Path) -> bool {
        true
    }

    fn is_unknown(&self) -> bool {
        true
    }
}

/// The grid formats known out of the box, unknown sentinel last.
#[must_use]
pub fn builtin_grid_formats() -> Vec<Arc<dyn GridFormat>> {
    vec![
        Arc::new(GeoTiffFormat),
        Arc::new(WorldImageFormat),
        Arc::new(UnknownFormat),
    ]
}

/// Exposes a [`GridFormat`] as a [`FormatHandler`] producing one coverage unit per file.
#[derive(Debug, Clone)]
pub struct GridFormatHandler {
    format: Arc<dyn GridFormat>,
}

impl GridFormatHandler {
    /// Wraps `format`.
    pub fn new(format: Arc<dyn GridFormat>) -> Self {
        Self { format }
    }

    /// The wrapped format.
    #[must_use]
    pub fn format(&self) -> &Arc<dyn GridFormat> {
        &self.format
    }
}

#[async_trait]
impl FormatHandler for GridFormatHandler {
    fn name(&self) -> &str {
        self.format.name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn can_read(&self, input: &InputDescriptor) -> Result<bool> {
        Ok(input
            .as_file()
            .is_some_and(|file| !self.format.is_unknown() && self.format.can_read(file.path())))
    }

    async fn create_store(
        &self,
        input: &InputDescriptor,
        destination: &Destination,
    ) -> Result<StoreHandle> {
        let file = require_file(input, self.name())?;
        let mut store = file_source_store(&file, self.name())?;
        store.workspace = Some(destination.workspace.clone());
        Ok(store)
    }

    async fn list_units<'a>(
        &'a self,
        input: &'a InputDescriptor,
        catalog: &'a dyn Catalog,
        progress: &'a dyn ProgressMonitor,
    ) -> Result<UnitStream<'a>> {
        let file = require_file(input, self.name())?;
        progress.set_task(&format!("Listing coverage {}", file.path().display()));

        let store = file_source_store(&file, self.name())?;
        Ok(lazy_units([store], progress, move |store| {
            let name = unique_name(catalog, &store.name);
            ImportUnit::new(name, store, TransformPipeline::new())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{EmptyCatalog, NullProgress};
    use futures::TryStreamExt;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_geotiff_sniffs_byte_order_header() {
        let dir = TempDir::new().unwrap();
        let little = write(&dir, "a.tif", b"II*\0rest");
        let big = write(&dir, "b.dat", b"MM\0*rest");
        let png = write(&dir, "c.tif", b"\x89PNG\r\n");
        let short = write(&dir, "d.tif", b"II");

        assert!(GeoTiffFormat.can_read(&little));
        assert!(GeoTiffFormat.can_read(&big));
        assert!(!GeoTiffFormat.can_read(&png));
        assert!(!GeoTiffFormat.can_read(&short));
        assert!(!GeoTiffFormat.can_read(&dir.path().join("missing.tif")));
    }

    #[test]
    fn test_world_file_extensions() {
        assert_eq!(world_file_extensions("tif"), ["tfw", "tifw", "wld"]);
        assert_eq!(world_file_extensions("jpeg"), ["jgw", "jpegw", "wld"]);
    }

    #[test]
    fn test_world_image_needs_sidecar() {
        let dir = TempDir::new().unwrap();
        let image = write(&dir, "scan.png", b"\x89PNG\r\n");
        assert!(!WorldImageFormat.can_read(&image));

        write(&dir, "scan.pgw", b"1\n0\n0\n-1\n0\n0\n");
        assert!(WorldImageFormat.can_read(&image));

        let text = write(&dir, "notes.txt", b"hello");
        write(&dir, "notes.wld", b"1\n0\n0\n-1\n0\n0\n");
        assert!(!WorldImageFormat.can_read(&text));
    }

    #[tokio::test]
    async fn test_unknown_handler_never_claims_input() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write(&dir, "blob.bin", b"\0\0");
        let handler = GridFormatHandler::new(Arc::new(UnknownFormat));
        assert!(UnknownFormat.can_read(&path));
        assert!(!handler.can_read(&InputDescriptor::file(&path)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_coverage_unit() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write(&dir, "dem.tif", b"II*\0");
        let handler = GridFormatHandler::new(Arc::new(GeoTiffFormat));
        assert!(handler.can_read(&InputDescriptor::file(&path)).await?);

        let units: Vec<ImportUnit> = handler
            .list_units(&InputDescriptor::file(&path), &EmptyCatalog, &NullProgress)
            .await?
            .try_collect()
            .await?;
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name(), "dem");
        assert_eq!(units[0].format(), "GeoTIFF");
        Ok(())
    }
}
