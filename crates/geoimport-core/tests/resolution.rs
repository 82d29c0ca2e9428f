use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use geoimport_core::error::{FormatError, ImportError};
use geoimport_core::formats::{
    DataStoreFormat, GeoTiffFormat, GridFormat, GridFormatHandler, KmlFileFormat, UnknownFormat,
    WorldImageFormat, builtin_data_stores, register_builtin_formats,
};
use geoimport_core::registry::FormatRegistry;
use geoimport_core::resolver::FormatResolver;
use geoimport_core_common::InputDescriptor;
use tempfile::TempDir;

/// A grid format claiming every `.png` file.
#[derive(Debug)]
struct PngSniffer(&'static str);

impl GridFormat for PngSniffer {
    fn name(&self) -> &str {
        self.0
    }

    fn can_read(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "png")
    }
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn builtin_resolver() -> FormatResolver {
    let registry = Arc::new(FormatRegistry::new());
    register_builtin_formats(&registry);
    let mut resolver = FormatResolver::new(registry)
        .with_grid_format(Arc::new(GeoTiffFormat))
        .with_grid_format(Arc::new(WorldImageFormat))
        .with_grid_format(Arc::new(UnknownFormat));
    for factory in builtin_data_stores() {
        resolver = resolver.with_data_store(factory);
    }
    resolver
}

/// Test that a registered extension resolves to the mapped handler type
#[test]
fn test_registered_extension_resolves_to_mapped_handler() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "trails.kml", b"<kml/>");

    let handler = builtin_resolver()
        .resolve(&InputDescriptor::file(&path))?
        .expect("kml should resolve");
    assert!(handler.as_any().downcast_ref::<KmlFileFormat>().is_some());
    Ok(())
}

/// Test that an unregistered extension claimed by one vector store resolves to that store
#[test]
fn test_single_vector_store_claims_extension() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "roads.shp", b"\0\0\x27\x0a");

    let handler = builtin_resolver()
        .resolve(&InputDescriptor::file(&path))?
        .expect("shp should resolve");
    let format = handler
        .as_any()
        .downcast_ref::<DataStoreFormat>()
        .expect("vector handler");
    assert_eq!(format.factory().display_name(), "ESRI Shapefile");
    Ok(())
}

/// Test that GeoTIFF wins over WorldImage for a TIFF with a world file
#[test]
fn test_geotiff_is_preferred_over_world_image() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "dem.tif", b"II*\0\x08\0\0\0");
    write(&dir, "dem.tfw", b"30\n0\n0\n-30\n500000\n4100000\n");

    let resolver = builtin_resolver();
    assert!(WorldImageFormat.can_read(&path));
    assert!(GeoTiffFormat.can_read(&path));

    let handler = resolver
        .resolve(&InputDescriptor::file(&path))?
        .expect("tif should resolve");
    let grid = handler
        .as_any()
        .downcast_ref::<GridFormatHandler>()
        .expect("grid handler");
    assert_eq!(grid.format().name(), "GeoTIFF");
    Ok(())
}

/// Test that two non-preferred grid candidates are reported as ambiguous
#[test]
fn test_ambiguous_grid_formats_fail() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "scan.png", b"\x89PNG\r\n\x1a\n");
    write(&dir, "scan.pgw", b"1\n0\n0\n-1\n0\n0\n");

    let resolver = builtin_resolver().with_grid_format(Arc::new(PngSniffer("PNGPlus")));
    let err = resolver
        .resolve(&InputDescriptor::file(&path))
        .expect_err("two candidates and no GeoTIFF");

    match err {
        ImportError::Format(FormatError::Ambiguous { candidates, .. }) => {
            assert_eq!(candidates, ["WorldImage", "PNGPlus"]);
        },
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

/// Test that a file only the unknown sentinel accepts is not resolved
#[test]
fn test_unknown_only_is_no_resolution() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "notes.txt", b"just text");

    assert!(builtin_resolver().resolve(&InputDescriptor::file(&path))?.is_none());
    Ok(())
}

/// Test that the global registry comes with the built-in formats
#[test]
fn test_builtin_resolver_uses_global_registry() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(&dir, "trails.kml", b"<kml/>");

    let resolver = FormatResolver::with_builtin_formats();
    assert_eq!(resolver.registry().extensions(), ["kml"]);
    let handler = resolver.resolve(&InputDescriptor::file(&path))?;
    assert_eq!(handler.map(|h| h.name().to_string()).as_deref(), Some("KML"));
    Ok(())
}
