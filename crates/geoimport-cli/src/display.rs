//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures for presenting the formats a
//! [`FormatResolver`] knows about.

use tabled::{Table, Tabled};

use geoimport_core::resolver::FormatResolver;

/// Table row for an extension registered in the format registry.
#[derive(Tabled)]
pub struct ExtensionRow {
    #[tabled(rename = "Extension")]
    pub extension: String,
    /// Name of the handler the extension maps to.
    #[tabled(rename = "Handler")]
    pub handler: String,
}

/// Table row for a vector store factory.
#[derive(Tabled)]
pub struct StoreRow {
    #[tabled(rename = "Store")]
    pub name: String,
    /// Comma separated file extensions.
    #[tabled(rename = "Extensions")]
    pub extensions: String,
}

/// Table row for a grid format.
#[derive(Tabled)]
pub struct GridRow {
    #[tabled(rename = "Grid Format")]
    pub name: String,
    /// `Yes` for the format that wins ambiguous matches.
    #[tabled(rename = "Preferred")]
    pub preferred: String,
}

/// Rows for the registered extensions.
///
/// Handlers that fail to construct are listed as `(unavailable)`.
pub fn extension_rows(resolver: &FormatResolver) -> Vec<ExtensionRow> {
    let registry = resolver.registry();
    registry
        .extensions()
        .into_iter()
        .map(|extension| {
            let handler = registry
                .lookup(&extension)
                .and_then(|factory| factory.create().ok())
                .map_or_else(|| "(unavailable)".to_string(), |h| h.name().to_string());
            ExtensionRow { extension, handler }
        })
        .collect()
}

/// Rows for the vector store factories.
pub fn store_rows(resolver: &FormatResolver) -> Vec<StoreRow> {
    resolver
        .data_stores()
        .iter()
        .map(|factory| StoreRow {
            name: factory.display_name().to_string(),
            extensions: factory.file_extensions().join(", "),
        })
        .collect()
}

/// Rows for the grid formats, leaving out the unknown sentinel.
pub fn grid_rows(resolver: &FormatResolver) -> Vec<GridRow> {
    let preferred = &resolver.config().preferred_grid_format;
    resolver
        .grid_formats()
        .iter()
        .filter(|format| !format.is_unknown())
        .map(|format| GridRow {
            name: format.name().to_string(),
            preferred: if format.name() == preferred { "Yes" } else { "No" }.to_string(),
        })
        .collect()
}

/// Prints every format `resolver` can resolve to, as tables on standard output.
pub fn display_formats(resolver: &FormatResolver) {
    let extensions = extension_rows(resolver);
    println!("\nRegistered Extensions ({} total):\n", extensions.len());
    println!("{}", Table::new(extensions));

    let stores = store_rows(resolver);
    println!("\nVector Stores ({} total):\n", stores.len());
    println!("{}", Table::new(stores));

    let grids = grid_rows(resolver);
    println!("\nGrid Formats ({} total):\n", grids.len());
    println!("{}", Table::new(grids));
}
