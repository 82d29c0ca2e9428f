//! `geoimport-core` decides how heterogeneous geospatial inputs are read and
//! reshapes what they contain into a canonical form ready for storage.
//!
//! This crate includes:
//! - **Format registry** ([`registry`]): the extension to handler mapping written at startup.
//! - **Format resolution** ([`resolver`]): the fallback chain selecting one
//!   [`handler::FormatHandler`] per input, including the grid format tie-break.
//! - **Built-in formats** ([`formats`]): KML, file-based vector stores and raster formats.
//! - **Transforms** ([`transform`]): schema and record capabilities, the ordered
//!   [`transform::TransformPipeline`] and the KML folder transform.
//! - **Import units** ([`unit`]): one dataset bound to its pipeline and target schema.
//! - **Metrics** ([`metrics`]): measurement encoding for external monitoring.
//!
//! Reading the data itself is left to the format handlers; this crate only
//! dispatches to them and transforms what they produce.

pub mod config;
pub mod error;
pub mod formats;
pub mod handler;
pub mod metrics;
pub mod registry;
pub mod resolver;
pub mod transform;
pub mod unit;
