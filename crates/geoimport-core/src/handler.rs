//! The format handler boundary.
//!
//! A [`FormatHandler`] knows how to read one kind of input. The engine selects a
//! handler through [`crate::resolver::FormatResolver`] and then uses it to create
//! the storage target and enumerate the importable units the input contains.
//! Handlers perform the I/O; resolution and transforms never do.

use std::any::Any;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use geoimport_core_common::{ConnectionParams, InputDescriptor};

use crate::unit::ImportUnit;

/// Connection parameter holding the location of a file-backed store.
pub const URL_PARAM: &str = "url";

/// Where a new store should be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Target workspace name.
    pub workspace: String,
}

impl Destination {
    /// Creates a destination in the given workspace.
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }
}

/// Description of a store, either the source being read or a created target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    /// Store name.
    pub name: String,
    /// Name of the format handler responsible for the store.
    pub format: String,
    /// Workspace the store lives in; `None` for source stores.
    pub workspace: Option<String>,
    /// Connection parameters needed to reopen the store.
    pub connection: ConnectionParams,
}

/// Read access to the storage catalog, used to pick unique layer names.
pub trait Catalog: Send + Sync {
    /// Returns `true` if a layer with this name already exists.
    fn layer_exists(&self, name: &str) -> bool;
}

/// A catalog with no layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl Catalog for EmptyCatalog {
    fn layer_exists(&self, _name: &str) -> bool {
        false
    }
}

/// Receives progress notifications while units are enumerated.
pub trait ProgressMonitor: Send + Sync {
    /// Names the task currently running.
    fn set_task(&self, task: &str);

    /// Returns `true` once the caller wants enumeration to stop.
    fn is_canceled(&self) -> bool {
        false
    }
}

/// A monitor that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressMonitor for NullProgress {
    fn set_task(&self, _task: &str) {}
}

/// Lazily produced import units.
///
/// Units are built as the stream is read, and cancellation is checked before
/// each one. The stream borrows the catalog and progress monitor it was listed
/// with. It is finite and cannot be restarted; enumerate again by calling
/// [`FormatHandler::list_units`] again.
pub type UnitStream<'a> = BoxStream<'a, Result<ImportUnit>>;

/// A handler for one kind of input data.
#[async_trait]
pub trait FormatHandler: Send + Sync + fmt::Debug {
    /// Display name of the format (e.g. `"KML"`).
    fn name(&self) -> &str;

    /// Returns `self` as [`Any`] so callers can recover the concrete handler.
    fn as_any(&self) -> &dyn Any;

    /// Checks whether this handler can read the input.
    async fn can_read(&self, input: &InputDescriptor) -> Result<bool>;

    /// Creates the storage target that imported data from `input` lands in.
    async fn create_store(
        &self,
        input: &InputDescriptor,
        destination: &Destination,
    ) -> Result<StoreHandle>;

    /// Enumerates the importable units contained in `input`.
    async fn list_units<'a>(
        &'a self,
        input: &'a InputDescriptor,
        catalog: &'a dyn Catalog,
        progress: &'a dyn ProgressMonitor,
    ) -> Result<UnitStream<'a>>;
}

/// Returns `base`, or `base_1`, `base_2`, ... if the catalog already holds it.
#[must_use]
pub fn unique_name(catalog: &dyn Catalog, base: &str) -> String {
    if !catalog.layer_exists(base) {
        return base.to_string();
    }
    let mut suffix = 1_u32;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !catalog.layer_exists(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Layers(HashSet<&'static str>);

    impl Catalog for Layers {
        fn layer_exists(&self, name: &str) -> bool {
            self.0.contains(name)
        }
    }

    #[test]
    fn test_unique_name_free() {
        assert_eq!(unique_name(&EmptyCatalog, "trails"), "trails");
    }

    #[test]
    fn test_unique_name_skips_taken_suffixes() {
        let catalog = Layers(["trails", "trails_1"].into_iter().collect());
        assert_eq!(unique_name(&catalog, "trails"), "trails_2");
    }
}
