//! Extension to format handler registry.
//!
//! The registry maps file-extension tokens to [`HandlerFactory`] instances. It is
//! written at startup (the process-wide [`format_registry`] comes with
//! [`crate::formats::register_builtin_formats`] applied) and read concurrently
//! afterwards. A mapping is a hint: the resolver falls back to other
//! strategies when the mapped factory fails to construct a handler.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use geoimport_core::formats::KmlFileFormat;
//! use geoimport_core::registry::{FormatRegistry, handler_factory};
//!
//! let registry = FormatRegistry::new();
//! registry.register(".KML", handler_factory(|| Ok(Arc::new(KmlFileFormat))));
//!
//! assert!(registry.lookup("kml").is_some());
//! assert!(registry.lookup("shp").is_none());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use anyhow::Result;
use geoimport_core_common::normalize_extension;
use log::debug;

use crate::formats::register_builtin_formats;
use crate::handler::FormatHandler;

/// Constructs a fresh format handler.
pub trait HandlerFactory: Send + Sync {
    /// Creates the handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be constructed, e.g. because a
    /// required native library is missing.
    fn create(&self) -> Result<Arc<dyn FormatHandler>>;
}

impl<F> HandlerFactory for F
where
    F: Fn() -> Result<Arc<dyn FormatHandler>> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn FormatHandler>> {
        self()
    }
}

/// Wraps a closure as a shareable [`HandlerFactory`].
pub fn handler_factory<F>(factory: F) -> Arc<dyn HandlerFactory>
where
    F: Fn() -> Result<Arc<dyn FormatHandler>> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// Thread-safe mapping from normalized file extension to handler factory.
#[derive(Default)]
pub struct FormatRegistry {
    formats: RwLock<HashMap<String, Arc<dyn HandlerFactory>>>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `extension` to `factory`.
    ///
    /// Extensions compare case-insensitively and ignore a leading `.`. A later
    /// registration for the same extension replaces the earlier one.
    pub fn register(&self, extension: &str, factory: Arc<dyn HandlerFactory>) {
        let extension = normalize_extension(extension);
        let mut formats = self.formats.write().unwrap_or_else(PoisonError::into_inner);
        if formats.insert(extension.clone(), factory).is_some() {
            debug!("Replaced format handler registered for extension '{extension}'");
        }
    }

    /// Returns the factory registered for `extension`, if any.
    #[must_use]
    pub fn lookup(&self, extension: &str) -> Option<Arc<dyn HandlerFactory>> {
        let extension = normalize_extension(extension);
        self.formats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&extension)
            .cloned()
    }

    /// Registered extensions in sorted order.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<_> = self
            .formats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        extensions.sort_unstable();
        extensions
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Returns the process-wide registry, holding the built-in formats.
pub fn format_registry() -> Arc<FormatRegistry> {
    static REGISTRY: OnceLock<Arc<FormatRegistry>> = OnceLock::new();
    Arc::clone(REGISTRY.get_or_init(|| {
        let registry = FormatRegistry::new();
        register_builtin_formats(&registry);
        Arc::new(registry)
    }))
}
