//! Format resolution.
//!
//! [`FormatResolver`] picks the handler for an input. Files go through a
//! fallback chain, each step tried only when the previous one found nothing:
//!
//! 1. the handler registered for the file extension in the [`FormatRegistry`],
//!    if it constructs;
//! 2. the single vector store factory that supports the extension;
//! 3. the grid formats that recognize the file content. Several candidates are
//!    settled in favour of the preferred grid format
//!    ([`ResolverConfig::preferred_grid_format`]) or reported as
//!    [`FormatError::Ambiguous`].
//!
//! Connection parameters go to the first vector store factory that accepts them.
//! An input nobody can read resolves to `Ok(None)`.
//!
//! # Examples
//!
//! ```no_run
//! use geoimport_core::resolver::FormatResolver;
//! use geoimport_core_common::InputDescriptor;
//!
//! # fn main() -> geoimport_core::error::Result<()> {
//! let resolver = FormatResolver::with_builtin_formats();
//! match resolver.resolve(&InputDescriptor::file("data/trails.kml"))? {
//!     Some(handler) => println!("{}", handler.name()),
//!     None => println!("No format found"),
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use geoimport_core_common::{ConnectionParams, FileDescriptor, InputDescriptor};
use log::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{FormatError, Result};
use crate::formats::{
    DataStoreFactory, DataStoreFormat, GridFormat, GridFormatHandler, builtin_data_stores,
    builtin_grid_formats,
};
use crate::handler::FormatHandler;
use crate::registry::{FormatRegistry, format_registry};

/// Selects the format handler for an input.
///
/// The resolver holds no mutable state; share it freely between threads.
#[derive(Debug, Clone)]
pub struct FormatResolver {
    registry: Arc<FormatRegistry>,
    data_stores: Vec<Arc<dyn DataStoreFactory>>,
    grid_formats: Vec<Arc<dyn GridFormat>>,
    config: ResolverConfig,
}

impl FormatResolver {
    /// Creates a resolver over `registry` with no store factories or grid formats.
    #[must_use]
    pub fn new(registry: Arc<FormatRegistry>) -> Self {
        Self {
            registry,
            data_stores: Vec::new(),
            grid_formats: Vec::new(),
            config: ResolverConfig::default(),
        }
    }

    /// Creates a resolver over the process-wide registry with the built-in
    /// store factories and grid formats.
    #[must_use]
    pub fn with_builtin_formats() -> Self {
        let mut resolver = Self::new(format_registry());
        resolver.data_stores = builtin_data_stores();
        resolver.grid_formats = builtin_grid_formats();
        resolver
    }

    /// Adds a vector store factory.
    #[must_use]
    pub fn with_data_store(mut self, factory: Arc<dyn DataStoreFactory>) -> Self {
        self.data_stores.push(factory);
        self
    }

    /// Adds a grid format.
    #[must_use]
    pub fn with_grid_format(mut self, format: Arc<dyn GridFormat>) -> Self {
        self.grid_formats.push(format);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn data_stores(&self) -> &[Arc<dyn DataStoreFactory>] {
        &self.data_stores
    }

    #[must_use]
    pub fn grid_formats(&self) -> &[Arc<dyn GridFormat>] {
        &self.grid_formats
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a file or a connection.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Ambiguous`] when several grid formats claim a file
    /// and none of them is preferred.
    pub fn resolve(&self, input: &InputDescriptor) -> Result<Option<Arc<dyn FormatHandler>>> {
        match input {
            InputDescriptor::File(file) => self.resolve_by_file(file),
            InputDescriptor::Connection(params) => Ok(self.resolve_by_parameters(params)),
        }
    }

    /// Resolves a file through the extension, vector store and grid format steps.
    ///
    /// Files without an extension skip straight to grid format sniffing.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Ambiguous`] when several grid formats claim the
    /// file and none of them is preferred.
    pub fn resolve_by_file(&self, file: &FileDescriptor) -> Result<Option<Arc<dyn FormatHandler>>> {
        if let Some(extension) = file.extension() {
            if let Some(handler) = self.by_extension(extension) {
                info!("Resolved {} to {} by extension", file.path().display(), handler.name());
                return Ok(Some(handler));
            }
            if let Some(handler) = self.by_data_store(extension) {
                info!("Resolved {} to vector store {}", file.path().display(), handler.name());
                return Ok(Some(handler));
            }
        }

        let handler = self.by_grid_format(file)?;
        match &handler {
            Some(handler) => {
                info!("Resolved {} to grid format {}", file.path().display(), handler.name());
            },
            None => debug!("No format can read {}", file.path().display()),
        }
        Ok(handler)
    }

    /// Returns a handler for the first vector store factory accepting `params`.
    #[must_use]
    pub fn resolve_by_parameters(&self, params: &ConnectionParams) -> Option<Arc<dyn FormatHandler>> {
        let factory = self.data_stores.iter().find(|f| f.can_process(params))?;
        info!("Resolved connection to vector store {}", factory.display_name());
        Some(Arc::new(DataStoreFormat::new(Arc::clone(factory))))
    }

    fn by_extension(&self, extension: &str) -> Option<Arc<dyn FormatHandler>> {
        let factory = self.registry.lookup(extension)?;
        match factory.create() {
            Ok(handler) => Some(handler),
            Err(e) => {
                debug!("Handler registered for '{extension}' could not be created: {e:#}");
                None
            },
        }
    }

    fn by_data_store(&self, extension: &str) -> Option<Arc<dyn FormatHandler>> {
        let claims: Vec<_> = self
            .data_stores
            .iter()
            .filter(|f| f.supports_extension(extension))
            .collect();

        match claims.as_slice() {
            [] => None,
            [factory] => Some(Arc::new(DataStoreFormat::new(Arc::clone(factory)))),
            many => {
                let names: Vec<_> = many.iter().map(|f| f.display_name()).collect();
                warn!(
                    "Several vector stores support '{extension}' ({}), trying grid formats",
                    names.join(", ")
                );
                None
            },
        }
    }

    fn by_grid_format(&self, file: &FileDescriptor) -> Result<Option<Arc<dyn FormatHandler>>> {
        let candidates: Vec<_> = self
            .grid_formats
            .iter()
            .filter(|g| !g.is_unknown() && g.can_read(file.path()))
            .collect();

        let chosen = match candidates.as_slice() {
            [] => return Ok(None),
            [format] => *format,
            many => {
                let preferred = &self.config.preferred_grid_format;
                let Some(format) = many.iter().find(|g| g.name() == preferred) else {
                    return Err(FormatError::Ambiguous {
                        input: file.path().display().to_string(),
                        candidates: many.iter().map(|g| g.name().to_string()).collect(),
                    }
                    .into());
                };
                debug!(
                    "{} grid formats claim {}, preferring {preferred}",
                    many.len(),
                    file.path().display()
                );
                *format
            },
        };

        Ok(Some(Arc::new(GridFormatHandler::new(Arc::clone(chosen)))))
    }
}
