//! Input descriptors: what the caller asks the importer to read.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Connection parameter names mapped to values (e.g. `dbtype`, `host`).
pub type ConnectionParams = BTreeMap<String, String>;

/// Normalizes a file extension for comparison.
///
/// Extensions compare case-insensitively and ignore one leading separator, so
/// `".KML"`, `"kml"` and `"Kml"` all normalize to `"kml"`.
///
/// # Examples
///
/// ```
/// use geoimport_core_common::normalize_extension;
///
/// assert_eq!(normalize_extension(".KML"), "kml");
/// assert_eq!(normalize_extension("tif"), "tif");
/// ```
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    extension
        .strip_prefix('.')
        .unwrap_or(extension)
        .to_ascii_lowercase()
}

/// A reference to a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    path: PathBuf,
    extension: Option<String>,
}

impl FileDescriptor {
    /// Describes the file at `path`, deriving its extension from the file name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .filter(|e| !e.is_empty());
        Self { path, extension }
    }

    /// Path to the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Normalized extension, if the file name has one.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// File name without its extension.
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// Either a file or a set of connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDescriptor {
    /// A file reference.
    File(FileDescriptor),
    /// Connection parameters for a non-file store.
    Connection(ConnectionParams),
}

impl InputDescriptor {
    /// Shorthand for [`InputDescriptor::File`].
    pub fn file(path: impl Into<PathBuf>) -> Self {
        InputDescriptor::File(FileDescriptor::new(path))
    }

    /// Shorthand for [`InputDescriptor::Connection`].
    pub fn connection<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        InputDescriptor::Connection(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The file reference, if this is a file input.
    #[must_use]
    pub fn as_file(&self) -> Option<&FileDescriptor> {
        match self {
            InputDescriptor::File(file) => Some(file),
            InputDescriptor::Connection(_) => None,
        }
    }

    /// The connection parameters, if this is a connection input.
    #[must_use]
    pub fn as_connection(&self) -> Option<&ConnectionParams> {
        match self {
            InputDescriptor::Connection(params) => Some(params),
            InputDescriptor::File(_) => None,
        }
    }
}

impl fmt::Display for InputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputDescriptor::File(file) => write!(f, "{}", file.path().display()),
            InputDescriptor::Connection(params) => {
                let keys: Vec<_> = params.keys().map(String::as_str).collect();
                write!(f, "connection({})", keys.join(", "))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_is_normalized() {
        let file = FileDescriptor::new("/data/Trails.KML");
        assert_eq!(file.extension(), Some("kml"));
        assert_eq!(file.stem(), Some("Trails"));
    }

    #[test]
    fn test_file_without_extension() {
        let file = FileDescriptor::new("/data/README");
        assert_eq!(file.extension(), None);
    }

    #[test]
    fn test_connection_display_hides_values() {
        let input = InputDescriptor::connection([("dbtype", "postgis"), ("passwd", "secret")]);
        assert_eq!(input.to_string(), "connection(dbtype, passwd)");
        assert!(input.as_file().is_none());
        assert_eq!(input.as_connection().unwrap()["dbtype"], "postgis");
    }
}
