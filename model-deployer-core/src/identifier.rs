//! Model identifiers derived from file names

use std::fmt;
use std::path::Path;

/// Key addressing a model in the remote collection.
///
/// Everything left of the first `.` in the file name. Files that share that
/// prefix (`a.b.pmml`, `a.c.pmml`) map to the same model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelId(String);

impl ModelId {
    /// Derive an identifier from a bare file name. Returns `None` when the
    /// name starts with a dot or is empty.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = match name.find('.') {
            Some(dot) => &name[..dot],
            None => name,
        };

        if stem.is_empty() { None } else { Some(Self(stem.to_string())) }
    }

    /// Derive an identifier from the last component of `path`.
    ///
    /// Non UTF-8 names have no identifier.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name().and_then(|name| name.to_str()).and_then(Self::from_file_name)
    }

    /// Build an identifier from an explicit name, e.g. a CLI argument
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() || id.contains('/') { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
