use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty after normalization")]
    Empty,

    #[error("path '{path}' contains a '..' segment")]
    Escape { path: String },

    #[error("path '{path}' is absolute")]
    Absolute { path: String },
}

/// Normalized project-relative path: forward slashes, no empty, `.` or `..` segments.
///
/// The empty path is reserved for the tree root and is only reachable through
/// [`ProjectPath::root`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectPath(String);

impl ProjectPath {
    /// Normalizes a raw path attribute.
    ///
    /// A leading `/` is read as the project root, so `/src/app.ts` and
    /// `src/app.ts` are the same path. Paths that name a location outside the
    /// project (drive letters, `~`, `..` segments) are rejected.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let unified = raw.trim().replace('\\', "/");

        if is_drive_qualified(&unified) || unified == "~" || unified.starts_with("~/") {
            return Err(PathError::Absolute {
                path: raw.to_string(),
            });
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(PathError::Escape {
                        path: raw.to_string(),
                    })
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(PathError::Empty);
        }

        Ok(Self(segments.join("/")))
    }

    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Final segment; empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(split) => &self.0[split + 1..],
            None => &self.0,
        }
    }

    /// Parent path, `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(split) => Some(Self(self.0[..split].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Proper ancestors from the outermost directory inward, excluding the root.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut ancestors = Vec::new();
        for (index, byte) in self.0.bytes().enumerate() {
            if byte == b'/' {
                ancestors.push(Self(self.0[..index].to_string()));
            }
        }
        ancestors
    }

    /// Appends one already-normalized segment.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProjectPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ProjectPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn is_drive_qualified(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
