//! Root-relative paths into the article namespace.
//!
//! A [`ContentPath`] names either a category (a directory) or an article
//! stem (a file without its `.md` extension). Paths are normalized on
//! construction: leading, trailing and repeated slashes are dropped, and any
//! segment that could escape the content root is rejected.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Display name of the root category.
pub const ROOT_NAME: &str = ".";

/// Normalized, slash-separated path relative to the content root.
///
/// The empty path is the root category.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentPath(String);

impl ContentPath {
    /// The root of the namespace.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and normalize a path.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            if segment.is_empty() {
                continue;
            }
            validate_segment(raw, segment)?;
            segments.push(segment);
        }
        Ok(Self(segments.join("/")))
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The normalized string form (empty for the root).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The last segment, or `"."` for the root.
    pub fn name(&self) -> &str {
        self.segments().last().unwrap_or(ROOT_NAME)
    }

    /// The containing path. `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Append a single segment.
    pub fn join(&self, segment: &str) -> Result<Self, TypeError> {
        validate_segment(segment, segment)?;
        if self.is_root() {
            Ok(Self(segment.to_string()))
        } else {
            Ok(Self(format!("{}/{}", self.0, segment)))
        }
    }

    /// Resolve this path below a filesystem root directory.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
    }

    /// Resolve this path below `root` with `extension` appended to the last
    /// segment, e.g. `guides/setup` → `<root>/guides/setup.md`.
    pub fn to_fs_file(&self, root: &Path, extension: &str) -> PathBuf {
        let mut path = self.to_fs_path(root).into_os_string();
        path.push(".");
        path.push(extension);
        PathBuf::from(path)
    }
}

fn validate_segment(raw: &str, segment: &str) -> Result<(), TypeError> {
    let reason = if segment.is_empty() {
        Some("empty segment")
    } else if segment == "." || segment == ".." {
        Some("relative segments are not allowed")
    } else if segment.contains('/') {
        Some("segment contains a slash")
    } else if segment.contains('\\') {
        Some("backslashes are not allowed")
    } else if segment.chars().any(char::is_control) {
        Some("control characters are not allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(TypeError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

impl fmt::Debug for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentPath({:?})", self.0)
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for ContentPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_slashes() {
        let path = ContentPath::parse("/guides//setup/").unwrap();
        assert_eq!(path.as_str(), "guides/setup");
        assert_eq!(path.name(), "setup");
    }

    #[test]
    fn empty_and_slash_are_root() {
        assert!(ContentPath::parse("").unwrap().is_root());
        assert!(ContentPath::parse("/").unwrap().is_root());
        assert_eq!(ContentPath::root().name(), ".");
        assert_eq!(ContentPath::root().to_string(), "/");
    }

    #[test]
    fn rejects_traversal() {
        assert!(ContentPath::parse("../etc/passwd").is_err());
        assert!(ContentPath::parse("a/./b").is_err());
        assert!(ContentPath::parse("a\\b").is_err());
        assert!(ContentPath::parse("a\0b").is_err());
    }

    #[test]
    fn parent_walks_up_to_root() {
        let path = ContentPath::parse("a/b/c").unwrap();
        let parent = path.parent().unwrap();
        assert_eq!(parent.as_str(), "a/b");
        let top = ContentPath::parse("a").unwrap().parent().unwrap();
        assert!(top.is_root());
        assert!(ContentPath::root().parent().is_none());
    }

    #[test]
    fn join_appends_segment() {
        let root = ContentPath::root();
        let a = root.join("a").unwrap();
        assert_eq!(a.join("b").unwrap().as_str(), "a/b");
        assert!(a.join("..").is_err());
        assert!(a.join("x/y").is_err());
    }

    #[test]
    fn fs_paths_stay_below_root() {
        let root = Path::new("/srv/wiki");
        let path = ContentPath::parse("guides/setup").unwrap();
        assert_eq!(path.to_fs_path(root), PathBuf::from("/srv/wiki/guides/setup"));
        assert_eq!(
            path.to_fs_file(root, "md"),
            PathBuf::from("/srv/wiki/guides/setup.md")
        );
        assert_eq!(ContentPath::root().to_fs_path(root), PathBuf::from("/srv/wiki"));
    }

    #[test]
    fn serde_uses_plain_string() {
        let path = ContentPath::parse("a/b").unwrap();
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"a/b\"");
        assert!(serde_json::from_str::<ContentPath>("\"../x\"").is_err());
    }

    proptest! {
        #[test]
        fn parsing_is_idempotent(raw in "[a-z_/ -]{0,40}") {
            let once = ContentPath::parse(&raw).unwrap();
            let twice = ContentPath::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
