//! GraphQL response paths

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a response path: a field response name or a list index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field response name (alias if aliased)
    Key(String),
    /// Position within a list
    Index(u32),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<u32> for PathSegment {
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}

/// Path from the response root to a resolved value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponsePath {
    segments: Vec<PathSegment>,
}

impl ResponsePath {
    /// The empty path, addressing the response root
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend with a field response name
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    /// Extend with a list index
    pub fn child_index(&self, index: u32) -> Self {
        self.child(PathSegment::Index(index))
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// The path without its last segment, or `None` at the root
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// Last segment, or `None` at the root
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// True for the empty path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments from the root
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Dotted form used to index trace nodes; the root is `""`
    pub fn key_string(&self) -> String {
        segments_key(&self.segments)
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_string())
    }
}

impl From<Vec<PathSegment>> for ResponsePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<PathSegment> for ResponsePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

/// Join segments with `.`
pub(crate) fn segments_key(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_string() {
        let path = ResponsePath::root()
            .child_key("users")
            .child_index(3)
            .child_key("email");
        assert_eq!(path.key_string(), "users.3.email");
        assert_eq!(ResponsePath::root().key_string(), "");
    }

    #[test]
    fn test_parent() {
        let path = ResponsePath::root().child_key("user").child_key("name");
        let parent = path.parent().unwrap();
        assert_eq!(parent.key_string(), "user");
        assert!(parent.parent().unwrap().is_root());
        assert!(ResponsePath::root().parent().is_none());
    }

    #[test]
    fn test_serde_untagged() {
        let path: ResponsePath = serde_json::from_str(r#"["users", 0, "email"]"#).unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::from("users"),
                PathSegment::Index(0),
                PathSegment::from("email")
            ]
        );
        assert_eq!(serde_json::to_string(&path).unwrap(), r#"["users",0,"email"]"#);
    }
}
