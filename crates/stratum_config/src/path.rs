//! Structured locations inside a configuration file.

use std::fmt;

/// One step of an [`ObjectPath`]: a field, optionally indexed or keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathSegment {
    field: String,
    index: Option<usize>,
    key: Option<String>,
}

/// A chainable, dotted location such as `apps.api.capabilities[0].module`.
///
/// Every builder method returns a new path so a parent path can be shared by
/// many children while walking a configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPath {
    segments: Vec<PathSegment>,
}

impl ObjectPath {
    pub fn root() -> Self {
        Self::default()
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Append a plain field: `parent.field`.
    pub fn field(&self, field: impl Into<String>) -> Self {
        self.push(PathSegment {
            field: field.into(),
            index: None,
            key: None,
        })
    }

    /// Append an indexed field: `parent.field[index]`.
    pub fn index(&self, field: impl Into<String>, index: usize) -> Self {
        self.push(PathSegment {
            field: field.into(),
            index: Some(index),
            key: None,
        })
    }

    /// Append a keyed field: `parent.field.key`.
    pub fn key(&self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.push(PathSegment {
            field: field.into(),
            index: None,
            key: Some(key.into()),
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.field)?;
            if let Some(index) = segment.index {
                write!(f, "[{}]", index)?;
            }
            if let Some(key) = &segment.key {
                write!(f, ".{}", key)?;
            }
        }
        Ok(())
    }
}

/// Identity of the file an error came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContext {
    pub repo_name: String,
    pub filename: String,
}

impl FileContext {
    pub fn new(repo_name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            filename: filename.into(),
        }
    }
}

impl fmt::Display for FileContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo_name, self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_module_path() {
        let path = ObjectPath::root()
            .key("apps", "api")
            .index("capabilities", 0)
            .field("module");
        assert_eq!(path.to_string(), "apps.api.capabilities[0].module");
    }

    #[test]
    fn test_parent_is_not_mutated() {
        let parent = ObjectPath::root().key("datastores", "db");
        let _child = parent.key("vars", "size");
        assert_eq!(parent.to_string(), "datastores.db");
        assert!(ObjectPath::root().is_root());
    }

    #[test]
    fn test_file_context_display() {
        let ctx = FileContext::new("acme/infra", ".stratum/config.yml");
        assert_eq!(ctx.to_string(), "acme/infra#.stratum/config.yml");
    }
}
