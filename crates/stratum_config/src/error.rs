//! Error types for configuration handling.
//!
//! Two layers live here. [`ConfigError`] covers failures to build a
//! configuration tree at all. [`ValidationError`] is a located finding about a
//! tree that did parse; it is shared by the resolve, validate and normalize
//! passes and distinguished by [`ErrorFamily`].

use std::fmt;

use thiserror::Error;

use crate::path::{FileContext, ObjectPath};

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while building configuration trees.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid connection target {value:?}: {reason}")]
    InvalidConnectionTarget { value: String, reason: String },

    #[error("Invalid configuration in {context}: {message}")]
    InvalidFormat { context: FileContext, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The pass that produced a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    /// Module, version or block lookup and classification.
    Resolve,
    /// Declared configuration does not fit the module manifest.
    Validate,
    /// A connection reference could not be resolved to identifiers.
    Normalize,
}

impl fmt::Display for ErrorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorFamily::Resolve => "resolve",
            ErrorFamily::Validate => "validate",
            ErrorFamily::Normalize => "normalize",
        };
        write!(f, "{}", name)
    }
}

/// What is wrong at a location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("module is required")]
    RequiredModule,

    #[error("invalid module format {source_ref:?}: must be in the form \"<org>/<module-name>\"")]
    InvalidModuleFormat { source_ref: String },

    #[error("module {source_ref:?} does not exist")]
    MissingModule { source_ref: String },

    #[error("module version {source_ref}@{version} does not exist")]
    MissingModuleVersion { source_ref: String, version: String },

    #[error("module {source_ref:?} ({actual}) does not satisfy the required contract {expected}")]
    InvalidModuleContract {
        source_ref: String,
        expected: String,
        actual: String,
    },

    #[error("contract {contract:?} is malformed: {reason}")]
    MalformedContract { contract: String, reason: String },

    #[error("variable {name:?} does not exist in module {source_ref}")]
    UnknownVariable { name: String, source_ref: String },

    #[error("connection {name:?} does not exist in module {source_ref}")]
    UnknownConnection { name: String, source_ref: String },

    #[error("connection {connection:?} references block {target:?} which does not exist")]
    MissingConnectionBlock { connection: String, target: String },

    #[error(
        "connection {connection:?} requires contract {expected}, but block {target:?} uses module {source_ref:?} ({actual})"
    )]
    InvalidConnectionContract {
        connection: String,
        target: String,
        source_ref: String,
        expected: String,
        actual: String,
    },

    #[error(
        "module {source_ref:?} does not support application category {category:?} (supported: {})",
        .supported.join(", ")
    )]
    UnsupportedAppCategory {
        source_ref: String,
        category: String,
        supported: Vec<String>,
    },

    #[error("capability {source_ref:?} is declared more than once with the same connections and namespace")]
    DuplicateCapability { source_ref: String },

    #[error("stack {stack:?} referenced by {target:?} does not exist")]
    MissingStack { stack: String, target: String },

    #[error("environment {env:?} referenced by {target:?} does not exist")]
    MissingEnvironment { env: String, target: String },

    #[error("block {block:?} referenced by {target:?} does not exist")]
    MissingBlock { block: String, target: String },

    #[error("stack {stack:?} has no previews-shared environment for shared block {target:?}")]
    MissingPreviewsSharedEnvironment { stack: String, target: String },

    #[error(
        "{tool} channel {channel:?} does not exist (available: {})",
        .available.join(", ")
    )]
    UnknownChannel {
        tool: String,
        channel: String,
        available: Vec<String>,
    },
}

/// A located finding: file, path inside the file, and what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{context} ({path}): {kind}")]
pub struct ValidationError {
    pub context: FileContext,
    pub path: ObjectPath,
    pub family: ErrorFamily,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(
        family: ErrorFamily,
        context: &FileContext,
        path: ObjectPath,
        kind: ValidationErrorKind,
    ) -> Self {
        Self {
            context: context.clone(),
            path,
            family,
            kind,
        }
    }

    pub fn resolve(context: &FileContext, path: ObjectPath, kind: ValidationErrorKind) -> Self {
        Self::new(ErrorFamily::Resolve, context, path, kind)
    }

    pub fn validate(context: &FileContext, path: ObjectPath, kind: ValidationErrorKind) -> Self {
        Self::new(ErrorFamily::Validate, context, path, kind)
    }

    pub fn normalize(context: &FileContext, path: ObjectPath, kind: ValidationErrorKind) -> Self {
        Self::new(ErrorFamily::Normalize, context, path, kind)
    }
}

/// An ordered collection of [`ValidationError`]s from one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Errors whose path renders exactly as `path`.
    pub fn at(&self, path: &str) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.path.to_string() == path)
            .collect()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let ctx = FileContext::new("acme/infra", "config.yml");
        let path = ObjectPath::root().key("apps", "api").key("vars", "cpux");
        let err = ValidationError::validate(
            &ctx,
            path,
            ValidationErrorKind::UnknownVariable {
                name: "cpux".into(),
                source_ref: "acme/fargate-service".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "acme/infra#config.yml (apps.api.vars.cpux): variable \"cpux\" does not exist in module acme/fargate-service"
        );
    }

    #[test]
    fn test_unsupported_category_names_alternatives() {
        let kind = ValidationErrorKind::UnsupportedAppCategory {
            source_ref: "acme/cdn".into(),
            category: "container".into(),
            supported: vec!["static-site".into(), "server".into()],
        };
        assert!(kind.to_string().ends_with("(supported: static-site, server)"));
    }

    #[test]
    fn test_errors_collection() {
        let ctx = FileContext::new("r", "f");
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());
        errors.push(ValidationError::resolve(
            &ctx,
            ObjectPath::root().key("apps", "a").field("module"),
            ValidationErrorKind::RequiredModule,
        ));
        errors.extend(ValidationErrors::from(ValidationError::resolve(
            &ctx,
            ObjectPath::root().key("apps", "b").field("module"),
            ValidationErrorKind::RequiredModule,
        )));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.at("apps.b.module").len(), 1);
        assert_eq!(errors.to_string().lines().count(), 2);
    }
}
