//! Module source references.

use std::fmt;
use std::str::FromStr;

use stratum_config::ValidationErrorKind;

/// A parsed `org/name` module reference.
///
/// A leading registry host (`registry.example.com/org/name`) is accepted and
/// dropped; lookups only use the org and module name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleSource {
    pub org_name: String,
    pub module_name: String,
}

impl FromStr for ModuleSource {
    type Err = ValidationErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationErrorKind::InvalidModuleFormat {
            source_ref: s.to_string(),
        };
        let parts: Vec<&str> = s.trim().split('/').collect();
        let (org, name) = match parts.as_slice() {
            [org, name] => (*org, *name),
            [_host, org, name] => (*org, *name),
            _ => return Err(invalid()),
        };
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        };
        if !valid(org) || !valid(name) {
            return Err(invalid());
        }
        Ok(ModuleSource {
            org_name: org.to_string(),
            module_name: name.to_string(),
        })
    }
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org_name, self.module_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let src: ModuleSource = "acme/fargate-service".parse().unwrap();
        assert_eq!(src.org_name, "acme");
        assert_eq!(src.module_name, "fargate-service");

        let hosted: ModuleSource = "modules.example.com/acme/postgres".parse().unwrap();
        assert_eq!(hosted.to_string(), "acme/postgres");
    }

    #[test]
    fn test_parse_invalid_source() {
        assert!("fargate-service".parse::<ModuleSource>().is_err());
        assert!("acme/".parse::<ModuleSource>().is_err());
        assert!("a/b/c/d".parse::<ModuleSource>().is_err());
        assert!("acme/bad name".parse::<ModuleSource>().is_err());
    }
}
