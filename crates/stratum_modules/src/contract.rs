//! Hierarchical module contract names and wildcard matching.
//!
//! A contract reads `category/subcategory/provider:platform:subplatform`.
//! Trailing parts may be omitted, and an omitted, empty or `*` part in a
//! pattern matches anything. The provider part of an actual contract may list
//! several providers separated by commas; a pattern provider matches if it
//! equals any of them.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const WILDCARD: &str = "*";

/// A contract pattern could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid contract {contract:?}: {reason}")]
pub struct ContractParseError {
    pub contract: String,
    pub reason: String,
}

/// The five-part classification of a module, or a pattern over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModuleContractName {
    pub category: String,
    pub subcategory: String,
    pub provider: String,
    pub platform: String,
    pub subplatform: String,
}

impl ModuleContractName {
    pub fn new(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        provider: impl Into<String>,
        platform: impl Into<String>,
        subplatform: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            provider: provider.into(),
            platform: platform.into(),
            subplatform: subplatform.into(),
        }
    }

    /// Check whether `actual` satisfies this pattern.
    pub fn matches(&self, actual: &ModuleContractName) -> bool {
        segment_matches(&self.category, &actual.category)
            && segment_matches(&self.subcategory, &actual.subcategory)
            && provider_matches(&self.provider, &actual.provider)
            && segment_matches(&self.platform, &actual.platform)
            && segment_matches(&self.subplatform, &actual.subplatform)
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.is_empty() || pattern == WILDCARD
}

fn segment_matches(pattern: &str, actual: &str) -> bool {
    is_wildcard(pattern) || pattern == actual
}

fn provider_matches(pattern: &str, actual: &str) -> bool {
    segment_matches(pattern, actual) || actual.split(',').any(|p| p.trim() == pattern)
}

impl FromStr for ModuleContractName {
    type Err = ContractParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ContractParseError {
            contract: s.to_string(),
            reason: reason.to_string(),
        };

        if s.trim().is_empty() {
            return Err(invalid("contract is empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("contract must not contain whitespace"));
        }

        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() > 3 {
            return Err(invalid(
                "expected at most three '/' separated parts: category/subcategory/platform",
            ));
        }

        let platform_parts: Vec<&str> = parts.get(2).map(|p| p.split(':').collect()).unwrap_or_default();
        if platform_parts.len() > 3 {
            return Err(invalid(
                "expected at most three ':' separated parts: provider:platform:subplatform",
            ));
        }

        let part = |items: &[&str], i: usize| items.get(i).map(|p| p.to_string()).unwrap_or_default();
        Ok(ModuleContractName {
            category: part(&parts, 0),
            subcategory: part(&parts, 1),
            provider: part(&platform_parts, 0),
            platform: part(&platform_parts, 1),
            subplatform: part(&platform_parts, 2),
        })
    }
}

impl fmt::Display for ModuleContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.subcategory, self.provider)?;
        if !self.platform.is_empty() || !self.subplatform.is_empty() {
            write!(f, ":{}", self.platform)?;
        }
        if !self.subplatform.is_empty() {
            write!(f, ":{}", self.subplatform)?;
        }
        Ok(())
    }
}

/// Match a pattern string against an actual classification.
///
/// A malformed pattern is an error, never a silent mismatch.
pub fn match_contract(pattern: &str, actual: &ModuleContractName) -> Result<bool, ContractParseError> {
    let pattern: ModuleContractName = pattern.parse()?;
    Ok(pattern.matches(actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fargate() -> ModuleContractName {
        ModuleContractName::new("app", "container", "aws", "ecs", "fargate")
    }

    #[test]
    fn test_concrete_pattern_matches_itself() {
        assert_eq!(
            match_contract("app/container/aws:ecs:fargate", &fargate()),
            Ok(true)
        );
        assert_eq!(
            match_contract("app/container/aws:ecs:ec2", &fargate()),
            Ok(false)
        );
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(match_contract("*/*/*", &fargate()), Ok(true));
        assert_eq!(match_contract("app/*/*", &fargate()), Ok(true));
        assert_eq!(match_contract("datastore/*/*", &fargate()), Ok(false));
        assert_eq!(match_contract("app", &fargate()), Ok(true));
        assert_eq!(match_contract("app//aws:ecs", &fargate()), Ok(true));
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(match_contract("App/*/*", &fargate()), Ok(false));
    }

    #[test]
    fn test_multi_provider_actual() {
        let actual = ModuleContractName::new("datastore", "postgres", "aws,gcp", "", "");
        assert_eq!(match_contract("datastore/postgres/gcp", &actual), Ok(true));
        assert_eq!(match_contract("datastore/postgres/aws", &actual), Ok(true));
        assert_eq!(match_contract("datastore/postgres/azure", &actual), Ok(false));
        assert_eq!(match_contract("datastore/postgres/*", &actual), Ok(true));
    }

    #[test]
    fn test_malformed_pattern_fails_closed() {
        assert!(match_contract("a/b/c/d", &fargate()).is_err());
        assert!(match_contract("app/container/aws:ecs:fargate:x", &fargate()).is_err());
        assert!(match_contract("", &fargate()).is_err());
        assert!(match_contract("app/ container", &fargate()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(fargate().to_string(), "app/container/aws:ecs:fargate");
        let partial = ModuleContractName::new("network", "aws", "aws", "", "");
        assert_eq!(partial.to_string(), "network/aws/aws");
        let parsed: ModuleContractName = "app/container/aws:ecs".parse().unwrap();
        assert_eq!(parsed.to_string(), "app/container/aws:ecs");
    }
}
