//! Connection targets: references from one block to another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A reference to another block.
///
/// As declared, a target may name only the block (same stack and environment
/// as the referencing block) or qualify it with stack and environment names.
/// Normalization fills in every name and numeric identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ConnectionTargetDef")]
pub struct ConnectionTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<i64>,
    pub block_name: String,
}

impl ConnectionTarget {
    pub fn block(name: impl Into<String>) -> Self {
        Self {
            block_name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack_name = Some(stack.into());
        self
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env_name = Some(env.into());
        self
    }

    pub fn with_ids(mut self, stack_id: i64, env_id: i64, block_id: i64) -> Self {
        self.stack_id = Some(stack_id);
        self.env_id = Some(env_id);
        self.block_id = Some(block_id);
        self
    }

    /// A target is normalized once every identifying field is filled.
    pub fn is_normalized(&self) -> bool {
        self.stack_id.is_some()
            && self.env_id.is_some()
            && self.block_id.is_some()
            && self.stack_name.is_some()
            && self.env_name.is_some()
            && !self.block_name.is_empty()
    }

    /// Compare by resolved identity rather than by the declared spelling.
    ///
    /// When both sides carry a block id the numeric triple decides; otherwise
    /// every field must match.
    pub fn resolved_eq(&self, other: &ConnectionTarget) -> bool {
        match (self.block_id, other.block_id) {
            (Some(a), Some(b)) => {
                a == b && self.stack_id == other.stack_id && self.env_id == other.env_id
            }
            _ => self == other,
        }
    }

    /// Stable key describing the resolved identity, used in change identifiers.
    pub fn identity_key(&self) -> String {
        match (self.stack_id, self.env_id, self.block_id) {
            (Some(s), Some(e), Some(b)) => format!("{}.{}.{}", s, e, b),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stack) = &self.stack_name {
            write!(f, "{}.", stack)?;
        }
        if let Some(env) = &self.env_name {
            write!(f, "{}.", env)?;
        }
        write!(f, "{}", self.block_name)
    }
}

impl FromStr for ConnectionTarget {
    type Err = ConfigError;

    /// Parse `block`, `stack.block` or `stack.env.block`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidConnectionTarget {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty name segment"));
        }

        match parts.as_slice() {
            [block] => Ok(ConnectionTarget::block(*block)),
            [stack, block] => Ok(ConnectionTarget::block(*block).with_stack(*stack)),
            [stack, env, block] => Ok(ConnectionTarget::block(*block)
                .with_stack(*stack)
                .with_env(*env)),
            _ => Err(invalid("expected block, stack.block or stack.env.block")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConnectionTargetDef {
    Short(String),
    Full {
        #[serde(default)]
        stack_id: Option<i64>,
        #[serde(default)]
        stack_name: Option<String>,
        #[serde(default)]
        env_id: Option<i64>,
        #[serde(default)]
        env_name: Option<String>,
        #[serde(default)]
        block_id: Option<i64>,
        block_name: String,
    },
}

impl TryFrom<ConnectionTargetDef> for ConnectionTarget {
    type Error = ConfigError;

    fn try_from(def: ConnectionTargetDef) -> Result<Self, Self::Error> {
        match def {
            ConnectionTargetDef::Short(s) => s.parse(),
            ConnectionTargetDef::Full {
                stack_id,
                stack_name,
                env_id,
                env_name,
                block_id,
                block_name,
            } => {
                if block_name.is_empty() {
                    return Err(ConfigError::InvalidConnectionTarget {
                        value: String::new(),
                        reason: "block_name is required".to_string(),
                    });
                }
                Ok(ConnectionTarget {
                    stack_id,
                    stack_name,
                    env_id,
                    env_name,
                    block_id,
                    block_name,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_forms() {
        let t: ConnectionTarget = "network".parse().unwrap();
        assert_eq!(t, ConnectionTarget::block("network"));

        let t: ConnectionTarget = "core.network".parse().unwrap();
        assert_eq!(t.stack_name.as_deref(), Some("core"));
        assert_eq!(t.env_name, None);

        let t: ConnectionTarget = "core.prod.network".parse().unwrap();
        assert_eq!(t.env_name.as_deref(), Some("prod"));
        assert_eq!(t.to_string(), "core.prod.network");
    }

    #[test]
    fn test_parse_rejects_bad_forms() {
        assert!("".parse::<ConnectionTarget>().is_err());
        assert!("a..b".parse::<ConnectionTarget>().is_err());
        assert!("a.b.c.d".parse::<ConnectionTarget>().is_err());
    }

    #[test]
    fn test_deserialize_both_shapes() {
        let short: ConnectionTarget = serde_yaml::from_str("core.network").unwrap();
        let full: ConnectionTarget =
            serde_yaml::from_str("stack_name: core\nblock_name: network\nblock_id: 7").unwrap();
        assert_eq!(short.stack_name, full.stack_name);
        assert_eq!(full.block_id, Some(7));
    }

    #[test]
    fn test_normalized_and_resolved_eq() {
        let a = ConnectionTarget::block("net")
            .with_stack("core")
            .with_env("dev")
            .with_ids(1, 2, 3);
        assert!(a.is_normalized());

        let renamed = ConnectionTarget {
            block_name: "network".into(),
            ..a.clone()
        };
        assert!(a.resolved_eq(&renamed));

        let moved = ConnectionTarget {
            block_id: Some(4),
            ..a.clone()
        };
        assert!(!a.resolved_eq(&moved));
        assert_eq!(a.identity_key(), "1.2.3");
    }
}
