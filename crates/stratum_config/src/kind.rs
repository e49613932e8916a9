//! Block kind descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Contract every capability module must satisfy.
pub const CAPABILITY_CONTRACT: &str = "capability/*/*";

/// Static description of one block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Key holding blocks of this kind in a configuration file.
    pub field_key: &'static str,
    /// Human-readable singular name.
    pub display_name: &'static str,
    /// Contract category a module must have to back this kind.
    /// `None` accepts any category.
    pub category: Option<&'static str>,
}

/// The kinds of declared infrastructure blocks.
///
/// Variants are declared in normalization order: later kinds may reference
/// earlier ones, so traversals walk [`BlockKind::ALL`] front to back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Block,
    Network,
    Cluster,
    ClusterNamespace,
    Ingress,
    Domain,
    Subdomain,
    Datastore,
    Application,
}

const BLOCK: KindDescriptor = KindDescriptor {
    field_key: "blocks",
    display_name: "block",
    category: None,
};
const NETWORK: KindDescriptor = KindDescriptor {
    field_key: "networks",
    display_name: "network",
    category: Some("network"),
};
const CLUSTER: KindDescriptor = KindDescriptor {
    field_key: "clusters",
    display_name: "cluster",
    category: Some("cluster"),
};
const CLUSTER_NAMESPACE: KindDescriptor = KindDescriptor {
    field_key: "cluster_namespaces",
    display_name: "cluster namespace",
    category: Some("cluster-namespace"),
};
const INGRESS: KindDescriptor = KindDescriptor {
    field_key: "ingresses",
    display_name: "ingress",
    category: Some("ingress"),
};
const DOMAIN: KindDescriptor = KindDescriptor {
    field_key: "domains",
    display_name: "domain",
    category: Some("domain"),
};
const SUBDOMAIN: KindDescriptor = KindDescriptor {
    field_key: "subdomains",
    display_name: "subdomain",
    category: Some("subdomain"),
};
const DATASTORE: KindDescriptor = KindDescriptor {
    field_key: "datastores",
    display_name: "datastore",
    category: Some("datastore"),
};
const APPLICATION: KindDescriptor = KindDescriptor {
    field_key: "apps",
    display_name: "application",
    category: Some("app"),
};

impl BlockKind {
    /// Every kind, in normalization order.
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Block,
        BlockKind::Network,
        BlockKind::Cluster,
        BlockKind::ClusterNamespace,
        BlockKind::Ingress,
        BlockKind::Domain,
        BlockKind::Subdomain,
        BlockKind::Datastore,
        BlockKind::Application,
    ];

    pub fn descriptor(&self) -> &'static KindDescriptor {
        match self {
            BlockKind::Block => &BLOCK,
            BlockKind::Network => &NETWORK,
            BlockKind::Cluster => &CLUSTER,
            BlockKind::ClusterNamespace => &CLUSTER_NAMESPACE,
            BlockKind::Ingress => &INGRESS,
            BlockKind::Domain => &DOMAIN,
            BlockKind::Subdomain => &SUBDOMAIN,
            BlockKind::Datastore => &DATASTORE,
            BlockKind::Application => &APPLICATION,
        }
    }

    pub fn field_key(&self) -> &'static str {
        self.descriptor().field_key
    }

    /// Contract pattern a block's own module must satisfy.
    pub fn required_contract(&self) -> String {
        format!("{}/*/*", self.descriptor().category.unwrap_or("*"))
    }

    /// Whether blocks of this kind may carry capabilities and env variables.
    pub fn is_application(&self) -> bool {
        matches!(self, BlockKind::Application)
    }

    pub fn from_field_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.field_key() == key)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_all() {
        let mut sorted = BlockKind::ALL;
        sorted.sort();
        assert_eq!(sorted, BlockKind::ALL);
        assert_eq!(BlockKind::ALL.first(), Some(&BlockKind::Block));
        assert_eq!(BlockKind::ALL.last(), Some(&BlockKind::Application));
    }

    #[test]
    fn test_required_contract() {
        assert_eq!(BlockKind::Application.required_contract(), "app/*/*");
        assert_eq!(BlockKind::Block.required_contract(), "*/*/*");
        assert_eq!(
            BlockKind::ClusterNamespace.required_contract(),
            "cluster-namespace/*/*"
        );
    }

    #[test]
    fn test_field_key_roundtrip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_field_key(kind.field_key()), Some(kind));
        }
        assert_eq!(BlockKind::from_field_key("widgets"), None);
    }
}
