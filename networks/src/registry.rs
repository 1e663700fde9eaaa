//! Supported-network lookup.

use chainvote_types::{ChainId, NetworkDescriptor};

use crate::builtin;
use crate::RegistryError;

/// Immutable table of supported chains with one designated default.
#[derive(Clone, Debug)]
pub struct NetworkRegistry {
    networks: Vec<NetworkDescriptor>,
    default_chain: ChainId,
}

/// What the registry says about the wallet's current chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkStatus {
    /// No chain reported yet (wallet disconnected).
    Unknown,
    /// A chain outside the registry.
    Unsupported { chain_id: ChainId },
    /// A registered chain.
    Supported(NetworkDescriptor),
}

impl NetworkStatus {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    pub fn descriptor(&self) -> Option<&NetworkDescriptor> {
        match self {
            Self::Supported(d) => Some(d),
            _ => None,
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Unknown => None,
            Self::Unsupported { chain_id } => Some(*chain_id),
            Self::Supported(d) => Some(d.chain_id),
        }
    }

    /// Display name; unregistered chains read as "Unknown Network".
    pub fn name(&self) -> &str {
        match self {
            Self::Supported(d) => &d.name,
            _ => "Unknown Network",
        }
    }
}

impl NetworkRegistry {
    /// Build a registry, rejecting duplicates and a default that is not listed.
    pub fn new(
        networks: Vec<NetworkDescriptor>,
        default_chain: ChainId,
    ) -> Result<Self, RegistryError> {
        if networks.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (i, n) in networks.iter().enumerate() {
            if networks[..i].iter().any(|m| m.chain_id == n.chain_id) {
                return Err(RegistryError::Duplicate(n.chain_id));
            }
        }
        if !networks.iter().any(|n| n.chain_id == default_chain) {
            return Err(RegistryError::UnknownDefault(default_chain));
        }
        Ok(Self {
            networks,
            default_chain,
        })
    }

    /// Lisk mainnet and Lisk Sepolia, Sepolia as default.
    pub fn builtin() -> Self {
        Self {
            networks: vec![builtin::lisk_mainnet(), builtin::lisk_sepolia()],
            default_chain: builtin::LISK_SEPOLIA,
        }
    }

    /// Apply configured overrides on top of this table.
    ///
    /// An override whose chain id is already present replaces that entry;
    /// any other override is appended.
    pub fn with_overrides(
        self,
        overrides: &[NetworkDescriptor],
        default_chain: Option<ChainId>,
    ) -> Result<Self, RegistryError> {
        let mut networks = self.networks;
        for o in overrides {
            match networks.iter_mut().find(|n| n.chain_id == o.chain_id) {
                Some(existing) => *existing = o.clone(),
                None => {
                    tracing::debug!(chain_id = %o.chain_id, name = %o.name, "registering extra network");
                    networks.push(o.clone());
                }
            }
        }
        for (i, n) in overrides.iter().enumerate() {
            if overrides[..i].iter().any(|m| m.chain_id == n.chain_id) {
                return Err(RegistryError::Duplicate(n.chain_id));
            }
        }
        Self::new(networks, default_chain.unwrap_or(self.default_chain))
    }

    pub fn is_supported(&self, chain_id: ChainId) -> bool {
        self.get(chain_id).is_some()
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&NetworkDescriptor> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn default_network(&self) -> &NetworkDescriptor {
        // `new` guarantees the default is present.
        self.get(self.default_chain)
            .unwrap_or(&self.networks[0])
    }

    pub fn status(&self, chain_id: Option<ChainId>) -> NetworkStatus {
        match chain_id {
            None => NetworkStatus::Unknown,
            Some(id) => match self.get(id) {
                Some(d) => NetworkStatus::Supported(d.clone()),
                None => NetworkStatus::Unsupported { chain_id: id },
            },
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.iter()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
