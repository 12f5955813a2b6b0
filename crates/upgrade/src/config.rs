//! Deployment and connection settings, loaded from TOML.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

/// Addresses of the contracts the upgrade protocol relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deployment {
    /// Proxy template every upgraded account delegates to.
    pub proxy_template: Address,
    /// Wallet implementation the proxy should point at.
    pub implementation: Address,
    /// Validator checked by the proxy after `setImplementation`.
    pub validator: Address,
    /// Nonce tracker guarding `setImplementation`.
    pub nonce_tracker: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    pub rpc_url: String,

    /// Overrides the chain id reported by the RPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,

    /// How long to wait for a transaction to be mined.
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    pub contracts: Deployment,
}

const fn default_receipt_timeout_secs() -> u64 {
    DEFAULT_RECEIPT_TIMEOUT_SECS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl WalletConfig {
    /// Settings for `rpc_url` with the default receipt timeout.
    pub const fn new(rpc_url: String, contracts: Deployment) -> Self {
        Self {
            rpc_url,
            chain_id: None,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            contracts,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub const fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}
