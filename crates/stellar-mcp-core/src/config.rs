//! Process-wide configuration
//!
//! Loaded once at startup from the environment and shared immutably. Every
//! service is optional: an absent setting disables the dependent feature and
//! surfaces as [`Error::ServiceUnavailable`](crate::Error::ServiceUnavailable)
//! on use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Passphrase of the public test network
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Passphrase of the public main network
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

pub const DEFAULT_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";
pub const DEFAULT_FRIENDBOT_URL: &str = "https://friendbot.stellar.org";

/// Default transaction timeout (seconds); one ledger closes roughly every five
pub const DEFAULT_TIMEOUT_SECS: u32 = 300;

/// Fee-sponsoring relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchtubeConfig {
    pub url: String,
    /// Bearer token sent with every submission
    pub jwt: String,
}

/// Signer indexing service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MercuryConfig {
    pub project_name: String,
    pub url: String,
    pub jwt: Option<String>,
    pub key: Option<String>,
}

impl MercuryConfig {
    /// Value for the Authorization header; a JWT wins over a raw key
    pub fn authorization(&self) -> Option<String> {
        match (&self.jwt, &self.key) {
            (Some(jwt), _) => Some(format!("Bearer {}", jwt)),
            (None, Some(key)) => Some(key.clone()),
            (None, None) => None,
        }
    }
}

/// Files exposed as MCP resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePaths {
    pub agent_keypair: Option<PathBuf>,
    pub usage_guide: Option<PathBuf>,
    pub sac_guide: Option<PathBuf>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Soroban RPC endpoint
    pub rpc_url: Option<String>,

    /// Network passphrase used for network id derivation
    pub network_passphrase: String,

    /// Passkey wallet contract WASM hash
    pub wallet_wasm_hash: Option<String>,

    pub launchtube: Option<LaunchtubeConfig>,

    pub mercury: Option<MercuryConfig>,

    /// Horizon REST endpoint for account and history queries
    pub horizon_url: String,

    /// Testnet faucet endpoint
    pub friendbot_url: String,

    /// Default transaction timeout (seconds)
    pub default_timeout_secs: u32,

    pub resources: ResourcePaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            wallet_wasm_hash: None,
            launchtube: None,
            mercury: None,
            horizon_url: DEFAULT_HORIZON_URL.to_string(),
            friendbot_url: DEFAULT_FRIENDBOT_URL.to_string(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            resources: ResourcePaths::default(),
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network_passphrase = get("NETWORK_PASSPHRASE").unwrap_or_else(|| {
            warn!("NETWORK_PASSPHRASE not set, using testnet");
            TESTNET_PASSPHRASE.to_string()
        });

        let launchtube = match (get("LAUNCHTUBE_URL"), get("LAUNCHTUBE_JWT")) {
            (Some(url), Some(jwt)) => Some(LaunchtubeConfig { url, jwt }),
            (Some(_), None) => {
                warn!("Launchtube configured without LAUNCHTUBE_JWT, disabling");
                None
            }
            _ => None,
        };

        let mercury = match (get("MERCURY_PROJECT_NAME"), get("MERCURY_URL")) {
            (Some(project_name), Some(url)) => {
                let jwt = get("MERCURY_JWT");
                let key = get("MERCURY_KEY");
                if jwt.is_none() && key.is_none() {
                    warn!("Mercury configured without MERCURY_JWT or MERCURY_KEY, disabling");
                    None
                } else {
                    Some(MercuryConfig {
                        project_name,
                        url,
                        jwt,
                        key,
                    })
                }
            }
            _ => None,
        };

        Self {
            rpc_url: get("RPC_URL"),
            network_passphrase,
            wallet_wasm_hash: get("WALLET_WASM_HASH"),
            launchtube,
            mercury,
            horizon_url: get("HORIZON_URL").unwrap_or_else(|| DEFAULT_HORIZON_URL.to_string()),
            friendbot_url: get("FRIENDBOT_URL")
                .unwrap_or_else(|| DEFAULT_FRIENDBOT_URL.to_string()),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            resources: ResourcePaths {
                agent_keypair: get("AGENT_KEYPAIR_FILE_PATH").map(PathBuf::from),
                usage_guide: get("USAGE_GUIDE_FILE_PATH").map(PathBuf::from),
                sac_guide: get("SAC_GUIDE_FILE_PATH").map(PathBuf::from),
            },
        }
    }
}
