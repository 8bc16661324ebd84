use ethers::signers::LocalWallet;
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Secret not set: {0}")]
    MissingSecret(String),

    #[error("Secret {0} is not a valid private key")]
    InvalidSecret(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub chain: ChainConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub wallets: WalletConfig,
}

/// Token network settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainConfig {
    pub network: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub token_address: String,
    /// Platform wallet that receives deposits
    pub deposit_wallet: String,
    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_token_symbol() -> String {
    "DAN".to_string()
}

fn default_confirmations() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    3000
}

/// Platform REST API
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// File holding the bearer token between runs
    pub token_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_path: "./data/auth_token".to_string(),
        }
    }
}

/// Names of the environment variables holding wallet keys.
/// Keys themselves never live in the YAML.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletConfig {
    pub user_key_env: String,
    pub payment_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            user_key_env: "DAN_USER_PRIVATE_KEY".to_string(),
            payment_key_env: "DAN_PAYMENT_PRIVATE_KEY".to_string(),
        }
    }
}

impl WalletConfig {
    /// The user's own wallet (deposits, login signatures)
    pub fn user_wallet(&self) -> Result<LocalWallet, ConfigError> {
        load_wallet(&self.user_key_env)
    }

    /// The platform's custodial payment wallet (withdrawals)
    pub fn payment_wallet(&self) -> Result<LocalWallet, ConfigError> {
        load_wallet(&self.payment_key_env)
    }
}

fn load_wallet(var: &str) -> Result<LocalWallet, ConfigError> {
    let key = std::env::var(var).map_err(|_| ConfigError::MissingSecret(var.to_string()))?;
    key.trim()
        .trim_start_matches("0x")
        .parse::<LocalWallet>()
        .map_err(|_| ConfigError::InvalidSecret(var.to_string()))
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
