//! Pi Network platform integration.
//!
//! The browser runs the Pi SDK (`Pi.authenticate`, `Pi.createPayment`);
//! the server only talks to the Pi Platform REST API to verify access
//! tokens and to approve/complete payments with the app's server key.
//!
//! [`PiPlatform`] is the seam: [`HttpPiPlatform`] in production,
//! [`MockPiPlatform`] for local development outside the Pi Browser.

mod http;
mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpPiPlatform;
pub use mock::MockPiPlatform;

/// Pi API host. Mainnet and testnet share it; the network is chosen by
/// the app registration and the SDK's `sandbox` flag.
pub const DEFAULT_API_BASE: &str = "https://api.minepi.com";

/// Pi SDK version the client should pass to `Pi.init`.
pub const SDK_VERSION: &str = "2.0";

/// Which Pi network the app is registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiNetwork {
    #[default]
    Mainnet,
    #[serde(alias = "sandbox")]
    Testnet,
}

/// Pi Network settings, resolved once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PiConfig {
    pub network: PiNetwork,
    pub api_base: String,
    /// Server API key from the Pi developer portal.
    pub api_key: String,
    pub app_id: String,
    /// Use [`MockPiPlatform`] instead of calling Pi Network.
    pub mock_auth: bool,
    pub timeout_secs: u64,
}

impl Default for PiConfig {
    fn default() -> Self {
        Self {
            network: PiNetwork::Mainnet,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            app_id: "droplink".to_string(),
            mock_auth: false,
            timeout_secs: 15,
        }
    }
}

impl PiConfig {
    /// Value for the SDK's `sandbox` init option.
    pub fn sandbox(&self) -> bool {
        self.network == PiNetwork::Testnet
    }

    /// Settings the browser needs to call `Pi.init`.
    pub fn client_config(&self) -> PiClientConfig {
        PiClientConfig {
            network: self.network,
            sandbox: self.sandbox(),
            app_id: self.app_id.clone(),
            version: SDK_VERSION,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PiClientConfig {
    pub network: PiNetwork,
    pub sandbox: bool,
    pub app_id: String,
    pub version: &'static str,
}

/// Normalized Pi user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiUser {
    pub uid: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

/// Scopes the browser may request from `Pi.authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiScope {
    Username,
    Payments,
    WalletAddress,
}

impl PiScope {
    pub fn parse(name: &str) -> Option<PiScope> {
        match name.trim() {
            "username" => Some(PiScope::Username),
            "payments" => Some(PiScope::Payments),
            "wallet_address" => Some(PiScope::WalletAddress),
            _ => None,
        }
    }
}

/// Payment status flags as reported by the Pi API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiPaymentStatus {
    pub developer_approved: bool,
    pub transaction_verified: bool,
    pub developer_completed: bool,
    pub cancelled: bool,
    pub user_cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiTransaction {
    pub txid: String,
    #[serde(default)]
    pub verified: bool,
}

/// A payment as returned by the Pi API. Only the fields Droplink reads
/// are modelled; missing ones default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiPayment {
    pub identifier: String,
    #[serde(default)]
    pub user_uid: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub status: PiPaymentStatus,
    #[serde(default)]
    pub transaction: Option<PiTransaction>,
}

/// Failure talking to the Pi Platform API.
#[derive(Debug, Error)]
pub enum PiError {
    /// Pi rejected the user's access token.
    #[error("Pi Network rejected the access token")]
    InvalidToken,

    #[error("payment '{0}' not found on Pi Network")]
    PaymentNotFound(String),

    #[error("Pi Network request timed out")]
    Timeout,

    #[error("Pi Network request failed: {0}")]
    Network(String),

    #[error("Pi Network returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected Pi Network response: {0}")]
    Decode(String),
}

/// The Pi Platform API operations Droplink uses.
#[async_trait]
pub trait PiPlatform: Send + Sync {
    /// Resolve a user access token (from `Pi.authenticate`) to its user.
    async fn me(&self, access_token: &str) -> Result<PiUser, PiError>;

    /// Server-side approval, called when the SDK reports
    /// `onReadyForServerApproval`.
    async fn approve_payment(&self, payment_id: &str) -> Result<PiPayment, PiError>;

    /// Server-side completion once the blockchain transaction exists.
    async fn complete_payment(&self, payment_id: &str, txid: &str) -> Result<PiPayment, PiError>;

    async fn cancel_payment(&self, payment_id: &str) -> Result<PiPayment, PiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_means_sandbox() {
        let mut cfg = PiConfig::default();
        assert!(!cfg.sandbox());
        cfg.network = PiNetwork::Testnet;
        let client = cfg.client_config();
        assert!(client.sandbox);
        assert_eq!(client.version, "2.0");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: PiConfig =
            serde_json::from_str(r#"{"network": "sandbox", "api_key": "k"}"#).unwrap();
        assert_eq!(cfg.network, PiNetwork::Testnet);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.timeout_secs, 15);
        assert!(!cfg.mock_auth);
    }

    #[test]
    fn scopes() {
        assert_eq!(PiScope::parse("payments"), Some(PiScope::Payments));
        assert_eq!(PiScope::parse("wallet_address"), Some(PiScope::WalletAddress));
        assert_eq!(PiScope::parse("email"), None);
    }

    #[test]
    fn payment_decodes_partial_api_response() {
        let json = serde_json::json!({
            "identifier": "pay_1",
            "user_uid": "u1",
            "amount": 3.14,
            "memo": "Tip",
            "status": {"developer_approved": true, "transaction_verified": true},
            "transaction": {"txid": "tx9", "verified": true, "_link": "https://x"}
        });
        let p: PiPayment = serde_json::from_value(json).unwrap();
        assert!(p.status.developer_approved);
        assert!(!p.status.developer_completed);
        assert_eq!(p.transaction.unwrap().txid, "tx9");
    }
}
