use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipStatus::Pending => "pending",
            TipStatus::Completed => "completed",
            TipStatus::Cancelled => "cancelled",
        }
    }
}

/// A Pi tip sent to a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub id: String,
    /// Recipient profile.
    pub profile_id: String,
    /// Amount in Pi.
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Pi username of the sender, when they chose to share it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    pub status: TipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTip {
    pub amount: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payer: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePaymentRequest {
    pub payment_id: String,
}

/// Body of the payment completion call. `apiKey` is accepted for
/// compatibility with older clients and ignored; the server key comes
/// from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    pub payment_id: String,
    pub txid: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipTotal {
    pub count: u64,
    pub amount: f64,
}
