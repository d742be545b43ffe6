use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{PiError, PiPayment, PiPaymentStatus, PiPlatform, PiTransaction, PiUser};

/// Stand-in for Pi Network when running outside the Pi Browser.
///
/// Every non-empty token is accepted and mapped to a stable fake user.
/// Payments are tracked in memory and any id may be approved.
#[derive(Debug, Default)]
pub struct MockPiPlatform {
    payments: Mutex<HashMap<String, PiPayment>>,
}

impl MockPiPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, payment_id: &str, f: F) -> Result<PiPayment, PiError>
    where
        F: FnOnce(&mut PiPayment) -> Result<(), PiError>,
    {
        let mut payments = self.payments.lock().unwrap_or_else(|e| e.into_inner());
        let payment = payments
            .entry(payment_id.to_string())
            .or_insert_with(|| PiPayment {
                identifier: payment_id.to_string(),
                user_uid: String::new(),
                amount: 0.0,
                memo: String::new(),
                metadata: serde_json::Value::Null,
                status: PiPaymentStatus::default(),
                transaction: None,
            });
        f(payment)?;
        Ok(payment.clone())
    }
}

#[async_trait]
impl PiPlatform for MockPiPlatform {
    async fn me(&self, access_token: &str) -> Result<PiUser, PiError> {
        let tag: String = access_token
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect::<String>()
            .to_ascii_lowercase();
        if tag.is_empty() {
            return Err(PiError::InvalidToken);
        }
        Ok(PiUser {
            uid: format!("mock-{}", tag),
            username: format!("mock_{}", tag),
            wallet_address: None,
        })
    }

    async fn approve_payment(&self, payment_id: &str) -> Result<PiPayment, PiError> {
        self.update(payment_id, |p| {
            p.status.developer_approved = true;
            Ok(())
        })
    }

    async fn complete_payment(&self, payment_id: &str, txid: &str) -> Result<PiPayment, PiError> {
        self.update(payment_id, |p| {
            if p.status.cancelled {
                return Err(PiError::Api {
                    status: 400,
                    body: "payment was cancelled".to_string(),
                });
            }
            p.status.transaction_verified = true;
            p.status.developer_completed = true;
            p.transaction = Some(PiTransaction {
                txid: txid.to_string(),
                verified: true,
            });
            Ok(())
        })
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<PiPayment, PiError> {
        self.update(payment_id, |p| {
            p.status.cancelled = true;
            Ok(())
        })
    }
}
