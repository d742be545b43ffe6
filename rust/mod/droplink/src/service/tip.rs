use tracing::{info, warn};

use droplink_core::new_id;
use droplink_sql::Value;

use crate::model::{CreateTip, Tip, TipStatus, TipTotal};
use crate::pi::PiPayment;
use crate::plan::{plan_features, Feature};
use crate::service::{check_len, non_empty, DroplinkError, DroplinkService};

/// Largest single tip, in Pi.
pub const MAX_TIP_AMOUNT: f64 = 10_000.0;
const MAX_TIP_MESSAGE: usize = 280;
const MAX_PAYMENT_ID: usize = 128;

/// Pi payment ids are opaque tokens of letters, digits, `_` and `-`.
fn payment_id(raw: &str) -> Result<&str, DroplinkError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(DroplinkError::Validation("paymentId is required".into()));
    }
    if id.len() > MAX_PAYMENT_ID
        || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DroplinkError::Validation("paymentId is malformed".into()));
    }
    Ok(id)
}

impl DroplinkService {
    fn tip_columns(tip: &Tip) -> Vec<(&'static str, Value)> {
        vec![
            ("status", Value::Text(tip.status.as_str().to_string())),
            ("payment_id", tip.payment_id.clone().into()),
            ("updated_at", Value::Text(tip.updated_at.clone())),
        ]
    }

    /// Record a pending tip to `username`.
    pub fn create_tip(&self, username: &str, input: CreateTip) -> Result<Tip, DroplinkError> {
        let profile = self.get_profile_by_username(username)?;
        if !plan_features(profile.plan).pi_tips {
            return Err(DroplinkError::PlanLimit(format!(
                "this profile does not accept tips; requires the {} plan",
                Feature::PiTips.required_plan()
            )));
        }
        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(DroplinkError::Validation("amount must be greater than 0".into()));
        }
        if input.amount > MAX_TIP_AMOUNT {
            return Err(DroplinkError::Validation(format!(
                "amount must be {} Pi or less",
                MAX_TIP_AMOUNT
            )));
        }
        let message = non_empty(input.message);
        if let Some(m) = &message {
            check_len("message", m, 0, MAX_TIP_MESSAGE)?;
        }
        let payment = match non_empty(input.payment_id) {
            Some(raw) => Some(payment_id(&raw)?.to_string()),
            None => None,
        };

        let now = self.timestamp();
        let tip = Tip {
            id: new_id(),
            profile_id: profile.id,
            amount: input.amount,
            message,
            payer: non_empty(input.payer),
            status: TipStatus::Pending,
            payment_id: payment,
            txid: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let mut columns = Self::tip_columns(&tip);
        columns.push(("profile_id", Value::Text(tip.profile_id.clone())));
        columns.push(("amount", Value::Real(tip.amount)));
        columns.push(("created_at", Value::Text(now)));
        self.insert_record("tips", &tip.id, &tip, &columns).map_err(|e| match e {
            DroplinkError::Conflict(_) => {
                DroplinkError::Conflict("a tip for this payment already exists".into())
            }
            other => other,
        })?;

        info!(tip_id = %tip.id, profile_id = %tip.profile_id, amount = tip.amount, "tip created");
        Ok(tip)
    }

    pub fn find_tip_by_payment(&self, payment_id: &str) -> Result<Option<Tip>, DroplinkError> {
        self.find_record("tips", "payment_id", Value::Text(payment_id.to_string()))
    }

    fn set_tip_status(&self, mut tip: Tip, status: TipStatus, txid: Option<String>) -> Result<Tip, DroplinkError> {
        tip.status = status;
        if txid.is_some() {
            tip.txid = txid;
        }
        tip.updated_at = self.timestamp();
        self.update_record("tips", &tip.id, &tip, &Self::tip_columns(&tip))?;
        Ok(tip)
    }

    /// Server-side approval of a Pi payment.
    pub async fn approve_payment(&self, raw_id: &str) -> Result<PiPayment, DroplinkError> {
        let payment_id = payment_id(raw_id)?;
        let payment = self.pi.approve_payment(payment_id).await.map_err(|e| {
            warn!(payment_id = %payment_id, error = %e, "payment approval failed");
            DroplinkError::from(e)
        })?;
        info!(payment_id = %payment_id, "payment approved");
        Ok(payment)
    }

    /// Server-side completion of a Pi payment. The matching tip, if still
    /// pending, becomes completed with the transaction id.
    pub async fn complete_payment(&self, raw_id: &str, txid: &str) -> Result<PiPayment, DroplinkError> {
        let payment_id = payment_id(raw_id)?;
        let txid = txid.trim();
        if txid.is_empty() {
            return Err(DroplinkError::Validation("txid is required".into()));
        }
        let payment = self.pi.complete_payment(payment_id, txid).await.map_err(|e| {
            warn!(payment_id = %payment_id, error = %e, "payment completion failed");
            DroplinkError::from(e)
        })?;

        match self.find_tip_by_payment(payment_id)? {
            Some(tip) if tip.status == TipStatus::Pending => {
                let tip = self.set_tip_status(tip, TipStatus::Completed, Some(txid.to_string()))?;
                info!(payment_id = %payment_id, tip_id = %tip.id, "tip completed");
            }
            Some(tip) => {
                warn!(payment_id = %payment_id, tip_id = %tip.id, status = tip.status.as_str(), "payment completed for a settled tip");
            }
            None => info!(payment_id = %payment_id, "payment completed"),
        }
        Ok(payment)
    }

    /// Cancel a Pi payment and its pending tip.
    pub async fn cancel_payment(&self, raw_id: &str) -> Result<PiPayment, DroplinkError> {
        let payment_id = payment_id(raw_id)?;
        let payment = self.pi.cancel_payment(payment_id).await.map_err(|e| {
            warn!(payment_id = %payment_id, error = %e, "payment cancellation failed");
            DroplinkError::from(e)
        })?;
        if let Some(tip) = self.find_tip_by_payment(payment_id)? {
            if tip.status == TipStatus::Pending {
                self.set_tip_status(tip, TipStatus::Cancelled, None)?;
            }
        }
        info!(payment_id = %payment_id, "payment cancelled");
        Ok(payment)
    }

    /// Tips received by a profile, newest first.
    pub fn list_tips(&self, profile_id: &str) -> Result<Vec<Tip>, DroplinkError> {
        self.query_records(
            "SELECT data FROM tips WHERE profile_id = ?1 ORDER BY created_at DESC",
            &[Value::Text(profile_id.to_string())],
        )
    }

    /// Count and sum of completed tips.
    pub fn tip_total(&self, profile_id: &str) -> Result<TipTotal, DroplinkError> {
        let row = self.sql.query_one(
            "SELECT COUNT(*) AS cnt, COALESCE(SUM(amount), 0.0) AS total FROM tips \
             WHERE profile_id = ?1 AND status = 'completed'",
            &[Value::Text(profile_id.to_string())],
        )?;
        Ok(match row {
            Some(r) => TipTotal {
                count: r.get_i64("cnt").unwrap_or(0).max(0) as u64,
                amount: r.get_f64("total").unwrap_or(0.0),
            },
            None => TipTotal { count: 0, amount: 0.0 },
        })
    }
}
