pub mod ads;
pub mod analytics;
pub mod auth;
pub mod forum;
pub mod link;
pub mod profile;
pub mod schema;
pub mod tip;
pub mod username;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use droplink_core::{format_timestamp, Clock, ServiceError};
use droplink_kv::{KVError, KVStore};
use droplink_sql::{Row, SQLError, SQLStore, Value};

use crate::pi::{PiConfig, PiError, PiPlatform};

/// Droplink service error type.
#[derive(Debug, Error)]
pub enum DroplinkError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// The profile's plan does not include the feature or quota.
    #[error("{0}")]
    PlanLimit(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl From<DroplinkError> for ServiceError {
    fn from(e: DroplinkError) -> Self {
        match e {
            DroplinkError::NotFound(m) => ServiceError::NotFound(m),
            DroplinkError::Conflict(m) => ServiceError::Conflict(m),
            DroplinkError::Validation(m) => ServiceError::Validation(m),
            DroplinkError::Unauthorized(m) => ServiceError::Unauthorized(m),
            DroplinkError::Forbidden(m) => ServiceError::PermissionDenied(m),
            DroplinkError::PlanLimit(m) => ServiceError::PlanLimit(m),
            DroplinkError::Upstream(m) => ServiceError::Upstream(m),
            DroplinkError::Storage(m) => ServiceError::Storage(m),
            DroplinkError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

impl From<SQLError> for DroplinkError {
    fn from(e: SQLError) -> Self {
        DroplinkError::Storage(e.to_string())
    }
}

impl From<KVError> for DroplinkError {
    fn from(e: KVError) -> Self {
        DroplinkError::Storage(e.to_string())
    }
}

impl From<PiError> for DroplinkError {
    fn from(e: PiError) -> Self {
        match e {
            PiError::InvalidToken => DroplinkError::Unauthorized(e.to_string()),
            PiError::PaymentNotFound(_) => DroplinkError::NotFound(e.to_string()),
            _ => DroplinkError::Upstream(e.to_string()),
        }
    }
}

/// Configuration for the Droplink service.
#[derive(Debug, Clone)]
pub struct DroplinkConfig {
    /// HS256 signing secret for session tokens.
    pub jwt_secret: String,
    /// Session token lifetime in seconds (default: 7 days).
    pub session_ttl: i64,
    /// How long one watched ad unlocks gated content, in minutes.
    pub ad_window_minutes: i64,
    pub pi: PiConfig,
}

impl Default for DroplinkConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "droplink-dev-secret-change-me".to_string(),
            session_ttl: 7 * 24 * 3600,
            ad_window_minutes: 30,
            pi: PiConfig::default(),
        }
    }
}

/// The Droplink service. Holds storage backends, the Pi client and config.
pub struct DroplinkService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) kv: Arc<dyn KVStore>,
    pub(crate) pi: Arc<dyn PiPlatform>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: DroplinkConfig,
}

impl DroplinkService {
    /// Create the service, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        kv: Arc<dyn KVStore>,
        pi: Arc<dyn PiPlatform>,
        clock: Arc<dyn Clock>,
        config: DroplinkConfig,
    ) -> Result<Arc<Self>, DroplinkError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self {
            sql,
            kv,
            pi,
            clock,
            config,
        }))
    }

    pub fn config(&self) -> &DroplinkConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn timestamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    // ── Generic record helpers ──
    //
    // Every table stores the full record as JSON in `data`, plus the
    // columns it is queried or ordered by.

    /// Insert a record with its indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        columns: &[(&str, Value)],
    ) -> Result<(), DroplinkError> {
        let json = serde_json::to_string(record).map_err(|e| DroplinkError::Internal(e.to_string()))?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];
        for (col, val) in columns {
            cols.push(*col);
            params.push(val.clone());
            placeholders.push(format!("?{}", params.len()));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params).map_err(|e| match e {
            SQLError::Constraint(msg) => DroplinkError::Conflict(msg),
            other => DroplinkError::Storage(other.to_string()),
        })?;
        Ok(())
    }

    /// Fetch one record by id.
    pub(crate) fn get_record<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<T, DroplinkError> {
        self.find_record(table, "id", Value::Text(id.to_string()))?
            .ok_or_else(|| DroplinkError::NotFound(format!("{} '{}' not found", singular(table), id)))
    }

    /// Fetch one record by a unique column, if present.
    pub(crate) fn find_record<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: Value,
    ) -> Result<Option<T>, DroplinkError> {
        let sql = format!("SELECT data FROM {} WHERE {} = ?1 LIMIT 1", table, column);
        match self.sql.query_one(&sql, &[value])? {
            Some(row) => Ok(Some(decode_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Replace a record's JSON and update indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        columns: &[(&str, Value)],
    ) -> Result<(), DroplinkError> {
        let json = serde_json::to_string(record).map_err(|e| DroplinkError::Internal(e.to_string()))?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params = vec![Value::Text(json)];
        for (col, val) in columns {
            params.push(val.clone());
            sets.push(format!("{} = ?{}", col, params.len()));
        }
        params.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            params.len(),
        );

        let affected = self.sql.exec(&sql, &params).map_err(|e| match e {
            SQLError::Constraint(msg) => DroplinkError::Conflict(msg),
            other => DroplinkError::Storage(other.to_string()),
        })?;
        if affected == 0 {
            return Err(DroplinkError::NotFound(format!("{} '{}' not found", singular(table), id)));
        }
        Ok(())
    }

    pub(crate) fn delete_record(&self, table: &str, id: &str) -> Result<(), DroplinkError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let affected = self.sql.exec(&sql, &[Value::Text(id.to_string())])?;
        if affected == 0 {
            return Err(DroplinkError::NotFound(format!("{} '{}' not found", singular(table), id)));
        }
        Ok(())
    }

    /// Run a query selecting `data` and decode every row.
    pub(crate) fn query_records<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, DroplinkError> {
        self.sql.query(sql, params)?.iter().map(decode_row).collect()
    }

    /// `SELECT COUNT(*) AS cnt ...` helper.
    pub(crate) fn count(&self, sql: &str, params: &[Value]) -> Result<u64, DroplinkError> {
        Ok(self
            .sql
            .query_one(sql, params)?
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0)
            .max(0) as u64)
    }
}

/// Decode the `data` column of a row.
pub(crate) fn decode_row<T: DeserializeOwned>(row: &Row) -> Result<T, DroplinkError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| DroplinkError::Internal("missing data column".into()))?;
    serde_json::from_str(data).map_err(|e| DroplinkError::Internal(e.to_string()))
}

/// `forum_topics` → `forum topic`, for error messages.
fn singular(table: &str) -> String {
    table.trim_end_matches('s').replace('_', " ")
}

/// Trim and drop empty strings.
pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Reject strings longer than `max` characters.
pub(crate) fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), DroplinkError> {
    let n = value.chars().count();
    if n < min {
        return Err(if min == 1 {
            DroplinkError::Validation(format!("{} is required", field))
        } else {
            DroplinkError::Validation(format!("{} must be at least {} characters", field, min))
        });
    }
    if n > max {
        return Err(DroplinkError::Validation(format!(
            "{} must be {} characters or less",
            field, max
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use droplink_core::ManualClock;
    use droplink_kv::MemoryStore;
    use droplink_sql::SqliteStore;

    use super::{DroplinkConfig, DroplinkService};
    use crate::pi::MockPiPlatform;

    /// Service on in-memory stores with the mock Pi platform and a
    /// hand-driven clock.
    pub fn service() -> (Arc<DroplinkService>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let svc = DroplinkService::new(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            Arc::new(MemoryStore::new()),
            Arc::new(MockPiPlatform::new()),
            clock.clone(),
            DroplinkConfig::default(),
        )
        .unwrap();
        (svc, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_names() {
        assert_eq!(singular("profiles"), "profile");
        assert_eq!(singular("forum_topics"), "forum topic");
    }

    #[test]
    fn check_len_messages() {
        let err = check_len("title", "", 1, 10).unwrap_err();
        assert_eq!(err.to_string(), "title is required");
        let err = check_len("title", "ab", 3, 10).unwrap_err();
        assert_eq!(err.to_string(), "title must be at least 3 characters");
        let err = check_len("title", "abcdef", 1, 5).unwrap_err();
        assert_eq!(err.to_string(), "title must be 5 characters or less");
        assert!(check_len("title", "abc", 1, 5).is_ok());
    }

    #[test]
    fn pi_errors_map_to_service_errors() {
        let e: DroplinkError = PiError::InvalidToken.into();
        assert!(matches!(e, DroplinkError::Unauthorized(_)));
        let e: DroplinkError = PiError::Timeout.into();
        assert!(matches!(e, DroplinkError::Upstream(_)));
        let s: ServiceError = DroplinkError::PlanLimit("x".into()).into();
        assert_eq!(s.error_code(), "PLAN_LIMIT");
    }
}
