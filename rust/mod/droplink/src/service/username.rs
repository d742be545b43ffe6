use thiserror::Error;

use droplink_sql::Value;

use crate::service::{DroplinkError, DroplinkService};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 30;

/// Handles that collide with app routes or look official.
pub const RESERVED_USERNAMES: &[&str] = &[
    "about", "admin", "api", "app", "auth", "blog", "dashboard", "droplink", "forum", "help",
    "login", "logout", "pi", "pricing", "privacy", "profile", "root", "settings", "signup",
    "static", "support", "system", "terms", "www",
];

/// Why a username was rejected. The messages are shown verbatim by the
/// signup form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("Username is required")]
    Empty,

    #[error("Username must be at least 3 characters long")]
    TooShort,

    #[error("Username must be 30 characters or less")]
    TooLong,

    #[error("Username can only contain letters, numbers, underscores, and hyphens")]
    InvalidCharacters,

    #[error("This username is reserved and cannot be used")]
    Reserved,
}

impl From<UsernameError> for DroplinkError {
    fn from(e: UsernameError) -> Self {
        DroplinkError::Validation(e.to_string())
    }
}

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameStatus {
    Available(String),
    Taken,
    Invalid(UsernameError),
}

pub const USERNAME_TAKEN: &str = "This username is already taken";

fn allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_reserved(lower: &str) -> bool {
    RESERVED_USERNAMES.contains(&lower)
}

/// Validate a requested username and return its stored (lowercase) form.
pub fn validate_username(raw: &str) -> Result<String, UsernameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(UsernameError::Empty);
    }
    let len = name.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(UsernameError::TooShort);
    }
    if len > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong);
    }
    if !name.chars().all(allowed_char) {
        return Err(UsernameError::InvalidCharacters);
    }
    let lower = name.to_ascii_lowercase();
    if is_reserved(&lower) {
        return Err(UsernameError::Reserved);
    }
    Ok(lower)
}

/// Turn a Pi username into something [`validate_username`] accepts.
/// The result may still be taken; see [`DroplinkService::unique_username_from`].
fn sanitize_base(pi_username: &str) -> String {
    let mut base: String = pi_username
        .chars()
        .filter(|c| allowed_char(*c))
        .take(MAX_USERNAME_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    if base.chars().count() < MIN_USERNAME_LEN {
        base = format!("pi_{}", base);
    }
    if is_reserved(&base) {
        base = format!("{}_pi", base);
    }
    base
}

/// `base` with `suffix` appended, shortening `base` to stay within the limit.
fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_USERNAME_LEN - suffix.len();
    let head: String = base.chars().take(room).collect();
    format!("{}{}", head, suffix)
}

impl DroplinkService {
    pub(crate) fn username_taken(&self, lower: &str) -> Result<bool, DroplinkError> {
        let n = self.count(
            "SELECT COUNT(*) AS cnt FROM profiles WHERE username = ?1",
            &[Value::Text(lower.to_string())],
        )?;
        Ok(n > 0)
    }

    /// Validate and look up a username.
    pub fn check_username(&self, raw: &str) -> Result<UsernameStatus, DroplinkError> {
        let lower = match validate_username(raw) {
            Ok(l) => l,
            Err(e) => return Ok(UsernameStatus::Invalid(e)),
        };
        if self.username_taken(&lower)? {
            Ok(UsernameStatus::Taken)
        } else {
            Ok(UsernameStatus::Available(lower))
        }
    }

    /// First free username derived from a Pi username: `alice`, `alice2`, ...
    pub(crate) fn unique_username_from(&self, pi_username: &str) -> Result<String, DroplinkError> {
        let base = sanitize_base(pi_username);
        if !self.username_taken(&base)? {
            return Ok(base);
        }
        for n in 2..10_000u32 {
            let candidate = with_suffix(&base, &n.to_string());
            if !self.username_taken(&candidate)? {
                return Ok(candidate);
            }
        }
        Err(DroplinkError::Conflict(format!(
            "no free username derived from '{}'",
            pi_username
        )))
    }
}
