//! License status transitions.
//!
//! Pure functions over (status, expiry, action, now). Callers load the row,
//! apply the transition and persist the result inside one store transaction.
//!
//! | action | from | to |
//! |---|---|---|
//! | suspend | any | suspended |
//! | resume | valid, suspended | valid |
//! | resume | cancelled | cancelled (no-op, not an error) |
//! | cancel | any | cancelled |
//! | renew(days) | any | valid, expiry = max(expiry, now) + days |

use serde_json::Value;

use crate::error::{AppError, Result, msg};
use crate::models::LicenseStatus;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Term of a freshly provisioned license, and the default renewal length.
pub const DEFAULT_TERM_DAYS: i64 = 365;

pub const MAX_EXTEND_DAYS: i64 = 36_500;

/// Valid and strictly unexpired.
pub fn is_active(status: LicenseStatus, expires_at: i64, now: i64) -> bool {
    status == LicenseStatus::Valid && expires_at > now
}

/// Expiry for a license created at `now`.
pub fn initial_expiry(now: i64) -> i64 {
    now + DEFAULT_TERM_DAYS * SECONDS_PER_DAY
}

/// Renewal base: stack onto a future expiry, otherwise start from now.
pub fn renewed_expiry(expires_at: i64, now: i64, days: i64) -> i64 {
    expires_at.max(now) + days * SECONDS_PER_DAY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseAction {
    Suspend,
    Resume,
    Cancel,
    Renew { days: i64 },
}

impl LicenseAction {
    /// Parses an action name (case-insensitive, surrounding whitespace ignored).
    /// `extend_days` is only read for `renew`.
    pub fn parse(action: &str, extend_days: Option<&Value>) -> Result<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "suspend" => Ok(Self::Suspend),
            "resume" => Ok(Self::Resume),
            "cancel" => Ok(Self::Cancel),
            "renew" => Ok(Self::Renew {
                days: parse_extend_days(extend_days)?,
            }),
            _ => Err(AppError::BadRequest(msg::UNKNOWN_ACTION.into())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Renew { .. } => "renew",
        }
    }
}

/// Accepts a JSON integer or a string holding one. Absent or null means the default term.
pub fn parse_extend_days(value: Option<&Value>) -> Result<i64> {
    let days = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_TERM_DAYS),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
    .ok_or_else(|| AppError::BadRequest(msg::EXTEND_DAYS_NOT_INTEGER.into()))?;

    if !(1..=MAX_EXTEND_DAYS).contains(&days) {
        return Err(AppError::BadRequest(msg::EXTEND_DAYS_OUT_OF_RANGE.into()));
    }
    Ok(days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseState {
    pub status: LicenseStatus,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: LicenseState,
    /// False when the action left the license untouched.
    pub changed: bool,
}

pub fn apply(current: LicenseState, action: LicenseAction, now: i64) -> Transition {
    let next = match action {
        LicenseAction::Suspend => LicenseState {
            status: LicenseStatus::Suspended,
            ..current
        },
        LicenseAction::Resume if current.status == LicenseStatus::Cancelled => current,
        LicenseAction::Resume => LicenseState {
            status: LicenseStatus::Valid,
            ..current
        },
        LicenseAction::Cancel => LicenseState {
            status: LicenseStatus::Cancelled,
            ..current
        },
        LicenseAction::Renew { days } => LicenseState {
            status: LicenseStatus::Valid,
            expires_at: renewed_expiry(current.expires_at, now, days),
        },
    };

    Transition {
        state: next,
        changed: next != current,
    }
}
