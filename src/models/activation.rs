use serde::{Deserialize, Serialize};

/// Binding of one license to one caller-supplied instance identifier
/// (host, machine id or URL). Revocations are kept, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    pub id: String,
    pub license_id: String,
    pub instance_id: String,
    pub created_at: i64,
    pub revoked_at: Option<i64>,
}

impl Activation {
    pub fn is_live(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// What an activate call did to a single (license, instance) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Created,
    /// Already live; nothing written.
    AlreadyActive,
    /// Previously revoked; revocation cleared.
    Reactivated,
}
