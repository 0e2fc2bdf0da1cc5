use crate::error::SyncError;
use crate::record::Record;

/// The currently active actor, as resolved by the caller (e.g. from
/// `.gitgov/.session.json` plus whatever credential store it consults).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

/// Signing is always delegated — the engine never holds key material.
///
/// `sign_record` is pure with respect to its inputs: given the same record,
/// actor, and role it recomputes `header.payloadChecksum` and appends one
/// new signature; it must never replace or remove existing signatures.
pub trait Identity: Send + Sync {
    fn get_current_actor(&self) -> Result<Actor, SyncError>;
    fn sign_record(&self, record: Record, actor_id: &str, role: &str) -> Result<Record, SyncError>;
}
