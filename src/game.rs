//! Boundary to the game and matchmaking logic.
//!
//! Board rules and room matchmaking live outside this crate. The router
//! only needs somewhere to hand authenticated envelopes it does not itself
//! understand.

use crate::db::UserId;
use serde_json::Value;
use tracing::debug;

/// Receives game-relevant envelopes from authenticated connections.
pub trait GameBridge: Send + Sync {
    /// Deliver one envelope. Implementations must not block the caller.
    fn forward(&self, uid: UserId, envelope: Value);
}

/// Bridge used until real game logic is wired in: logs and drops.
#[derive(Debug, Default)]
pub struct DiscardBridge;

impl GameBridge for DiscardBridge {
    fn forward(&self, uid: UserId, envelope: Value) {
        let optype = envelope
            .get("optype")
            .and_then(Value::as_str)
            .unwrap_or("<none>");
        debug!(uid, optype, "no game logic attached, dropping envelope");
    }
}
