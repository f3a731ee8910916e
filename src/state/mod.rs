//! Shared server state and the per-connection session model.

pub mod presence;
pub mod session;

pub use presence::{ConnectionHandle, Directory, PresenceRegistry};
pub use session::Session;

use crate::db::Database;
use crate::game::GameBridge;
use std::sync::Arc;

/// Everything a connection task needs, constructed once in `main` and
/// shared behind an `Arc`. There are no ambient singletons: tests build
/// their own instances.
pub struct Hub {
    /// Server name, used in logs.
    pub server_name: String,
    /// The user store.
    pub db: Database,
    /// Hall and room directories.
    pub presence: PresenceRegistry,
    /// Where authenticated game envelopes are handed off.
    pub game: Arc<dyn GameBridge>,
}

impl Hub {
    pub fn new(server_name: String, db: Database, game: Arc<dyn GameBridge>) -> Self {
        Self {
            server_name,
            db,
            presence: PresenceRegistry::new(),
            game,
        }
    }
}
