//! Presence registry: who is connected, and where.
//!
//! Two independent directories map a user identity to the connection handle
//! currently serving it: the hall (pre-match lobby) and the room (an active
//! match context). The directories know nothing about each other; whether a
//! user may occupy both at once is the game logic's business.
//!
//! The registry is process-lifetime state with no persistence. A restart
//! loses all presence.

use crate::db::UserId;
use crate::protocol::ServerReply;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Send half of a live connection's outgoing queue.
///
/// Clonable and non-owning: the connection task owns the socket, and sends
/// fail once that task has exited.
pub type ConnectionHandle = mpsc::Sender<ServerReply>;

/// One presence directory.
///
/// Shard locks are held only for the body of each operation and never
/// across an await point.
#[derive(Default)]
pub struct Directory {
    entries: DashMap<UserId, ConnectionHandle>,
}

impl Directory {
    /// Insert or overwrite the mapping for `uid`.
    ///
    /// A user entering twice keeps only the latest handle; the previous
    /// connection is neither closed nor notified.
    pub fn enter(&self, uid: UserId, handle: ConnectionHandle) {
        self.entries.insert(uid, handle);
    }

    /// Remove the mapping for `uid`. A no-op when absent.
    pub fn exit(&self, uid: UserId) {
        self.entries.remove(&uid);
    }

    /// Whether `uid` currently has an entry.
    pub fn contains(&self, uid: UserId) -> bool {
        self.entries.contains_key(&uid)
    }

    /// Current handle for `uid`, if present.
    ///
    /// The handle is only as live as the connection behind it: a close may
    /// race with the caller, so a send on the returned handle must tolerate
    /// failure. Absence means "cannot message this user", not an error.
    pub fn lookup(&self, uid: UserId) -> Option<ConnectionHandle> {
        self.entries.get(&uid).map(|entry| entry.value().clone())
    }

    /// Number of users present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The hall and room directories, constructed once at startup and handed to
/// the connection router.
#[derive(Default)]
pub struct PresenceRegistry {
    hall: Directory,
    room: Directory,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hall(&self) -> &Directory {
        &self.hall
    }

    pub fn room(&self) -> &Directory {
        &self.room
    }

    /// Drop `uid` from both directories. Used on connection close, where
    /// the user may be in the hall, a room, both, or neither; removal is
    /// idempotent either way.
    pub fn evict(&self, uid: UserId) {
        self.hall.exit(uid);
        self.room.exit(uid);
    }
}
