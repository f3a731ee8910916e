//! Core of the gobang (five-in-a-row) online battle platform backend.
//!
//! A WebSocket front end over a SQLite-backed user store and an in-memory
//! presence registry:
//!
//! - [`protocol`] - JSON envelope codec for the WebSocket text frames
//! - [`db`] - user accounts, credentials, and ladder scores
//! - [`state`] - hall/room presence directories and session identity
//! - [`network`] - listener and per-connection event routing
//! - [`game`] - the seam to out-of-tree board and matchmaking logic
//!
//! Board rules and matchmaking are external collaborators: the router
//! forwards envelopes it does not recognize through [`game::GameBridge`].

pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod http;
pub mod metrics;
pub mod network;
pub mod protocol;
pub mod state;
