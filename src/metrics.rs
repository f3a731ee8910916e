//! Prometheus metrics for gobangd.
//!
//! Tracks connection counts, presence occupancy, and auth outcomes. All
//! recording helpers are no-ops until [`init`] runs, so tests and
//! metrics-disabled deployments skip the registry entirely.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Currently connected WebSocket clients, in any session state.
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Users currently present in the hall.
pub static HALL_PRESENT: OnceLock<IntGauge> = OnceLock::new();

/// Users currently present in a room.
pub static ROOM_PRESENT: OnceLock<IntGauge> = OnceLock::new();

/// Login attempts by outcome.
pub static LOGINS: OnceLock<IntCounterVec> = OnceLock::new();

/// Registration attempts by outcome.
pub static REGISTRATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Envelopes handed to the game bridge.
pub static GAME_FORWARDED: OnceLock<IntCounter> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($slot:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($slot), " creation failed"));
            r.register(Box::new(m.clone()))
                .expect(concat!(stringify!($slot), " registration failed"));
            let _ = $slot.set(m);
        };
    }

    register!(
        CONNECTED_CLIENTS,
        IntGauge::new("gobangd_connected_clients", "Currently connected clients")
    );
    register!(
        HALL_PRESENT,
        IntGauge::new("gobangd_hall_present", "Users present in the hall")
    );
    register!(
        ROOM_PRESENT,
        IntGauge::new("gobangd_room_present", "Users present in a room")
    );
    register!(
        LOGINS,
        IntCounterVec::new(
            Opts::new("gobangd_logins_total", "Login attempts by outcome"),
            &["outcome"]
        )
    );
    register!(
        REGISTRATIONS,
        IntCounterVec::new(
            Opts::new(
                "gobangd_registrations_total",
                "Registration attempts by outcome"
            ),
            &["outcome"]
        )
    );
    register!(
        GAME_FORWARDED,
        IntCounter::new(
            "gobangd_game_envelopes_forwarded_total",
            "Envelopes handed to the game bridge"
        )
    );
}

pub fn inc_connected() {
    if let Some(gauge) = CONNECTED_CLIENTS.get() {
        gauge.inc();
    }
}

pub fn dec_connected() {
    if let Some(gauge) = CONNECTED_CLIENTS.get() {
        gauge.dec();
    }
}

pub fn login_outcome(outcome: &str) {
    if let Some(counter) = LOGINS.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn registration_outcome(outcome: &str) {
    if let Some(counter) = REGISTRATIONS.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn game_forwarded() {
    if let Some(counter) = GAME_FORWARDED.get() {
        counter.inc();
    }
}

/// Refresh the presence gauges from the registry's current occupancy.
pub fn sync_presence(presence: &crate::state::PresenceRegistry) {
    if let Some(gauge) = HALL_PRESENT.get() {
        gauge.set(presence.hall().len() as i64);
    }
    if let Some(gauge) = ROOM_PRESENT.get() {
        gauge.set(presence.room().len() as i64);
    }
}

/// Render all metrics in Prometheus text format.
pub fn gather() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&registry().gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
