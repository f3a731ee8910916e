//! Wire codec for the JSON envelopes carried over WebSocket text frames.
//!
//! Client envelopes are JSON objects discriminated by an `"optype"` field.
//! The codec recognizes the session-level operations (`register`, `login`,
//! `enter_room`, `exit_room`); every other object is passed through as a
//! [`ClientRequest::Game`] value, since its meaning belongs to the game
//! logic and not to this layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope is not a JSON object")]
    NotAnObject,
}

/// A decoded client-to-server envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// Create an account.
    Register(Credentials),
    /// Establish the session identity.
    Login(Credentials),
    /// Record room presence for the authenticated user.
    EnterRoom,
    /// Clear room presence for the authenticated user.
    ExitRoom,
    /// Any other optype, relayed verbatim to the game logic.
    Game(Value),
}

/// Login/registration credentials.
///
/// Absent or `null` fields decode to `None`; whether that is acceptable is
/// the caller's decision, not a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields present and non-empty, or nothing.
    pub fn require(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

impl ClientRequest {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        let request = match value.get("optype").and_then(Value::as_str) {
            Some("register") => ClientRequest::Register(Credentials::deserialize(&value)?),
            Some("login") => ClientRequest::Login(Credentials::deserialize(&value)?),
            Some("enter_room") => ClientRequest::EnterRoom,
            Some("exit_room") => ClientRequest::ExitRoom,
            _ => ClientRequest::Game(value),
        };
        Ok(request)
    }
}

/// A server-to-client envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "optype", rename_all = "snake_case")]
pub enum ServerReply {
    Register(Ack),
    Login(LoginReply),
    EnterRoom(Ack),
    ExitRoom(Ack),
    /// Protocol-level failure not tied to a recognized operation.
    Error(Ack),
}

/// Outcome of an operation, with a reason on failure.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            result: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            result: false,
            reason: Some(reason.into()),
        }
    }
}

/// Login outcome; the profile fields are flattened into the envelope on
/// success so the client sees `{"optype":"login","result":true,"id":...}`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginReply {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub profile: Option<ProfileBody>,
}

/// Profile echo carried by a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileBody {
    pub id: u64,
    pub score: i64,
    pub total_count: i64,
    pub win_count: i64,
}

impl ServerReply {
    pub fn register_ok() -> Self {
        Self::Register(Ack::ok())
    }

    pub fn register_fail(reason: impl Into<String>) -> Self {
        Self::Register(Ack::fail(reason))
    }

    pub fn login_ok(profile: ProfileBody) -> Self {
        Self::Login(LoginReply {
            result: true,
            reason: None,
            profile: Some(profile),
        })
    }

    pub fn login_fail(reason: impl Into<String>) -> Self {
        Self::Login(LoginReply {
            result: false,
            reason: Some(reason.into()),
            profile: None,
        })
    }

    pub fn enter_room_ok() -> Self {
        Self::EnterRoom(Ack::ok())
    }

    pub fn enter_room_fail(reason: impl Into<String>) -> Self {
        Self::EnterRoom(Ack::fail(reason))
    }

    pub fn exit_room_ok() -> Self {
        Self::ExitRoom(Ack::ok())
    }

    pub fn exit_room_fail(reason: impl Into<String>) -> Self {
        Self::ExitRoom(Ack::fail(reason))
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error(Ack::fail(reason))
    }

    /// Encode as a text frame. Encoding these types cannot realistically
    /// fail; a bare error envelope is the fallback if it ever does.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"optype":"error","result":false}"#.to_string())
    }
}
