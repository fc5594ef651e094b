//! Records that travel on the wire.
//!
//! Inbound and outbound records are internally tagged JSON objects:
//! `#[serde(tag = "type", rename_all = "snake_case")]` turns
//! `ClientMessage::Action { .. }` into `{"type": "action", ...}`, which is
//! the shape browser and terminal clients expect.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable identifier of a participant.
///
/// Allocated by the session registry when a connection is accepted and
/// never reused within a process. `#[serde(transparent)]` keeps it a plain
/// number on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every way a request can fail, as reported to clients.
///
/// The split that matters is [`ErrorKind::is_public`]: public kinds are
/// legitimate (if unsuccessful) action outcomes that everyone sees and that
/// consume the turn; the rest go only to the session that caused them and
/// leave all state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The sender has not joined the game yet.
    UnknownParticipant,
    /// Somebody else holds the turn.
    NotYourTurn,
    /// An action is already being processed.
    ActionInProgress,
    /// A dice expression could not be evaluated.
    InvalidExpression,
    /// There is no usable exit in the requested direction.
    NoExit,
    /// The action tag is not one the server knows.
    UnknownAction,
    /// The frame could not be understood.
    MalformedMessage,
    /// A session's channel could not be written to.
    TransportFailure,
}

impl ErrorKind {
    /// Returns `true` for failures that are broadcast as an action result.
    pub fn is_public(self) -> bool {
        matches!(
            self,
            Self::InvalidExpression | Self::NoExit | Self::UnknownAction
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownParticipant => "unknown_participant",
            Self::NotYourTurn => "not_your_turn",
            Self::ActionInProgress => "action_in_progress",
            Self::InvalidExpression => "invalid_expression",
            Self::NoExit => "no_exit",
            Self::UnknownAction => "unknown_action",
            Self::MalformedMessage => "malformed_message",
            Self::TransportFailure => "transport_failure",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Action payloads
// ---------------------------------------------------------------------------

/// Phase marker carried by `action_announcement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Starting,
}

/// Structured, action-specific data attached to an `action_result`.
///
/// Serialized `untagged`: the surrounding `action_result` already names
/// the action, so the details are just the bare key/value object.
/// Failed actions carry [`ActionDetails::Empty`], which is `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDetails {
    /// Outcome of a dice roll. `parts` are in roll order.
    Roll {
        expression: String,
        total: i64,
        parts: Vec<u32>,
        modifier: i64,
    },
    /// A completed move between two rooms (display names).
    Move {
        direction: String,
        from: String,
        to: String,
    },
    /// What the participant sees in their current room.
    Look {
        room: String,
        description: String,
        exits: Vec<String>,
    },
    Empty {},
}

impl Default for ActionDetails {
    fn default() -> Self {
        Self::Empty {}
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Records a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// "Call me this." Only honoured once per session.
    Connect { player_name: String },

    /// "I take my turn." `action` is the raw tag; the server decides
    /// whether it names a known action.
    Action {
        action: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Out-of-turn talk. With a `target` name it is whispered.
    Chat {
        message: String,
        #[serde(default)]
        target: Option<String>,
    },

    /// "Whose turn is it?"
    Status,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Records the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First record on every connection.
    Welcome {
        player_id: ParticipantId,
        message: String,
    },

    /// Private acknowledgement of a `connect`.
    Connected {
        player_name: String,
        message: String,
    },

    PlayerJoined { player: String },

    PlayerLeft { player: String },

    /// Broadcast before an action executes.
    ActionAnnouncement {
        player: String,
        action: String,
        args: Vec<String>,
        status: ActionStatus,
    },

    /// Broadcast once an action has executed, successfully or not.
    ActionResult {
        player: String,
        action: String,
        success: bool,
        result: String,
        details: ActionDetails,
    },

    NextTurn { player: String, message: String },

    NoPlayers { message: String },

    Chat {
        player: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    /// Answer to [`ClientMessage::Status`].
    TurnStatus {
        current_player: Option<String>,
        is_your_turn: bool,
        position: i64,
        queue_size: usize,
        in_flight: bool,
        up_next: Option<String>,
    },

    /// Private failure report. Never broadcast.
    Error { kind: ErrorKind, message: String },
}

impl ServerMessage {
    /// Shorthand for building an [`ServerMessage::Error`].
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. Clients parse these records by hand, so the
    //! exact field names and tags matter more than round-tripping.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_participant_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&ParticipantId(42)).unwrap(), "42");
        assert_eq!(ParticipantId(7).to_string(), "player-7");
    }

    #[test]
    fn test_participant_ids_order_by_allocation() {
        assert!(ParticipantId(1) < ParticipantId(2));
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_client_connect_parses() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "connect",
            "player_name": "Alice",
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Connect {
                player_name: "Alice".into()
            }
        );
    }

    #[test]
    fn test_client_action_args_default_to_empty() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "action", "action": "look"}))
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Action {
                action: "look".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_client_chat_target_is_optional() {
        let public: ClientMessage =
            serde_json::from_value(json!({"type": "chat", "message": "hi"}))
                .unwrap();
        assert_eq!(
            public,
            ClientMessage::Chat {
                message: "hi".into(),
                target: None
            }
        );

        let whisper: ClientMessage = serde_json::from_value(json!({
            "type": "chat", "message": "psst", "target": "Bob"
        }))
        .unwrap();
        assert!(matches!(
            whisper,
            ClientMessage::Chat { target: Some(ref t), .. } if t == "Bob"
        ));
    }

    #[test]
    fn test_client_status_has_no_fields() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "status"})).unwrap();
        assert_eq!(msg, ClientMessage::Status);
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "fly", "speed": 9000}));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_missing_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"player_name": "Alice"}));
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_server_welcome_json_format() {
        let json = serde_json::to_value(ServerMessage::Welcome {
            player_id: ParticipantId(3),
            message: "hi".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["player_id"], 3);
        assert_eq!(json["message"], "hi");
    }

    #[test]
    fn test_server_announcement_status_is_starting() {
        let json = serde_json::to_value(ServerMessage::ActionAnnouncement {
            player: "Alice".into(),
            action: "roll".into(),
            args: vec!["2d6".into()],
            status: ActionStatus::Starting,
        })
        .unwrap();
        assert_eq!(json["type"], "action_announcement");
        assert_eq!(json["status"], "starting");
        assert_eq!(json["args"], json!(["2d6"]));
    }

    #[test]
    fn test_server_roll_result_details_are_flat() {
        let json = serde_json::to_value(ServerMessage::ActionResult {
            player: "Alice".into(),
            action: "roll".into(),
            success: true,
            result: "Alice rolled 2d6: 7".into(),
            details: ActionDetails::Roll {
                expression: "2d6".into(),
                total: 7,
                parts: vec![4, 3],
                modifier: 0,
            },
        })
        .unwrap();
        assert_eq!(json["type"], "action_result");
        assert_eq!(json["details"]["total"], 7);
        assert_eq!(json["details"]["parts"], json!([4, 3]));
    }

    #[test]
    fn test_server_failed_result_has_empty_details() {
        let json = serde_json::to_value(ServerMessage::ActionResult {
            player: "Alice".into(),
            action: "roll".into(),
            success: false,
            result: "invalid dice expression".into(),
            details: ActionDetails::default(),
        })
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["details"], json!({}));
    }

    #[test]
    fn test_server_chat_omits_missing_target() {
        let json = serde_json::to_value(ServerMessage::Chat {
            player: "Alice".into(),
            message: "hello".into(),
            target: None,
        })
        .unwrap();
        assert_eq!(json["type"], "chat");
        assert!(json.get("target").is_none());
    }

    #[test]
    fn test_server_error_carries_kind() {
        let json = serde_json::to_value(ServerMessage::error(
            ErrorKind::NotYourTurn,
            "Not your turn!",
        ))
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "not_your_turn");
        assert_eq!(json["message"], "Not your turn!");
    }

    #[test]
    fn test_server_turn_status_with_empty_roster() {
        let json = serde_json::to_value(ServerMessage::TurnStatus {
            current_player: None,
            is_your_turn: false,
            position: -1,
            queue_size: 0,
            in_flight: false,
            up_next: None,
        })
        .unwrap();
        assert_eq!(json["type"], "turn_status");
        assert!(json["current_player"].is_null());
        assert_eq!(json["position"], -1);
    }

    // =====================================================================
    // ErrorKind
    // =====================================================================

    #[test]
    fn test_error_kind_public_split() {
        for kind in [
            ErrorKind::InvalidExpression,
            ErrorKind::NoExit,
            ErrorKind::UnknownAction,
        ] {
            assert!(kind.is_public(), "{kind} should be public");
        }
        for kind in [
            ErrorKind::UnknownParticipant,
            ErrorKind::NotYourTurn,
            ErrorKind::ActionInProgress,
            ErrorKind::MalformedMessage,
            ErrorKind::TransportFailure,
        ] {
            assert!(!kind.is_public(), "{kind} should be private");
        }
    }

    #[test]
    fn test_error_kind_display_matches_wire_name() {
        let wire = serde_json::to_value(ErrorKind::ActionInProgress).unwrap();
        assert_eq!(wire, json!(ErrorKind::ActionInProgress.to_string()));
    }
}
