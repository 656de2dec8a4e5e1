//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a UTF-8 JSON envelope `{ "type": ..., "payload": {...} }`.

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::game::card::Card;
use crate::game::state::PlayerId;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Claim the host role.
    HostConnect,

    /// Join as a player.
    PlayerJoin(JoinRequest),

    /// Host calls a number.
    HostDrawNumber(DrawRequest),

    /// Host starts a fresh round.
    HostResetGame,

    /// Player claims a win.
    PlayerClaimBingo(ClaimRequest),
}

/// Player join payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Display name; blank or missing becomes "Anonymous".
    #[serde(default)]
    pub name: Option<String>,
}

/// Draw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRequest {
    /// Number being called.
    pub number: u32,
}

/// Claim payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Numbers the player has marked. Null counts as empty; entries that
    /// are not integers are dropped.
    #[serde(default, deserialize_with = "lenient_marks")]
    pub marks: Vec<i64>,
}

fn lenient_marks<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().iter().filter_map(Value::as_i64).collect())
}

/// Raw inbound envelope before the payload is typed.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Inbound parse failures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Body is not a well-formed envelope, or the payload has the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Binary frame that is not UTF-8.
    #[error("message is not valid UTF-8")]
    NotUtf8,

    /// Envelope parsed but its type is not part of the protocol.
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

impl ProtocolError {
    /// Unknown types are ignored quietly rather than reported as malformed.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, ProtocolError::UnknownType(_))
    }
}

fn typed_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, ProtocolError> {
    // Missing and null payloads mean "no fields"
    let payload = match payload {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    Ok(serde_json::from_value(payload)?)
}

impl ClientMessage {
    /// Wire name of this message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::HostConnect => "host_connect",
            ClientMessage::PlayerJoin(_) => "player_join",
            ClientMessage::HostDrawNumber(_) => "host_draw_number",
            ClientMessage::HostResetGame => "host_reset_game",
            ClientMessage::PlayerClaimBingo(_) => "player_claim_bingo",
        }
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(s)?;

        match envelope.kind.as_str() {
            "host_connect" => Ok(ClientMessage::HostConnect),
            "player_join" => Ok(ClientMessage::PlayerJoin(typed_payload(envelope.payload)?)),
            "host_draw_number" => Ok(ClientMessage::HostDrawNumber(typed_payload(envelope.payload)?)),
            "host_reset_game" => Ok(ClientMessage::HostResetGame),
            "player_claim_bingo" => Ok(ClientMessage::PlayerClaimBingo(typed_payload(envelope.payload)?)),
            _ => Err(ProtocolError::UnknownType(envelope.kind)),
        }
    }

    /// Deserialize from a binary frame holding UTF-8 JSON.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::NotUtf8)?;
        Self::from_json(text)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let payload = match self {
            ClientMessage::HostConnect | ClientMessage::HostResetGame => {
                Value::Object(serde_json::Map::new())
            }
            ClientMessage::PlayerJoin(req) => serde_json::to_value(req)?,
            ClientMessage::HostDrawNumber(req) => serde_json::to_value(req)?,
            ClientMessage::PlayerClaimBingo(req) => serde_json::to_value(req)?,
        };
        serde_json::to_string(&serde_json::json!({
            "type": self.kind(),
            "payload": payload,
        }))
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Snapshot for a newly connected host.
    InitHost(HostSnapshot),

    /// Confirmation for a newly joined player.
    GameJoined(GameJoined),

    /// A player joined (host only).
    PlayerJoined(PlayerSummary),

    /// A number was called.
    NumberCalled(NumberCalled),

    /// The player's replacement card after a reset.
    GameResetNewCard(NewCard),

    /// Reset finished (host only).
    GameResetConfirmed {},

    /// A claim was accepted.
    PlayerWon(PlayerWon),

    /// A claim was rejected (claimant only).
    BingoRejected(BingoRejected),

    /// A player disconnected (host only).
    PlayerLeft(PlayerLeft),
}

/// Host view of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    /// Registered players.
    pub players: Vec<PlayerSummary>,
    /// Called numbers in draw order.
    pub called_numbers: Vec<u32>,
}

/// Player entry in host-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Accepted claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wins: Option<u32>,
}

/// Join confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameJoined {
    /// Assigned identifier.
    pub id: PlayerId,
    /// Assigned card.
    pub card: Card,
    /// Numbers called before the join.
    pub called_numbers: Vec<u32>,
}

/// Called number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberCalled {
    /// The number.
    pub number: u32,
}

/// Replacement card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    /// The card.
    pub card: Card,
}

/// Accepted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerWon {
    /// Winner's display name.
    pub name: String,
}

/// Rejected claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BingoRejected {
    /// Human-readable reason.
    pub reason: String,
}

/// Departed player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeft {
    /// Player identifier.
    pub id: PlayerId,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Wire name of this message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::InitHost(_) => "init_host",
            ServerMessage::GameJoined(_) => "game_joined",
            ServerMessage::PlayerJoined(_) => "player_joined",
            ServerMessage::NumberCalled(_) => "number_called",
            ServerMessage::GameResetNewCard(_) => "game_reset_new_card",
            ServerMessage::GameResetConfirmed {} => "game_reset_confirmed",
            ServerMessage::PlayerWon(_) => "player_won",
            ServerMessage::BingoRejected(_) => "bingo_rejected",
            ServerMessage::PlayerLeft(_) => "player_left",
        }
    }
}
