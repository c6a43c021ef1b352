//! The wire envelope and the typed payloads it carries.
//!
//! Every frame is one flat JSON object. Three keys are structural:
//!
//! ```text
//! { "type": 1, "operation": 4, "request_id": 17, "room_number": 1700000000000 }
//!   ^ Kind      ^ Operation      ^ correlation    ^ operation-specific fields
//! ```
//!
//! Everything else lives in [`Envelope::fields`] until the dispatcher asks
//! for a typed view through [`Envelope::into_inbound`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{PlayerId, RoomNumber, RoomSetting, RoomSnapshot, TeamTable};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Kind and Operation
// ---------------------------------------------------------------------------

/// The envelope kind (`type` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Kind {
    Request = 1,
    Response = 2,
    Notification = 3,
}

impl TryFrom<u8> for Kind {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Request),
            2 => Ok(Self::Response),
            3 => Ok(Self::Notification),
            code => Err(ProtocolError::UnknownCode { what: "kind", code }),
        }
    }
}

impl From<Kind> for u8 {
    fn from(kind: Kind) -> Self {
        kind as u8
    }
}

/// The operation code selecting the payload schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Operation {
    Authenticate = 1,
    ListRooms = 2,
    CreateRoom = 3,
    JoinRoom = 4,
    StartGame = 5,
    CreateRoomFromSave = 6,
    PlayerJoining = 7,
    PlayerLeaving = 8,
    UpdateAllocation = 9,
    GameEvent = 10,
    Message = 11,
    GameStart = 12,
}

impl TryFrom<u8> for Operation {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::Authenticate,
            2 => Self::ListRooms,
            3 => Self::CreateRoom,
            4 => Self::JoinRoom,
            5 => Self::StartGame,
            6 => Self::CreateRoomFromSave,
            7 => Self::PlayerJoining,
            8 => Self::PlayerLeaving,
            9 => Self::UpdateAllocation,
            10 => Self::GameEvent,
            11 => Self::Message,
            12 => Self::GameStart,
            code => {
                return Err(ProtocolError::UnknownCode {
                    what: "operation",
                    code,
                });
            }
        })
    }
}

impl From<Operation> for u8 {
    fn from(operation: Operation) -> Self {
        operation as u8
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: Kind,

    /// Present on REQUEST and NOTIFICATION frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,

    /// Chosen by the requester and echoed verbatim on the RESPONSE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,

    /// Operation-specific fields, kept flat next to the structural keys.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// An envelope with no operation, correlation token, or fields.
    pub fn bare(kind: Kind) -> Self {
        Self {
            kind,
            operation: None,
            request_id: None,
            fields: Map::new(),
        }
    }

    /// Builds the RESPONSE for `request_id`.
    ///
    /// `approved` is always present; approved replies add their
    /// operation-specific fields next to it.
    pub fn response(request_id: i64, reply: &Reply) -> Result<Self, ProtocolError> {
        let mut envelope = Self::bare(Kind::Response);
        envelope.request_id = Some(request_id);
        envelope.fields = to_object(reply)?;
        envelope
            .fields
            .insert("approved".into(), Value::Bool(reply.is_approved()));
        Ok(envelope)
    }

    /// Builds an outbound NOTIFICATION.
    pub fn notification(event: &ServerNotification) -> Result<Self, ProtocolError> {
        let mut envelope = Self::bare(Kind::Notification);
        envelope.operation = Some(event.operation());
        envelope.fields = to_object(event)?;
        Ok(envelope)
    }

    /// Interprets a frame received from a client.
    ///
    /// RESPONSE frames and server-only operations are rejected; so are
    /// payloads missing the fields their operation needs.
    pub fn into_inbound(self) -> Result<Inbound, ProtocolError> {
        let operation = self
            .operation
            .ok_or(ProtocolError::MissingField("operation"))?;
        match self.kind {
            Kind::Request => {
                let request_id = self
                    .request_id
                    .ok_or(ProtocolError::MissingField("request_id"))?;
                let request = Request::parse(self.kind, operation, self.fields)?;
                Ok(Inbound::Request {
                    request_id,
                    request,
                })
            }
            Kind::Notification => {
                ClientNotification::parse(self.kind, operation, self.fields)
                    .map(Inbound::Notification)
            }
            Kind::Response => Err(ProtocolError::InvalidMessage(
                "clients may not send responses".into(),
            )),
        }
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, ProtocolError> {
    match serde_json::to_value(value).map_err(ProtocolError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::InvalidMessage(format!(
            "payload must be an object, got {other}"
        ))),
    }
}

fn from_object<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, ProtocolError> {
    serde_json::from_value(Value::Object(fields)).map_err(ProtocolError::Decode)
}

// ---------------------------------------------------------------------------
// Inbound (client → server)
// ---------------------------------------------------------------------------

/// A decoded client frame, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request { request_id: i64, request: Request },
    Notification(ClientNotification),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticateRequest {
    pub username: String,
    pub v_string: String,
}

/// Create a room from a fresh map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRoomRequest {
    /// Opaque map payload; never interpreted by the lobby.
    pub map: Value,
    pub map_name: String,
    /// Signed so an out-of-range value is refused rather than dropped.
    pub capacity: i64,
    pub start_gold: i32,
    pub max_population: i32,
}

/// Create a room that resumes a saved game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRoomFromSaveRequest {
    /// Opaque saved-game payload.
    pub game: Value,
    pub map_name: String,
    pub capacity: i64,
    #[serde(default)]
    pub start_gold: i32,
    #[serde(default)]
    pub max_population: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JoinRoomRequest {
    pub room_number: RoomNumber,
}

/// REQUEST operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Authenticate(AuthenticateRequest),
    ListRooms,
    CreateRoom(CreateRoomRequest),
    CreateRoomFromSave(CreateRoomFromSaveRequest),
    JoinRoom(JoinRoomRequest),
    StartGame,
}

impl Request {
    fn parse(
        kind: Kind,
        operation: Operation,
        fields: Map<String, Value>,
    ) -> Result<Self, ProtocolError> {
        Ok(match operation {
            Operation::Authenticate => Self::Authenticate(from_object(fields)?),
            Operation::ListRooms => Self::ListRooms,
            Operation::CreateRoom => Self::CreateRoom(from_object(fields)?),
            Operation::CreateRoomFromSave => Self::CreateRoomFromSave(from_object(fields)?),
            Operation::JoinRoom => Self::JoinRoom(from_object(fields)?),
            Operation::StartGame => Self::StartGame,
            operation => return Err(ProtocolError::UnexpectedOperation { kind, operation }),
        })
    }

    /// The operation code this request was sent with.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Authenticate(_) => Operation::Authenticate,
            Self::ListRooms => Operation::ListRooms,
            Self::CreateRoom(_) => Operation::CreateRoom,
            Self::CreateRoomFromSave(_) => Operation::CreateRoomFromSave,
            Self::JoinRoom(_) => Operation::JoinRoom,
            Self::StartGame => Operation::StartGame,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameEventNotification {
    /// Opaque to the lobby.
    #[serde(default)]
    pub event: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageNotification {
    pub message: String,
}

/// NOTIFICATION operations a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotification {
    PlayerLeaving,
    UpdateAllocation(TeamTable),
    GameEvent(GameEventNotification),
    Message(MessageNotification),
}

impl ClientNotification {
    fn parse(
        kind: Kind,
        operation: Operation,
        fields: Map<String, Value>,
    ) -> Result<Self, ProtocolError> {
        Ok(match operation {
            Operation::PlayerLeaving => Self::PlayerLeaving,
            Operation::UpdateAllocation => Self::UpdateAllocation(from_object(fields)?),
            Operation::GameEvent => Self::GameEvent(from_object(fields)?),
            Operation::Message => Self::Message(from_object(fields)?),
            operation => return Err(ProtocolError::UnexpectedOperation { kind, operation }),
        })
    }
}

// ---------------------------------------------------------------------------
// Outbound (server → client)
// ---------------------------------------------------------------------------

/// The body of a RESPONSE.
///
/// Serialized untagged: each variant contributes only its own fields and
/// [`Envelope::response`] adds `approved`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Authenticated { service_id: PlayerId },
    Rooms { rooms: Vec<RoomSnapshot> },
    Room { room_setting: Box<RoomSetting> },
    Started {},
    Denied {},
}

impl Reply {
    pub fn is_approved(&self) -> bool {
        !matches!(self, Self::Denied {})
    }
}

/// Outbound NOTIFICATION payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerNotification {
    PlayerJoining {
        player_id: PlayerId,
        username: String,
    },
    /// `host_id` is the room's host after the leave, `null` if the host left.
    PlayerLeaving {
        player_id: PlayerId,
        username: String,
        host_id: Option<PlayerId>,
    },
    UpdateAllocation(TeamTable),
    GameStart {},
    GameEvent {
        player_id: PlayerId,
        event: Value,
    },
    Message {
        username: String,
        message: String,
    },
}

impl ServerNotification {
    pub fn operation(&self) -> Operation {
        match self {
            Self::PlayerJoining { .. } => Operation::PlayerJoining,
            Self::PlayerLeaving { .. } => Operation::PlayerLeaving,
            Self::UpdateAllocation(_) => Operation::UpdateAllocation,
            Self::GameStart {} => Operation::GameStart,
            Self::GameEvent { .. } => Operation::GameEvent,
            Self::Message { .. } => Operation::Message,
        }
    }
}
