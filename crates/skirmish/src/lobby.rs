//! The lobby: sessions and rooms under one exclusion domain.
//!
//! Every operation that touches both a session and a room (create, join,
//! leave, disconnect) runs as one call on `&mut Lobby`, so the server's
//! single `Mutex<Lobby>` makes it atomic. Nothing in here does I/O: each
//! call returns what should be sent, and the dispatcher sends it after
//! releasing the lock.
//!
//! Return conventions:
//! - request operations return `None` when no response must be sent at
//!   all (the session vanished, or it is not authenticated);
//! - notification operations return the broadcasts to deliver, possibly
//!   none.

use serde_json::Value;
use skirmish_protocol::{
    PlayerId, PlayerSnapshot, Recipient, Reply, RoomNumber, RoomSetting, ServerNotification,
    TeamTable,
};
use skirmish_room::{LeaveOutcome, Room, RoomParams, RoomRegistry};
use skirmish_session::{Session, SessionError, SessionRegistry};

use crate::notifier::{Broadcast, plan};

/// The answer to a request, plus what the request caused.
#[derive(Debug, Clone, PartialEq)]
pub struct Handled<H> {
    /// Where to send the response.
    pub requester: H,
    pub reply: Reply,
    pub broadcasts: Vec<Broadcast<H>>,
}

impl<H> Handled<H> {
    fn reply(requester: H, reply: Reply) -> Self {
        Self {
            requester,
            reply,
            broadcasts: Vec::new(),
        }
    }

    fn denied(requester: H) -> Self {
        Self::reply(requester, Reply::Denied {})
    }

    fn with(mut self, broadcast: Broadcast<H>) -> Self {
        self.broadcasts.push(broadcast);
        self
    }
}

/// Both registries. `H` is the per-session delivery handle.
#[derive(Debug)]
pub struct Lobby<H> {
    sessions: SessionRegistry<H>,
    rooms: RoomRegistry,
}

impl<H: Clone> Lobby<H> {
    pub fn new() -> Self {
        Self {
            sessions: SessionRegistry::new(),
            rooms: RoomRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry<H> {
        &self.sessions
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    fn authenticated(&self, player: PlayerId) -> Option<&Session<H>> {
        self.sessions.get(player).filter(|s| s.authenticated)
    }

    // -- Connection lifecycle --

    /// Registers the session of a newly accepted connection.
    pub fn connect(&mut self, session: Session<H>) -> Result<(), SessionError> {
        let player_id = session.player_id;
        let address = session.address;
        self.sessions.put(session)?;
        tracing::info!(%player_id, ?address, "player connected");
        Ok(())
    }

    /// Leaves the player's room, if any, and forgets the session.
    pub fn disconnect(&mut self, player: PlayerId) -> Vec<Broadcast<H>> {
        let broadcasts = self.leave(player);
        if let Some(session) = self.sessions.remove(player) {
            tracing::info!(%player, who = %session.label(), "player disconnected");
        }
        broadcasts
    }

    // -- Requests --

    /// Applies the authenticator's verdict.
    ///
    /// A refused attempt does not clear an earlier successful one.
    pub fn authenticate(
        &mut self,
        player: PlayerId,
        username: &str,
        accepted: bool,
    ) -> Option<Handled<H>> {
        let session = self.sessions.get_mut(player)?;
        if accepted {
            session.authenticate(username);
            tracing::info!(%player, who = %session.label(), "authenticated");
            Some(Handled::reply(
                session.handle.clone(),
                Reply::Authenticated { service_id: player },
            ))
        } else {
            tracing::info!(%player, username, address = ?session.address, "authentication failed");
            Some(Handled::denied(session.handle.clone()))
        }
    }

    pub fn list_rooms(&self, player: PlayerId) -> Option<Handled<H>> {
        let session = self.authenticated(player)?;
        Some(Handled::reply(
            session.handle.clone(),
            Reply::Rooms {
                rooms: self.rooms.snapshot_all(),
            },
        ))
    }

    /// Creates a room hosted by `player`, named after them.
    ///
    /// Refused while the player is already in a room.
    pub fn create_room(&mut self, player: PlayerId, params: RoomParams) -> Option<Handled<H>> {
        let session = self.authenticated(player)?;
        let handle = session.handle.clone();
        if session.room.is_some() {
            tracing::debug!(%player, "create refused: already in a room");
            return Some(Handled::denied(handle));
        }
        let name = format!("{}'s game", session.username);

        let number = self.rooms.next_room_number();
        let room = match Room::new(number, name, player, params) {
            Ok(room) => room,
            Err(e) => {
                tracing::debug!(%player, error = %e, "create refused");
                return Some(Handled::denied(handle));
            }
        };
        if let Err(e) = self.rooms.put(room) {
            tracing::debug!(%player, error = %e, "create refused");
            return Some(Handled::denied(handle));
        }
        let session = self.sessions.get_mut(player)?;
        session.room = Some(number);
        tracing::info!(%player, who = %session.label(), room = %number, "room created");

        let setting = self.setting(number)?;
        Some(Handled::reply(
            handle,
            Reply::Room {
                room_setting: Box::new(setting),
            },
        ))
    }

    /// Adds `player` to room `number` and tells the other members.
    pub fn join_room(&mut self, player: PlayerId, number: RoomNumber) -> Option<Handled<H>> {
        let session = self.authenticated(player)?;
        let handle = session.handle.clone();
        let username = session.username.clone();
        if session.room.is_some() {
            tracing::debug!(%player, room = %number, "join refused: already in a room");
            return Some(Handled::denied(handle));
        }

        if let Err(e) = self.rooms.join(number, player) {
            tracing::debug!(%player, error = %e, "join refused");
            return Some(Handled::denied(handle));
        }
        if let Some(session) = self.sessions.get_mut(player) {
            session.room = Some(number);
        }
        tracing::info!(%player, room = %number, "player joined room");

        let room = self.rooms.get(number)?;
        let joined = plan(
            room,
            &self.sessions,
            Recipient::AllExcept(player),
            ServerNotification::PlayerJoining {
                player_id: player,
                username,
            },
        );
        let setting = self.setting(number)?;
        Some(
            Handled::reply(
                handle,
                Reply::Room {
                    room_setting: Box::new(setting),
                },
            )
            .with(joined),
        )
    }

    /// Starts the game in the player's room.
    pub fn start_game(&mut self, player: PlayerId) -> Option<Handled<H>> {
        let session = self.authenticated(player)?;
        let handle = session.handle.clone();
        let Some(room) = session.room.and_then(|n| self.rooms.get_mut(n)) else {
            tracing::debug!(%player, "start refused: not in a room");
            return Some(Handled::denied(handle));
        };
        if let Err(e) = room.start(player) {
            tracing::debug!(%player, error = %e, "start refused");
            return Some(Handled::denied(handle));
        }
        tracing::info!(%player, room = %room.number(), "game started");

        let started = plan(
            room,
            &self.sessions,
            Recipient::AllExcept(player),
            ServerNotification::GameStart {},
        );
        Some(Handled::reply(handle, Reply::Started {}).with(started))
    }

    // -- Notifications --

    /// PLAYER_LEAVING sent by the player.
    pub fn leave_room(&mut self, player: PlayerId) -> Vec<Broadcast<H>> {
        if self.authenticated(player).is_none() {
            return Vec::new();
        }
        self.leave(player)
    }

    /// Replaces the team table of the player's room. Host only.
    pub fn update_allocation(&mut self, player: PlayerId, teams: TeamTable) -> Vec<Broadcast<H>> {
        let Some(number) = self.authenticated(player).and_then(|s| s.room) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(number) else {
            return Vec::new();
        };
        if let Err(e) = room.update_allocation(player, teams) {
            tracing::debug!(%player, error = %e, "allocation update refused");
            return Vec::new();
        }
        vec![plan(
            room,
            &self.sessions,
            Recipient::AllExcept(player),
            ServerNotification::UpdateAllocation(teams),
        )]
    }

    /// Chat: relayed to the whole room, sender included.
    pub fn message(&self, player: PlayerId, message: String) -> Vec<Broadcast<H>> {
        let Some(session) = self.authenticated(player) else {
            return Vec::new();
        };
        let Some(room) = session.room.and_then(|n| self.rooms.get(n)) else {
            return Vec::new();
        };
        vec![plan(
            room,
            &self.sessions,
            Recipient::All,
            ServerNotification::Message {
                username: session.username.clone(),
                message,
            },
        )]
    }

    /// In-game event. Relayed to the other members of a started room when
    /// `relay` is on; dropped otherwise.
    pub fn game_event(&self, player: PlayerId, event: Value, relay: bool) -> Vec<Broadcast<H>> {
        let Some(session) = self.authenticated(player) else {
            return Vec::new();
        };
        if !relay {
            tracing::trace!(%player, "game event relay disabled");
            return Vec::new();
        }
        let Some(room) = session.room.and_then(|n| self.rooms.get(n)) else {
            return Vec::new();
        };
        if room.is_open() {
            tracing::debug!(%player, room = %room.number(), "game event before start dropped");
            return Vec::new();
        }
        vec![plan(
            room,
            &self.sessions,
            Recipient::AllExcept(player),
            ServerNotification::GameEvent {
                player_id: player,
                event,
            },
        )]
    }

    // -- Internals --

    /// Removes the player from their room on both sides.
    ///
    /// The last member out disposes the room. Otherwise the remaining
    /// members learn who left, who hosts now, and the current team table.
    fn leave(&mut self, player: PlayerId) -> Vec<Broadcast<H>> {
        let Some(session) = self.sessions.get_mut(player) else {
            return Vec::new();
        };
        let Some(number) = session.room.take() else {
            return Vec::new();
        };
        let username = session.username.clone();

        let Some(room) = self.rooms.get_mut(number) else {
            tracing::warn!(%player, room = %number, "session pointed at a missing room");
            return Vec::new();
        };
        let outcome = match room.leave(player) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%player, error = %e, "session and room disagreed on membership");
                return Vec::new();
            }
        };
        tracing::info!(%player, room = %number, "player left room");

        match outcome {
            LeaveOutcome::Disposable => {
                self.rooms.remove(number);
                Vec::new()
            }
            LeaveOutcome::Remaining => {
                let left = plan(
                    room,
                    &self.sessions,
                    Recipient::AllExcept(player),
                    ServerNotification::PlayerLeaving {
                        player_id: player,
                        username,
                        host_id: room.host(),
                    },
                );
                let teams = plan(
                    room,
                    &self.sessions,
                    Recipient::All,
                    ServerNotification::UpdateAllocation(*room.teams()),
                );
                vec![left, teams]
            }
        }
    }

    /// Builds the room setting, with usernames from the members' sessions.
    fn setting(&self, number: RoomNumber) -> Option<RoomSetting> {
        let room = self.rooms.get(number)?;
        let players = room
            .members()
            .iter()
            .filter_map(|&id| {
                self.sessions.get(id).map(|s| PlayerSnapshot {
                    id,
                    username: s.username.clone(),
                    is_host: room.is_host(id),
                })
            })
            .collect();
        Some(room.setting(players))
    }
}

impl<H: Clone> Default for Lobby<H> {
    fn default() -> Self {
        Self::new()
    }
}
