//! The room state machine.
//!
//! A `Room` is plain data plus guarded transitions. It has no lock and no
//! I/O: the lobby mutates it while holding the lock that also covers the
//! session registry, and the caller decides what to tell clients.
//!
//! Each transition checks every guard first and only then mutates, so a
//! refused call (`Err(RoomError)`) leaves the room exactly as it was.

use skirmish_protocol::{
    PlayerId, PlayerSnapshot, RoomNumber, RoomSetting, RoomSnapshot, TeamTable,
};

use crate::{MAX_CAPACITY, RoomError, RoomOrigin, RoomParams, RoomState};

/// Lowest and highest alliance id an active team slot may carry.
const ALLIANCES: std::ops::RangeInclusive<i32> = 1..=4;

/// What a successful [`Room::leave`] left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The last member left; remove the room from the registry.
    Disposable,
    /// Members remain.
    Remaining,
}

/// A game lobby.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    number: RoomNumber,
    name: String,
    map_name: String,
    capacity: usize,
    /// Join order.
    members: Vec<PlayerId>,
    host: Option<PlayerId>,
    teams: TeamTable,
    state: RoomState,
    start_gold: i32,
    max_population: i32,
    origin: RoomOrigin,
}

impl Room {
    /// Creates an OPEN room whose sole member and host is `creator`.
    ///
    /// # Errors
    /// [`RoomError::InvalidCapacity`] unless `1 <= capacity <= 4`.
    pub fn new(
        number: RoomNumber,
        name: impl Into<String>,
        creator: PlayerId,
        params: RoomParams,
    ) -> Result<Self, RoomError> {
        if !(1..=MAX_CAPACITY).contains(&params.capacity) {
            return Err(RoomError::InvalidCapacity(params.capacity));
        }
        Ok(Self {
            number,
            name: name.into(),
            map_name: params.map_name,
            capacity: params.capacity,
            members: vec![creator],
            host: Some(creator),
            teams: TeamTable::default(),
            state: RoomState::Open,
            start_gold: params.start_gold,
            max_population: params.max_population,
            origin: params.origin,
        })
    }

    // -- Accessors --

    pub fn number(&self) -> RoomNumber {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Free player slots.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.members.len())
    }

    /// Members in join order.
    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn is_host(&self, player: PlayerId) -> bool {
        self.host == Some(player)
    }

    pub fn teams(&self) -> &TeamTable {
        &self.teams
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn start_gold(&self) -> i32 {
        self.start_gold
    }

    pub fn max_population(&self) -> i32 {
        self.max_population
    }

    pub fn origin(&self) -> &RoomOrigin {
        &self.origin
    }

    /// A room can take a new member: it has a free slot and a host.
    ///
    /// Game-over is decided by the game engine after the start, so an
    /// OPEN room is never over.
    pub fn is_available(&self) -> bool {
        self.remaining() > 0 && self.host.is_some()
    }

    /// The team table describes a playable game.
    ///
    /// At least two slots are in use, every slot in use belongs to one of
    /// the four alliances, and the slots in use are not all allied.
    pub fn is_ready(&self) -> bool {
        let mut active = self.teams.active().peekable();
        let Some(first) = active.peek().map(|slot| slot.alliance) else {
            return false;
        };
        let mut count = 0;
        let mut opposed = false;
        for slot in active {
            if !ALLIANCES.contains(&slot.alliance) {
                return false;
            }
            opposed |= slot.alliance != first;
            count += 1;
        }
        count >= 2 && opposed
    }

    // -- Transitions --

    /// Adds `player` as a member.
    ///
    /// The caller must already have checked that the player is in no other
    /// room; the room only knows its own members.
    pub fn join(&mut self, player: PlayerId) -> Result<(), RoomError> {
        if !self.is_open() {
            return Err(RoomError::NotOpen(self.number));
        }
        if self.host.is_none() {
            return Err(RoomError::NoHost(self.number));
        }
        if self.remaining() == 0 {
            return Err(RoomError::Full(self.number));
        }
        if self.is_member(player) {
            return Err(RoomError::AlreadyMember(player, self.number));
        }
        self.members.push(player);
        tracing::debug!(room = %self.number, %player, members = self.members.len(), "member joined");
        Ok(())
    }

    /// Replaces the whole team table. Host only.
    pub fn update_allocation(
        &mut self,
        requester: PlayerId,
        teams: TeamTable,
    ) -> Result<(), RoomError> {
        if !self.is_host(requester) {
            return Err(RoomError::NotHost(requester, self.number));
        }
        self.teams = teams;
        Ok(())
    }

    /// Moves the room to STARTED. Host only, OPEN only, ready only.
    pub fn start(&mut self, requester: PlayerId) -> Result<(), RoomError> {
        if !self.is_open() {
            return Err(RoomError::NotOpen(self.number));
        }
        if !self.is_host(requester) {
            return Err(RoomError::NotHost(requester, self.number));
        }
        if !self.is_ready() {
            return Err(RoomError::NotReady(self.number));
        }
        self.state = RoomState::Started;
        Ok(())
    }

    /// Removes `player`.
    ///
    /// If the host leaves, the room is left without a host; nobody is
    /// promoted. The team table is not touched.
    pub fn leave(&mut self, player: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let Some(index) = self.members.iter().position(|&m| m == player) else {
            return Err(RoomError::NotMember(player, self.number));
        };
        self.members.remove(index);
        if self.host == Some(player) {
            self.host = None;
        }
        if self.members.is_empty() {
            Ok(LeaveOutcome::Disposable)
        } else {
            Ok(LeaveOutcome::Remaining)
        }
    }

    // -- Projections --

    /// One row of the room list.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_number: self.number,
            room_name: self.name.clone(),
            map_name: self.map_name.clone(),
            capacity: self.capacity,
            remaining: self.remaining(),
            player_count: self.members.len(),
            started: !self.is_open(),
            host: self.host,
        }
    }

    /// Full room state, with `players` built by the caller from the
    /// members' sessions.
    pub fn setting(&self, players: Vec<PlayerSnapshot>) -> RoomSetting {
        RoomSetting {
            room_number: self.number,
            room_name: self.name.clone(),
            map_name: self.map_name.clone(),
            capacity: self.capacity,
            started: !self.is_open(),
            host: self.host,
            teams: self.teams,
            start_gold: self.start_gold,
            max_population: self.max_population,
            players,
            game: self.origin.saved_game().cloned(),
        }
    }
}
