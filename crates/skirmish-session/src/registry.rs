//! The session registry: every live connection's session, keyed by player.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain `HashMap` with no locking of its own. The
//! server keeps it inside the same mutex as the room registry so that an
//! operation touching both (join, leave) is one critical section.

use std::collections::HashMap;

use skirmish_protocol::PlayerId;

use crate::{Session, SessionError};

/// Maps player ids to sessions.
///
/// Lookups of an absent id return `None`; a session can vanish between a
/// frame being queued and being handled, and callers treat that as a
/// no-op.
#[derive(Debug)]
pub struct SessionRegistry<H> {
    sessions: HashMap<PlayerId, Session<H>>,
}

impl<H> SessionRegistry<H> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Session<H>> {
        self.sessions.get(&player_id)
    }

    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut Session<H>> {
        self.sessions.get_mut(&player_id)
    }

    /// Registers a session for a newly connected player.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the id is already present;
    /// the existing session is left in place.
    pub fn put(&mut self, session: Session<H>) -> Result<(), SessionError> {
        let player_id = session.player_id;
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyConnected(player_id));
        }
        self.sessions.insert(player_id, session);
        tracing::debug!(%player_id, "session registered");
        Ok(())
    }

    /// Removes and returns a session.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Session<H>> {
        let removed = self.sessions.remove(&player_id);
        if removed.is_some() {
            tracing::debug!(%player_id, "session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterates over every registered session, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Session<H>> {
        self.sessions.values()
    }
}

impl<H> Default for SessionRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
