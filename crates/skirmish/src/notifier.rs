//! Room-wide notifications.
//!
//! A notification is planned under the lobby lock ([`plan`]: who gets it,
//! resolved to delivery handles) and delivered after the lock is released
//! ([`deliver`]: encode once, one delivery task per recipient).
//!
//! Delivery is fire-and-forget. A failed send is logged and forgotten, and
//! recipients may see notifications in different orders.

use std::sync::Arc;

use skirmish_protocol::{Codec, Envelope, Recipient, RoomNumber, ServerNotification};
use skirmish_room::Room;
use skirmish_session::SessionRegistry;
use skirmish_tasks::{TaskKind, TaskScheduler};
use skirmish_transport::Connection;

use crate::SkirmishError;

/// One notification and the handles it must reach.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast<H> {
    pub room: RoomNumber,
    pub event: ServerNotification,
    pub recipients: Vec<H>,
}

/// Resolves `to` against the room's current members.
///
/// Members whose session has already gone are skipped.
pub fn plan<H: Clone>(
    room: &Room,
    sessions: &SessionRegistry<H>,
    to: Recipient,
    event: ServerNotification,
) -> Broadcast<H> {
    let recipients = room
        .members()
        .iter()
        .copied()
        .filter(|&member| to.includes(member))
        .filter_map(|member| sessions.get(member))
        .map(|session| session.handle.clone())
        .collect();
    Broadcast {
        room: room.number(),
        event,
        recipients,
    }
}

/// Encodes the notification once and schedules one send per recipient.
pub(crate) fn deliver<H, C>(
    tasks: &TaskScheduler,
    codec: &C,
    broadcast: Broadcast<Arc<H>>,
) -> Result<(), SkirmishError>
where
    H: Connection,
    C: Codec,
{
    if broadcast.recipients.is_empty() {
        return Ok(());
    }
    let operation = broadcast.event.operation();
    let bytes: Arc<[u8]> = codec
        .encode(&Envelope::notification(&broadcast.event)?)?
        .into();

    tracing::trace!(
        room = %broadcast.room,
        ?operation,
        recipients = broadcast.recipients.len(),
        "delivering notification"
    );

    for conn in broadcast.recipients {
        let bytes = Arc::clone(&bytes);
        tasks.submit(TaskKind::Delivery, async move {
            if let Err(e) = conn.send(&bytes).await {
                tracing::debug!(
                    conn = %conn.id(),
                    ?operation,
                    error = %e,
                    "notification delivery failed"
                );
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::PlayerId;
    use skirmish_room::{RoomOrigin, RoomParams};
    use skirmish_session::Session;

    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn room_with(members: &[u64]) -> Room {
        let mut room = Room::new(
            RoomNumber(1),
            "room",
            pid(members[0]),
            RoomParams {
                map_name: "m".into(),
                capacity: 4,
                start_gold: 0,
                max_population: 0,
                origin: RoomOrigin::Map(serde_json::Value::Null),
            },
        )
        .unwrap();
        for &m in &members[1..] {
            room.join(pid(m)).unwrap();
        }
        room
    }

    fn sessions(ids: &[u64]) -> SessionRegistry<PlayerId> {
        let mut reg = SessionRegistry::new();
        for &id in ids {
            reg.put(Session::new(pid(id), pid(id))).unwrap();
        }
        reg
    }

    #[test]
    fn test_plan_all_reaches_every_member() {
        let b = plan(
            &room_with(&[1, 2, 3]),
            &sessions(&[1, 2, 3]),
            Recipient::All,
            ServerNotification::GameStart {},
        );
        assert_eq!(b.recipients, vec![pid(1), pid(2), pid(3)]);
        assert_eq!(b.room, RoomNumber(1));
    }

    #[test]
    fn test_plan_all_except_skips_actor() {
        let b = plan(
            &room_with(&[1, 2, 3]),
            &sessions(&[1, 2, 3]),
            Recipient::AllExcept(pid(2)),
            ServerNotification::GameStart {},
        );
        assert_eq!(b.recipients, vec![pid(1), pid(3)]);
    }

    #[test]
    fn test_plan_skips_members_without_session() {
        let b = plan(
            &room_with(&[1, 2]),
            &sessions(&[1]),
            Recipient::All,
            ServerNotification::GameStart {},
        );
        assert_eq!(b.recipients, vec![pid(1)]);
    }
}
