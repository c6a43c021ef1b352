//! Integration tests for rooms and the room registry.
//!
//! The property tests drive random join/leave sequences through the
//! registry the same way the lobby does: join only players in no room,
//! remove the room when the last member leaves.

use std::collections::HashMap;

use proptest::prelude::*;
use skirmish_protocol::{PlayerId, PlayerType, RoomNumber, TeamSlot, TeamTable};
use skirmish_room::{
    LeaveOutcome, Room, RoomError, RoomOrigin, RoomParams, RoomRegistry, RoomState,
};

// =========================================================================
// Helpers
// =========================================================================

fn params(capacity: usize) -> RoomParams {
    RoomParams {
        map_name: "archipelago".into(),
        capacity,
        start_gold: 500,
        max_population: 30,
        origin: RoomOrigin::Map(serde_json::json!({"tiles": []})),
    }
}

fn ready_table() -> TeamTable {
    let mut t = TeamTable::default();
    t.0[0] = TeamSlot {
        player_type: PlayerType::Local,
        alliance: 1,
        allocation: 100,
    };
    t.0[1] = TeamSlot {
        player_type: PlayerType::Remote,
        alliance: 2,
        allocation: 100,
    };
    t
}

#[derive(Debug, Clone)]
enum Op {
    Create { player: u64, capacity: usize },
    Join { player: u64, room: usize },
    Leave { player: u64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..8, 1usize..=4).prop_map(|(player, capacity)| Op::Create { player, capacity }),
        (0u64..8, 0usize..4).prop_map(|(player, room)| Op::Join { player, room }),
        (0u64..8).prop_map(|player| Op::Leave { player }),
    ]
}

/// Minimal lobby model: the registry plus each player's current room.
struct Model {
    rooms: RoomRegistry,
    current: HashMap<PlayerId, RoomNumber>,
}

impl Model {
    fn new() -> Self {
        Self {
            rooms: RoomRegistry::new(),
            current: HashMap::new(),
        }
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Create { player, capacity } => {
                let player = PlayerId(player);
                if self.current.contains_key(&player) {
                    return;
                }
                let number = self.rooms.next_room_number();
                let room = Room::new(number, "room", player, params(capacity)).unwrap();
                self.rooms.put(room).unwrap();
                self.current.insert(player, number);
            }
            Op::Join { player, room } => {
                let player = PlayerId(player);
                if self.current.contains_key(&player) {
                    return;
                }
                let snapshots = self.rooms.snapshot_all();
                let Some(target) = snapshots.get(room) else {
                    return;
                };
                let number = target.room_number;
                if let Some(room) = self.rooms.get_mut(number) {
                    if room.join(player).is_ok() {
                        self.current.insert(player, number);
                    }
                }
            }
            Op::Leave { player } => {
                let player = PlayerId(player);
                let Some(number) = self.current.remove(&player) else {
                    return;
                };
                let outcome = self.rooms.get_mut(number).unwrap().leave(player).unwrap();
                if outcome == LeaveOutcome::Disposable {
                    self.rooms.remove(number);
                }
            }
        }
    }

    fn check(&self) -> Result<(), TestCaseError> {
        for snap in self.rooms.snapshot_all() {
            let room = self.rooms.get(snap.room_number).unwrap();
            prop_assert!(room.member_count() <= room.capacity());
            prop_assert!(room.member_count() > 0, "empty room left registered");
            for member in room.members() {
                prop_assert_eq!(self.current.get(member), Some(&snap.room_number));
            }
        }
        for (player, number) in &self.current {
            let room = self.rooms.get(*number);
            prop_assert!(room.is_some_and(|r| r.is_member(*player)));
        }
        Ok(())
    }
}

// =========================================================================
// Properties
// =========================================================================

proptest! {
    /// Membership never exceeds capacity, empty rooms never linger, and
    /// every player's room agrees with that room's member list.
    #[test]
    fn prop_join_leave_sequences_keep_registry_consistent(
        ops in prop::collection::vec(op(), 1..64),
    ) {
        let mut model = Model::new();
        for op in ops {
            model.apply(op);
            model.check()?;
        }
    }

    /// A refused guard leaves the room unchanged.
    #[test]
    fn prop_non_host_allocation_never_changes_table(
        types in prop::array::uniform4(0u8..4),
        alliance in prop::array::uniform4(-1i32..6),
    ) {
        let mut room = Room::new(RoomNumber(1), "room", PlayerId(1), params(4)).unwrap();
        room.join(PlayerId(2)).unwrap();
        let before = room.clone();

        let table = TeamTable(std::array::from_fn(|i| TeamSlot {
            player_type: PlayerType::try_from(types[i]).unwrap(),
            alliance: alliance[i],
            allocation: 0,
        }));
        prop_assert!(room.update_allocation(PlayerId(2), table).is_err());
        prop_assert_eq!(room, before);
    }
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_create_join_leave_dispose_lifecycle() {
    let mut rooms = RoomRegistry::new();
    let number = rooms.next_room_number();
    rooms
        .put(Room::new(number, "alice's game", PlayerId(1), params(4)).unwrap())
        .unwrap();

    let snaps = rooms.snapshot_all();
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].player_count, 1);
    assert_eq!(snaps[0].host, Some(PlayerId(1)));

    rooms.get_mut(number).unwrap().join(PlayerId(2)).unwrap();
    let outcome = rooms.get_mut(number).unwrap().leave(PlayerId(2)).unwrap();
    assert_eq!(outcome, LeaveOutcome::Remaining);
    assert_eq!(rooms.len(), 1);

    let outcome = rooms.get_mut(number).unwrap().leave(PlayerId(1)).unwrap();
    assert_eq!(outcome, LeaveOutcome::Disposable);
    rooms.remove(number);
    assert!(rooms.is_empty());
}

#[test]
fn test_last_slot_goes_to_exactly_one_joiner() {
    let mut room = Room::new(RoomNumber(1), "room", PlayerId(1), params(2)).unwrap();
    assert!(room.join(PlayerId(2)).is_ok());
    assert_eq!(room.join(PlayerId(3)), Err(RoomError::Full(RoomNumber(1))));
    assert_eq!(room.member_count(), 2);
}

#[test]
fn test_start_is_irreversible() {
    let mut room = Room::new(RoomNumber(1), "room", PlayerId(1), params(2)).unwrap();
    room.join(PlayerId(2)).unwrap();
    room.update_allocation(PlayerId(1), ready_table()).unwrap();
    room.start(PlayerId(1)).unwrap();

    assert_eq!(room.state(), RoomState::Started);
    assert!(room.start(PlayerId(1)).is_err());
    // Allocation is still host-controlled after the start.
    assert!(room.update_allocation(PlayerId(1), TeamTable::default()).is_ok());
    assert_eq!(room.state(), RoomState::Started);
}
