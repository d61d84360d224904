//! Room scenarios replayed through the wire codec, plus property tests
//! for the room invariants.

use std::collections::HashSet;

use proptest::prelude::*;
use retro_core::{
    Category, Dispatch, DuplicateUsernamePolicy, Item, Operation, Position, RoomState, ServerEvent,
    SessionId,
};
use retro_protocol::decode_input;

const A: SessionId = SessionId(1);
const B: SessionId = SessionId(2);

fn broadcasts(dispatches: &[Dispatch]) -> Vec<&ServerEvent> {
    dispatches
        .iter()
        .filter_map(|d| match d {
            Dispatch::Broadcast(event) => Some(event),
            _ => None,
        })
        .collect()
}

fn apply_json(room: &mut RoomState, session: SessionId, json: &str) -> Vec<Dispatch> {
    let op = decode_input(json).expect("fixture should decode");
    room.apply(session, op)
}

fn ids(room: &RoomState, category: Category) -> Vec<String> {
    room.store().items(category).iter().map(|i| i.id.clone()).collect()
}

#[test]
fn owner_handover_and_visibility_gating() {
    let mut room = RoomState::new("R1", DuplicateUsernamePolicy::Takeover);
    room.join(A, "A");
    room.join(B, "B");

    let out = apply_json(
        &mut room,
        A,
        r#"{"type":"add-item","payload":{"category":"went_well","item":{"id":"i1","content":"x"}}}"#,
    );
    assert_eq!(broadcasts(&out).len(), 1);

    assert!(apply_json(&mut room, B, r#"{"type":"toggle-visibility","payload":{}}"#).is_empty());
    assert!(!room.is_hidden());

    let out = apply_json(&mut room, A, r#"{"type":"toggle-visibility","payload":{}}"#);
    assert_eq!(out, vec![Dispatch::Broadcast(ServerEvent::VisibilityChanged { hidden: true })]);

    let out = room.leave(A);
    assert_eq!(
        broadcasts(&out),
        vec![&ServerEvent::OwnerChanged { new_owner: "B".into() }]
    );
    assert_eq!(room.owner(), Some("B"));
    assert_eq!(room.members().len(), 1);

    room.leave(B);
    assert!(room.is_empty());
    assert_eq!(room.owner(), None);
}

#[test]
fn sole_member_moves_across_categories() {
    let mut room = RoomState::new("R2", DuplicateUsernamePolicy::Takeover);
    room.join(A, "A");

    apply_json(
        &mut room,
        A,
        r#"{"type":"add-item","payload":{"category":"went_well","item":{"id":"i1","content":"x"}}}"#,
    );
    let out = apply_json(
        &mut room,
        A,
        r#"{"type":"move-item","payload":{"source":{"droppableId":"went_well","index":0},
            "destination":{"droppableId":"action_items","index":0},"itemId":"i1"}}"#,
    );

    assert_eq!(broadcasts(&out).len(), 1);
    assert!(ids(&room, Category::WentWell).is_empty());
    assert_eq!(ids(&room, Category::ActionItems), vec!["i1"]);
}

#[test]
fn replayed_move_is_a_no_op() {
    let mut room = RoomState::new("R3", DuplicateUsernamePolicy::Takeover);
    room.join(A, "A");
    room.apply(
        A,
        Operation::AddItem {
            category: Category::ToImprove,
            item: Item::new("i1", "flaky tests", ""),
        },
    );

    let op = Operation::MoveItem {
        source: Position::new(Category::ToImprove, 0),
        destination: Position::new(Category::ActionItems, 0),
        item_id: "i1".into(),
    };
    assert_eq!(room.apply(A, op.clone()).len(), 1);
    assert!(room.apply(A, op).is_empty());
    assert_eq!(ids(&room, Category::ActionItems), vec!["i1"]);
}

#[test]
fn fresh_room_after_gc_starts_empty() {
    // The room task replaces an emptied RoomState with a new one; a join on
    // the new state sees an empty board and becomes owner.
    let mut room = RoomState::new("R4", DuplicateUsernamePolicy::Takeover);
    room.join(A, "A");
    room.apply(A, Operation::ToggleVisibility);
    room.leave(A);
    assert!(room.is_empty());

    let mut fresh = RoomState::new("R4", DuplicateUsernamePolicy::Takeover);
    match fresh.join(B, "B").as_slice() {
        [Dispatch::Unicast(session, ServerEvent::InitialState(snapshot))] => {
            assert_eq!(*session, B);
            assert!(snapshot.is_owner);
            assert!(!snapshot.is_hidden);
            assert!(snapshot.items.is_empty());
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// -----------------------------------------------------------------------------
// Properties
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum BoardOp {
    Add { by_a: bool, id: u8 },
    Remove { by_a: bool, id: u8 },
}

fn board_op() -> impl Strategy<Value = BoardOp> {
    prop_oneof![
        3 => (any::<bool>(), 0u8..6).prop_map(|(by_a, id)| BoardOp::Add { by_a, id }),
        2 => (any::<bool>(), 0u8..6).prop_map(|(by_a, id)| BoardOp::Remove { by_a, id }),
    ]
}

#[derive(Debug, Clone)]
enum MemberOp {
    Join(u8),
    Leave(usize),
}

fn member_op() -> impl Strategy<Value = MemberOp> {
    prop_oneof![
        (0u8..4).prop_map(MemberOp::Join),
        (0usize..32).prop_map(MemberOp::Leave),
    ]
}

proptest! {
    /// Interleaved adds and removes on one column match a simple model:
    /// every surviving add is present once, in order.
    #[test]
    fn prop_add_remove_matches_model(ops in prop::collection::vec(board_op(), 0..60)) {
        let mut room = RoomState::new("P1", DuplicateUsernamePolicy::Takeover);
        room.join(A, "A");
        room.join(B, "B");

        // (id, author)
        let mut model: Vec<(String, &str)> = Vec::new();

        for op in ops {
            match op {
                BoardOp::Add { by_a, id } => {
                    let (session, user) = if by_a { (A, "A") } else { (B, "B") };
                    let id = format!("i{id}");
                    let existing = model.iter().position(|(i, _)| *i == id);
                    let allowed = match existing {
                        Some(pos) => user == "A" || model[pos].1 == user,
                        None => true,
                    };
                    room.apply(session, Operation::AddItem {
                        category: Category::WentWell,
                        item: Item::new(id.clone(), "x", ""),
                    });
                    if allowed {
                        if let Some(pos) = existing {
                            model.remove(pos);
                        }
                        model.push((id, user));
                    }
                }
                BoardOp::Remove { by_a, id } => {
                    let (session, user) = if by_a { (A, "A") } else { (B, "B") };
                    let id = format!("i{id}");
                    room.apply(session, Operation::RemoveItem {
                        category: Category::WentWell,
                        item_id: id.clone(),
                    });
                    if let Some(pos) = model.iter().position(|(i, _)| *i == id) {
                        if user == "A" || model[pos].1 == user {
                            model.remove(pos);
                        }
                    }
                }
            }

            let actual = ids(&room, Category::WentWell);
            let unique: HashSet<&String> = actual.iter().collect();
            prop_assert_eq!(unique.len(), actual.len());
        }

        let expected: Vec<String> = model.into_iter().map(|(id, _)| id).collect();
        prop_assert_eq!(ids(&room, Category::WentWell), expected);
    }

    /// Whenever a room has members, its owner is one of them.
    #[test]
    fn prop_owner_is_always_a_member(ops in prop::collection::vec(member_op(), 0..80)) {
        let mut room = RoomState::new("P2", DuplicateUsernamePolicy::Takeover);
        let mut sessions: Vec<SessionId> = Vec::new();

        for op in ops {
            match op {
                MemberOp::Join(user) => {
                    let session = SessionId(sessions.len() as u64 + 1);
                    sessions.push(session);
                    room.join(session, &format!("u{user}"));
                }
                MemberOp::Leave(pick) => {
                    if !sessions.is_empty() {
                        room.leave(sessions[pick % sessions.len()]);
                    }
                }
            }

            match room.owner() {
                Some(owner) => prop_assert!(room.members().contains_username(owner)),
                None => prop_assert!(room.is_empty()),
            }
            if !room.is_empty() {
                prop_assert!(room.owner().is_some());
            }
        }
    }

    /// The destination index is clamped to the length of the destination
    /// list measured after the item left its source.
    #[test]
    fn prop_move_destination_is_clamped(
        len in 1usize..8,
        pick in 0usize..8,
        across in any::<bool>(),
        target in 0usize..1000,
    ) {
        let mut room = RoomState::new("P3", DuplicateUsernamePolicy::Takeover);
        room.join(A, "A");
        for n in 0..len {
            room.apply(A, Operation::AddItem {
                category: Category::WentWell,
                item: Item::new(format!("i{n}"), "x", ""),
            });
        }

        let from = pick % len;
        let id = format!("i{from}");
        let destination = if across { Category::ActionItems } else { Category::WentWell };
        let dest_len_after_removal = if across { 0 } else { len - 1 };

        let out = room.apply(A, Operation::MoveItem {
            source: Position::new(Category::WentWell, from),
            destination: Position::new(destination, target),
            item_id: id.clone(),
        });

        let expected_index = target.min(dest_len_after_removal);
        prop_assert_eq!(
            room.store().items(destination)[expected_index].id.as_str(),
            id.as_str()
        );
        match out.as_slice() {
            [Dispatch::Broadcast(ServerEvent::ItemMoved { source, destination: dest, .. })] => {
                prop_assert_eq!(source.index, from);
                prop_assert_eq!(dest.index, expected_index);
            }
            other => prop_assert!(false, "unexpected dispatches: {:?}", other),
        }
        prop_assert_eq!(room.store().total(), len);
    }
}
