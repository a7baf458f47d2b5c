/// E2E tests for ghost replication: spawn, delta updates, ownership
/// filtering, dynamic fields, despawn, and scope changes.

use wraith_client::{Client, ClientConfig};
use wraith_shared::FieldValue;
use wraith_test::helpers::{client_addr, connect, new_client, new_server, run_ticks, tick};
use wraith_test::test_protocol::{
    marker_state, position_state, protocol_reordered, unit_state, vehicle_state, MARKER, POSITION,
    UNIT, VEHICLE,
};
use wraith_test::LocalNetwork;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn spawn_replicates_full_state() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server.spawn_ghost(POSITION, position_state(1.5, -2.5)).unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();

    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);
    assert_eq!(client_events[0].read_spawns(), vec![ghost_id]);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[0], FieldValue::Float(1.5));
    assert_eq!(state.fields[1], FieldValue::Float(-2.5));
    assert_eq!(client.ghost_type_id(ghost_id), Some(POSITION));
}

#[test]
fn updates_arrive_as_deltas_and_converge() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server.spawn_ghost(POSITION, position_state(0.0, 0.0)).unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    // deliver the spawn and let the ack land so deltas get a baseline
    run_ticks(&mut server, &mut [&mut client], 3);

    server
        .update_ghost(ghost_id, position_state(4.0, 0.0))
        .unwrap();
    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);

    let updates = client_events[0].read_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, ghost_id);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[0], FieldValue::Float(4.0));
    assert_eq!(state.fields[1], FieldValue::Float(0.0));

    // an unchanged tick produces no update action at all
    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);
    assert!(client_events[0].read_updates().is_empty());
}

#[test]
fn owner_only_fields_are_withheld_until_ownership() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server
        .spawn_ghost(UNIT, unit_state(100, 42, vec![1, 2], "grunt"))
        .unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);

    // non-owner: secret stays at its schema default
    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[0], FieldValue::Int(100));
    assert_eq!(state.fields[1], FieldValue::Int(0));

    // granting ownership re-spawns the ghost with the owner's field set
    server.set_owner(ghost_id, Some(user_key)).unwrap();
    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);

    // the re-spawn of a known ghost surfaces as an update, not a spawn
    assert!(client_events[0].read_spawns().is_empty());
    let updates = client_events[0].read_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, ghost_id);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[1], FieldValue::Int(42));
}

#[test]
fn dynamic_fields_grow_and_shrink() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server
        .spawn_ghost(UNIT, unit_state(100, 0, vec![1, 2], "grunt"))
        .unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);

    server
        .update_ghost(ghost_id, unit_state(100, 0, vec![1, 2, 3, 4], "veteran"))
        .unwrap();
    run_ticks(&mut server, &mut [&mut client], 2);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(
        state.fields[2],
        FieldValue::List(vec![
            FieldValue::Int(1),
            FieldValue::Int(2),
            FieldValue::Int(3),
            FieldValue::Int(4),
        ])
    );
    assert_eq!(state.fields[3], FieldValue::Buffer(b"veteran".to_vec()));

    server
        .update_ghost(ghost_id, unit_state(100, 0, vec![9], "veteran"))
        .unwrap();
    run_ticks(&mut server, &mut [&mut client], 2);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[2], FieldValue::List(vec![FieldValue::Int(9)]));
}

#[test]
fn despawn_removes_ghost_and_recycles_id_after_ack() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server.spawn_ghost(POSITION, position_state(0.0, 0.0)).unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);
    assert_eq!(client.ghost_ids(), vec![ghost_id]);

    server.despawn_ghost(ghost_id).unwrap();
    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);
    assert_eq!(client_events[0].read_despawns(), vec![ghost_id]);
    assert!(client.ghost_ids().is_empty());

    // the client's ack frees the id for reuse
    run_ticks(&mut server, &mut [&mut client], 2);
    let next_id = server.spawn_ghost(POSITION, position_state(0.0, 0.0)).unwrap();
    assert_eq!(next_id, ghost_id);
}

#[test]
fn scope_exclusion_despawns_on_that_client_only() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client_a = new_client(&network, client_addr(), 1);
    let key_a = connect(&mut server, &mut client_a, 5);
    let mut client_b = new_client(&network, "127.0.0.1:12346".parse().unwrap(), 2);
    let key_b = connect(&mut server, &mut client_b, 5);

    let ghost_id = server.spawn_ghost(POSITION, position_state(0.0, 0.0)).unwrap();
    server.scope_include(&key_a, ghost_id).unwrap();
    server.scope_include(&key_b, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client_a, &mut client_b], 3);
    assert_eq!(client_a.ghost_ids(), vec![ghost_id]);
    assert_eq!(client_b.ghost_ids(), vec![ghost_id]);

    server.scope_exclude(&key_a, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client_a, &mut client_b], 2);

    assert!(client_a.ghost_ids().is_empty());
    assert_eq!(client_b.ghost_ids(), vec![ghost_id]);
    // the ghost itself is alive on the server
    assert!(server.ghost_state(ghost_id).is_some());
}

/// Child fields only replicate when their descriptor opts in.
#[test]
fn child_fields_respect_send_for_children() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server
        .spawn_ghost(VEHICLE, vehicle_state(3.0, 1.5, 30))
        .unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[0], FieldValue::Float(3.0));
    assert_eq!(state.children[0][0], FieldValue::Float(1.5));
    // the opted-out child field never left the server
    assert_eq!(state.children[0][1], FieldValue::Int(0));

    server
        .update_ghost(ghost_id, vehicle_state(3.0, -2.0, 25))
        .unwrap();
    run_ticks(&mut server, &mut [&mut client], 2);

    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.children[0][0], FieldValue::Float(-2.0));
    assert_eq!(state.children[0][1], FieldValue::Int(0));
}

#[test]
fn static_ghosts_go_quiet_but_still_replicate_changes() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server.spawn_ghost(MARKER, marker_state(3)).unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);
    assert_eq!(
        client.ghost_state(ghost_id).unwrap().fields[0],
        FieldValue::Int(3)
    );

    // quiet while unchanged: ticks after the spawn ack carry no updates
    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);
    assert!(client_events[0].read_updates().is_empty());

    // a change still goes out; static only skips the unchanged resends
    server.update_ghost(ghost_id, marker_state(9)).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);
    assert_eq!(
        client.ghost_state(ghost_id).unwrap().fields[0],
        FieldValue::Int(9)
    );
}

#[test]
fn reordered_client_agrees_on_type_ids() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);

    // registration order differs; canonical ids must not
    let mut client = Client::new(ClientConfig::default(), protocol_reordered());
    let (sender, receiver) = network.client_io(client_addr());
    client.connect(network.server_addr(), 1, Vec::new(), sender, receiver);
    let user_key = connect(&mut server, &mut client, 5);

    let ghost_id = server
        .spawn_ghost(UNIT, unit_state(100, 0, vec![4, 5], "scout"))
        .unwrap();
    server.scope_include(&user_key, ghost_id).unwrap();
    run_ticks(&mut server, &mut [&mut client], 2);

    assert_eq!(client.ghost_type_id(ghost_id), Some(UNIT));
    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[0], FieldValue::Int(100));
    assert_eq!(
        state.fields[2],
        FieldValue::List(vec![FieldValue::Int(4), FieldValue::Int(5)])
    );
}
