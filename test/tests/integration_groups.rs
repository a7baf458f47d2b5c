/// Integration tests for ghost groups: bulk scoping and the static
/// optimization opt-out for group members.

use wraith_shared::FieldValue;
use wraith_test::helpers::{client_addr, connect, new_client, new_server, run_ticks};
use wraith_test::test_protocol::{marker_state, position_state, MARKER, POSITION};
use wraith_test::LocalNetwork;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn group_scoping_spawns_every_member() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let body = server.spawn_ghost(POSITION, position_state(1.0, 2.0)).unwrap();
    let label = server.spawn_ghost(MARKER, marker_state(5)).unwrap();

    let group = server.create_group();
    server.add_group_member(group, body).unwrap();
    server.add_group_member(group, label).unwrap();
    assert_eq!(server.group_members(group).unwrap(), &[body, label]);

    server.scope_include_group(&user_key, group).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);

    let mut ids = client.ghost_ids();
    ids.sort();
    assert_eq!(ids, vec![body, label]);
}

/// Group membership turns the static optimization off: a static type in a
/// group keeps replicating updates after its spawn is acked.
#[test]
fn static_group_member_keeps_replicating() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);
    let user_key = connect(&mut server, &mut client, 5);

    let label = server.spawn_ghost(MARKER, marker_state(5)).unwrap();
    let group = server.create_group();
    server.add_group_member(group, label).unwrap();
    server.scope_include_group(&user_key, group).unwrap();
    run_ticks(&mut server, &mut [&mut client], 3);

    server.update_ghost(label, marker_state(9)).unwrap();
    run_ticks(&mut server, &mut [&mut client], 2);
    assert_eq!(
        client.ghost_state(label).unwrap().fields[0],
        FieldValue::Int(9)
    );
}

/// Despawning a ghost drops it from every group it belongs to.
#[test]
fn despawn_leaves_groups() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);

    let body = server.spawn_ghost(POSITION, position_state(0.0, 0.0)).unwrap();
    let group = server.create_group();
    server.add_group_member(group, body).unwrap();

    server.despawn_ghost(body).unwrap();
    assert!(server.group_members(group).unwrap().is_empty());
}
