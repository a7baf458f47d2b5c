/// Integration test: a dynamic field over its schema capacity is skipped
/// at send time, reported to the host, and the rest of the delta still
/// applies.

use wraith_shared::FieldValue;
use wraith_test::helpers::{client_addr, connect, new_client, new_server, run_ticks, tick};
use wraith_test::test_protocol::{unit_state, INVENTORY_CAPACITY, UNIT};
use wraith_test::LocalNetwork;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn over_capacity_field_is_skipped_and_reported() {
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

    // one item over the inventory cap, plus a health change in the same tick
    let oversized: Vec<i64> = (0..=INVENTORY_CAPACITY as i64).collect();
    server
        .update_ghost(ghost_id, unit_state(50, 0, oversized, "grunt"))
        .unwrap();
    let _ = tick(&mut server, &mut [&mut client]);

    // the sibling field landed, the oversized one did not
    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[0], FieldValue::Int(50));
    assert_eq!(
        state.fields[2],
        FieldValue::List(vec![FieldValue::Int(1), FieldValue::Int(2)])
    );

    // the drop surfaces to the host on the next receive
    let (mut server_events, _) = tick(&mut server, &mut [&mut client]);
    let drops = server_events.read_capacity_drops();
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].0, user_key);
    assert_eq!(drops[0].1.field, "inventory");
    assert_eq!(drops[0].1.length, INVENTORY_CAPACITY + 1);
    assert_eq!(drops[0].1.capacity, INVENTORY_CAPACITY);

    // shrinking back under the cap resumes replication
    server
        .update_ghost(ghost_id, unit_state(50, 0, vec![7], "grunt"))
        .unwrap();
    run_ticks(&mut server, &mut [&mut client], 2);
    let state = client.ghost_state(ghost_id).unwrap();
    assert_eq!(state.fields[2], FieldValue::List(vec![FieldValue::Int(7)]));
}
