/// E2E tests for session identity across reconnects.

use wraith_test::helpers::{client_addr, connect, new_client, new_server, tick};
use wraith_test::LocalNetwork;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Reconnecting with the same unique id after a clean disconnect resumes
/// the same NetworkId, flagged as a reconnect on both ends.
#[test]
fn same_identity_resumes_network_id() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);

    let mut client = new_client(&network, client_addr(), 77);
    let key = connect(&mut server, &mut client, 5);
    let first = server.user(&key).unwrap();
    assert!(!first.reconnected);
    assert!(!client.reconnected());

    client.disconnect();
    let _ = tick(&mut server, &mut [&mut client]);
    assert!(server.user(&key).is_none());

    let mut client = new_client(&network, client_addr(), 77);
    let key = connect(&mut server, &mut client, 5);
    let second = server.user(&key).unwrap();
    assert_eq!(second.network_id, first.network_id);
    assert!(second.reconnected);
    assert!(client.reconnected());
    assert_eq!(client.network_id(), Some(first.network_id));
}

/// A different unique id never inherits another session's NetworkId.
#[test]
fn different_identity_gets_fresh_network_id() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);

    let mut client = new_client(&network, client_addr(), 77);
    let key = connect(&mut server, &mut client, 5);
    let first = server.user(&key).unwrap();

    client.disconnect();
    let _ = tick(&mut server, &mut [&mut client]);

    let mut client = new_client(&network, client_addr(), 78);
    let key = connect(&mut server, &mut client, 5);
    let second = server.user(&key).unwrap();
    assert_ne!(second.network_id, first.network_id);
    assert!(!second.reconnected);
}

/// While a unique id's session is still live, a second connection claiming
/// it gets a fresh NetworkId instead of hijacking the live one.
#[test]
fn live_identity_collision_mints_fresh_network_id() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);

    let mut client_a = new_client(&network, client_addr(), 77);
    let key_a = connect(&mut server, &mut client_a, 5);
    let user_a = server.user(&key_a).unwrap();

    let addr_b = "127.0.0.1:12346".parse().unwrap();
    let mut client_b = new_client(&network, addr_b, 77);
    let key_b = connect(&mut server, &mut client_b, 5);
    let user_b = server.user(&key_b).unwrap();

    assert_ne!(user_b.network_id, user_a.network_id);
    assert!(!user_b.reconnected);
    assert!(!client_b.reconnected());
    // the original session is untouched
    assert!(client_a.is_connected());
    assert!(server.user(&key_a).is_some());
}
