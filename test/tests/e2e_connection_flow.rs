/// E2E tests for the handshake and approval flow over the in-memory network.

use wraith_shared::DisconnectReason;
use wraith_test::helpers::{client_addr, new_approving_server, new_client, new_server, tick};
use wraith_test::LocalNetwork;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Without approval, a single exchange is enough: handshake in, accept out.
#[test]
fn client_connects_without_approval() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);

    assert!(client.is_connecting());

    let (mut server_events, mut client_events) = tick(&mut server, &mut [&mut client]);

    let connections = server_events.read_connections();
    assert_eq!(connections.len(), 1);
    let user = server.user(&connections[0]).unwrap();
    assert_eq!(user.address, client_addr());
    assert!(!user.reconnected);

    assert!(client.is_connected());
    let client_connections = client_events[0].read_connections();
    assert_eq!(client_connections.len(), 1);
    let (network_id, reconnected) = client_connections[0];
    assert_eq!(network_id, user.network_id);
    assert!(!reconnected);
}

/// With approval required, the server surfaces the client's payload to the
/// host and nothing connects until the host accepts.
#[test]
fn approval_payload_reaches_host_before_accept() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_approving_server(&network);

    let mut client = wraith_client::Client::new(
        wraith_client::ClientConfig::default(),
        wraith_test::protocol(),
    );
    let (sender, receiver) = network.client_io(client_addr());
    client.connect(
        network.server_addr(),
        7,
        b"let me in".to_vec(),
        sender,
        receiver,
    );

    // tick 1: handshake in, approval request out, response queued
    let (mut server_events, _) = tick(&mut server, &mut [&mut client]);
    assert!(server_events.read_approvals().is_empty());
    assert!(!client.is_connected());

    // tick 2: approval response reaches the host
    let (mut server_events, _) = tick(&mut server, &mut [&mut client]);
    let approvals = server_events.read_approvals();
    assert_eq!(approvals.len(), 1);
    let (user_key, payload) = approvals[0].clone();
    assert_eq!(payload, b"let me in".to_vec());
    assert!(!client.is_connected());

    server.accept_connection(&user_key);

    // tick 3: accept reaches the client
    let (mut server_events, mut client_events) = tick(&mut server, &mut [&mut client]);
    assert_eq!(server_events.read_connections(), vec![user_key]);
    assert!(client.is_connected());
    assert_eq!(client_events[0].read_connections().len(), 1);
}

/// A rejected client learns why and ends up disconnected.
#[test]
fn rejected_client_sees_approval_denied() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_approving_server(&network);
    let mut client = new_client(&network, client_addr(), 7);

    let _ = tick(&mut server, &mut [&mut client]);
    let (mut server_events, _) = tick(&mut server, &mut [&mut client]);
    let approvals = server_events.read_approvals();
    assert_eq!(approvals.len(), 1);

    server.reject_connection(&approvals[0].0);

    let (_, mut client_events) = tick(&mut server, &mut [&mut client]);
    assert!(client.is_disconnected());
    assert_eq!(
        client_events[0].read_disconnections(),
        vec![DisconnectReason::ApprovalDenied]
    );
}

/// A clean client-side disconnect surfaces on the server as ClosedByRemote.
#[test]
fn client_disconnect_reaches_server() {
    init_logging();
    let network = LocalNetwork::new();
    let mut server = new_server(&network);
    let mut client = new_client(&network, client_addr(), 1);

    let (mut server_events, _) = tick(&mut server, &mut [&mut client]);
    let user_key = server_events.read_connections()[0];
    assert!(client.is_connected());

    client.disconnect();
    let (mut server_events, mut client_events) = tick(&mut server, &mut [&mut client]);

    assert!(client.is_disconnected());
    assert_eq!(
        client_events[0].read_disconnections(),
        vec![DisconnectReason::ConnectionClose]
    );
    assert_eq!(
        server_events.read_disconnections(),
        vec![(user_key, DisconnectReason::ClosedByRemote)]
    );
    assert!(server.user(&user_key).is_none());
}
