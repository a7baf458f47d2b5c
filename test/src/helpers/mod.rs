/// Shared helpers for driving a server and several clients over the
/// in-memory network, one simulated tick at a time.

use std::net::SocketAddr;

use wraith_client::{Client, ClientConfig};
use wraith_server::{Server, ServerConfig, UserKey};

use crate::local_socket::{LocalNetwork, FAKE_CLIENT_ADDR};
use crate::test_protocol::protocol;

/// A server that skips host approval, listening on a fresh network.
pub fn new_server(network: &LocalNetwork) -> Server {
    let config = ServerConfig {
        require_approval: false,
        ..ServerConfig::default()
    };
    let mut server = Server::new(config, protocol());
    let (sender, receiver) = network.server_io();
    server.listen(sender, receiver);
    server
}

pub fn new_approving_server(network: &LocalNetwork) -> Server {
    let mut server = Server::new(ServerConfig::default(), protocol());
    let (sender, receiver) = network.server_io();
    server.listen(sender, receiver);
    server
}

/// A client already dialing the server with the given session identity.
pub fn new_client(network: &LocalNetwork, address: SocketAddr, unique_id: u64) -> Client {
    let mut client = Client::new(ClientConfig::default(), protocol());
    let (sender, receiver) = network.client_io(address);
    client.connect(network.server_addr(), unique_id, Vec::new(), sender, receiver);
    client
}

pub fn client_addr() -> SocketAddr {
    FAKE_CLIENT_ADDR.parse().unwrap()
}

/// One full simulated tick: clients pump their timers, the server drains
/// its inbox and replicates, then the clients drain theirs.
pub fn tick(
    server: &mut Server,
    clients: &mut [&mut Client],
) -> (wraith_server::Events, Vec<wraith_client::Events>) {
    for client in clients.iter_mut() {
        client.send();
    }
    let server_events = server.receive();
    server.send_all_updates();
    let client_events = clients
        .iter_mut()
        .map(|client| client.receive())
        .collect();
    (server_events, client_events)
}

/// Runs ticks until the client connects, auto-accepting any approval the
/// server raises. Panics if the client is still not connected afterwards.
pub fn connect(server: &mut Server, client: &mut Client, max_ticks: usize) -> UserKey {
    let mut user_key = None;
    for _ in 0..max_ticks {
        let (mut server_events, _) = tick(server, &mut [client]);
        for (key, _payload) in server_events.read_approvals() {
            server.accept_connection(&key);
        }
        for key in server_events.read_connections() {
            user_key = Some(key);
        }
        if client.is_connected() {
            if let Some(key) = user_key {
                return key;
            }
        }
    }
    panic!("client failed to connect within {} ticks", max_ticks);
}

/// Runs `count` quiet ticks, discarding events.
pub fn run_ticks(server: &mut Server, clients: &mut [&mut Client], count: usize) {
    for _ in 0..count {
        let _ = tick(server, clients);
    }
}
