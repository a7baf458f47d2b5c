/// In-memory socket implementation for E2E testing
/// Routes packets between server and clients without network I/O

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use wraith_shared::{PacketReceiver, PacketSender, RecvError, SendError};

pub const FAKE_SERVER_ADDR: &str = "127.0.0.1:54321";
pub const FAKE_CLIENT_ADDR: &str = "127.0.0.1:12345";
pub const FAKE_CLIENT_ADDR_2: &str = "127.0.0.1:12346";

type Inbox = Arc<Mutex<VecDeque<(SocketAddr, Box<[u8]>)>>>;

/// A fake network: one server endpoint and any number of client endpoints,
/// all backed by shared packet queues. The server keys its connections by
/// packet source address, so client senders stamp their own address onto
/// every packet they push into the server's inbox.
pub struct LocalNetwork {
    server_addr: SocketAddr,
    server_inbox: Inbox,
    client_inboxes: Arc<Mutex<HashMap<SocketAddr, Inbox>>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self {
            server_addr: FAKE_SERVER_ADDR.parse().unwrap(),
            server_inbox: Arc::new(Mutex::new(VecDeque::new())),
            client_inboxes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// The server's half of the network.
    pub fn server_io(&self) -> (Box<dyn PacketSender>, Box<dyn PacketReceiver>) {
        let sender = Box::new(LocalServerSender {
            client_inboxes: self.client_inboxes.clone(),
            server_addr: self.server_addr,
        });
        let receiver = Box::new(LocalReceiver {
            inbox: self.server_inbox.clone(),
        });
        (sender, receiver)
    }

    /// Registers a new client endpoint at `address` and returns its half of
    /// the network.
    pub fn client_io(
        &self,
        address: SocketAddr,
    ) -> (Box<dyn PacketSender>, Box<dyn PacketReceiver>) {
        let inbox: Inbox = Arc::new(Mutex::new(VecDeque::new()));
        self.client_inboxes
            .lock()
            .unwrap()
            .insert(address, inbox.clone());

        let sender = Box::new(LocalClientSender {
            server_inbox: self.server_inbox.clone(),
            client_addr: address,
        });
        let receiver = Box::new(LocalReceiver { inbox });
        (sender, receiver)
    }

    /// Drops the client endpoint at `address`. Packets the server sends to
    /// it afterwards fail, like datagrams to a vanished host.
    pub fn drop_client(&self, address: SocketAddr) {
        self.client_inboxes.lock().unwrap().remove(&address);
    }
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

struct LocalServerSender {
    client_inboxes: Arc<Mutex<HashMap<SocketAddr, Inbox>>>,
    server_addr: SocketAddr,
}

impl PacketSender for LocalServerSender {
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        let inboxes = self.client_inboxes.lock().unwrap();
        let inbox = inboxes.get(address).ok_or(SendError)?;
        inbox
            .lock()
            .unwrap()
            .push_back((self.server_addr, payload.into()));
        Ok(())
    }
}

struct LocalClientSender {
    server_inbox: Inbox,
    client_addr: SocketAddr,
}

impl PacketSender for LocalClientSender {
    fn send(&self, _address: &SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        self.server_inbox
            .lock()
            .unwrap()
            .push_back((self.client_addr, payload.into()));
        Ok(())
    }
}

struct LocalReceiver {
    inbox: Inbox,
}

impl PacketReceiver for LocalReceiver {
    fn receive(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError> {
        Ok(self.inbox.lock().unwrap().pop_front())
    }
}
