//! In-process packet transport over std mpsc channels. One channel carries
//! one direction; a loopback test pairs two of them back to back.

use std::net::SocketAddr;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use super::{PacketReceiver as TransportReceiver, PacketSender as TransportSender, RecvError, SendError};

pub struct PacketChannel;

impl PacketChannel {
    pub fn unbounded() -> (Box<dyn TransportSender>, Box<dyn TransportReceiver>) {
        let (packet_sender, packet_receiver) = channel();
        (
            Box::new(ChannelSender {
                sender: packet_sender,
            }),
            Box::new(ChannelReceiver {
                receiver: packet_receiver,
            }),
        )
    }
}

struct ChannelSender {
    sender: Sender<(SocketAddr, Box<[u8]>)>,
}

impl TransportSender for ChannelSender {
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        self.sender
            .send((*address, payload.into()))
            .map_err(|_| SendError)
    }
}

struct ChannelReceiver {
    receiver: Receiver<(SocketAddr, Box<[u8]>)>,
}

impl TransportReceiver for ChannelReceiver {
    fn receive(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError> {
        match self.receiver.try_recv() {
            Ok((address, payload)) => Ok(Some((address, payload))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError),
        }
    }
}
