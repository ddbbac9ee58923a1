//! In-memory transports for tests, benchmarks and fuzzing.
//!
//! [Channel] preserves write boundaries: a single [Stream::recv](super::Stream::recv) never
//! returns bytes from more than one [Sink::send](super::Sink::send), mirroring a synchronous
//! pipe where each write is matched by one or more reads.

use super::Error;
use bytes::{Buf as _, Bytes};
use futures::{channel::mpsc, StreamExt as _};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    ops::Range,
    sync::{Arc, Mutex},
};

/// Range of ephemeral ports assigned to dialers.
const EPHEMERAL_PORT_RANGE: Range<u16> = 32768..61000;

/// Constructor for a unidirectional in-memory connection.
pub struct Channel;

impl Channel {
    /// Returns a connected [Sink] and [Stream]. Bytes sent on the sink are received on the stream.
    pub fn init() -> (Sink, Stream) {
        let (sender, receiver) = mpsc::unbounded();
        (
            Sink {
                sender: Some(sender),
            },
            Stream {
                receiver,
                pending: Bytes::new(),
            },
        )
    }
}

/// Sending half of a [Channel].
pub struct Sink {
    sender: Option<mpsc::UnboundedSender<Bytes>>,
}

impl super::Sink for Sink {
    async fn send(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let sender = self.sender.as_ref().ok_or(Error::Closed)?;
        if buf.is_empty() {
            return Ok(0);
        }
        sender
            .unbounded_send(Bytes::copy_from_slice(buf))
            .map_err(|_| Error::Closed)?;
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<(), Error> {
        // Dropping the sender signals end-of-stream to the receiver
        self.sender.take().map(|_| ()).ok_or(Error::Closed)
    }
}

/// Receiving half of a [Channel].
pub struct Stream {
    receiver: mpsc::UnboundedReceiver<Bytes>,
    pending: Bytes,
}

impl super::Stream for Stream {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            match self.receiver.next().await {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

type Dialable = mpsc::UnboundedSender<(
    SocketAddr,
    Sink,   // Listener -> Dialer
    Stream, // Dialer -> Listener
)>;

/// In-memory implementation of [super::Network].
///
/// Dialers are assigned ports from the range `32768..61000`, which cannot be bound.
#[derive(Clone)]
pub struct Network {
    ephemeral: Arc<Mutex<u16>>,
    listeners: Arc<Mutex<HashMap<SocketAddr, Dialable>>>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            ephemeral: Arc::new(Mutex::new(EPHEMERAL_PORT_RANGE.start)),
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl super::Network for Network {
    type Listener = Listener;

    async fn bind(&self, socket: SocketAddr) -> Result<Listener, Error> {
        if EPHEMERAL_PORT_RANGE.contains(&socket.port()) {
            return Err(Error::BindFailed);
        }

        let mut listeners = self.listeners.lock().unwrap();
        if listeners.contains_key(&socket) {
            return Err(Error::BindFailed);
        }
        let (sender, receiver) = mpsc::unbounded();
        listeners.insert(socket, sender);
        Ok(Listener {
            address: socket,
            listener: receiver,
        })
    }

    async fn dial(&self, socket: SocketAddr) -> Result<(Sink, Stream), Error> {
        let dialer = {
            let mut ephemeral = self.ephemeral.lock().unwrap();
            if *ephemeral >= EPHEMERAL_PORT_RANGE.end {
                return Err(Error::ConnectionFailed);
            }
            let dialer = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), *ephemeral);
            *ephemeral += 1;
            dialer
        };

        let sender = self
            .listeners
            .lock()
            .unwrap()
            .get(&socket)
            .cloned()
            .ok_or(Error::ConnectionFailed)?;
        let (dialer_sink, listener_stream) = Channel::init();
        let (listener_sink, dialer_stream) = Channel::init();
        sender
            .unbounded_send((dialer, listener_sink, listener_stream))
            .map_err(|_| Error::ConnectionFailed)?;
        Ok((dialer_sink, dialer_stream))
    }
}

/// In-memory implementation of [super::Listener].
pub struct Listener {
    address: SocketAddr,
    listener: mpsc::UnboundedReceiver<(SocketAddr, Sink, Stream)>,
}

impl super::Listener for Listener {
    type Sink = Sink;
    type Stream = Stream;

    async fn accept(&mut self) -> Result<(SocketAddr, Sink, Stream), Error> {
        self.listener.next().await.ok_or(Error::Closed)
    }

    fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        Ok(self.address)
    }
}
