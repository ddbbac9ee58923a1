//! Byte-stream transports consumed by the secure stream.
//!
//! A connection is represented as a pair of halves: a [Sink] that writes bytes to the peer and a
//! [Stream] that reads bytes from the peer. Halves are owned independently so that a reader and a
//! writer can be driven without sharing a lock. Closing the [Sink] closes the connection.
//!
//! Any deadline or timeout enforcement belongs to the implementation (see [tokio::Config]).

use std::{future::Future, io::Error as IoError, net::SocketAddr};
use thiserror::Error;

pub mod mocks;
pub mod tokio;

/// Errors that can occur when interacting with a transport.
#[derive(Error, Debug)]
pub enum Error {
    #[error("closed")]
    Closed,
    #[error("timeout")]
    Timeout,
    #[error("bind failed")]
    BindFailed,
    #[error("connection failed")]
    ConnectionFailed,
    #[error("send failed")]
    SendFailed,
    #[error("recv failed")]
    RecvFailed,
    #[error("io error: {0}")]
    Io(#[from] IoError),
}

/// Syntactic sugar for the type of [Sink] used by a given [Network] N.
pub type SinkOf<N> = <<N as Network>::Listener as Listener>::Sink;

/// Syntactic sugar for the type of [Stream] used by a given [Network] N.
pub type StreamOf<N> = <<N as Network>::Listener as Listener>::Stream;

/// Interface that any transport must implement to create connections.
pub trait Network: Clone + Send + Sync + 'static {
    /// The type of [Listener] that's returned when binding to a socket.
    type Listener: Listener;

    /// Bind to the given socket address.
    fn bind(
        &self,
        socket: SocketAddr,
    ) -> impl Future<Output = Result<Self::Listener, Error>> + Send;

    /// Dial the given socket address.
    fn dial(
        &self,
        socket: SocketAddr,
    ) -> impl Future<Output = Result<(SinkOf<Self>, StreamOf<Self>), Error>> + Send;
}

/// Interface that any transport must implement to handle incoming connections.
pub trait Listener: Send + 'static {
    /// The type of [Sink] that's returned when accepting a connection.
    type Sink: Sink;
    /// The type of [Stream] that's returned when accepting a connection.
    type Stream: Stream;

    /// Accept an incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<(SocketAddr, Self::Sink, Self::Stream), Error>> + Send;

    /// Returns the local address of the listener.
    fn local_addr(&self) -> Result<SocketAddr, IoError>;
}

/// Interface that any transport must implement to send bytes over a connection.
pub trait Sink: Send + 'static {
    /// Write `buf` to the connection, returning the number of bytes accepted.
    ///
    /// Implementations either accept all of `buf` or return an error. Callers still
    /// check the count, so a misbehaving implementation is caught as a short write.
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize, Error>> + Send;

    /// Close the connection. Any pending or future [Stream::recv] on the peer observes
    /// end-of-stream.
    ///
    /// Implementations that hand out a sink and stream for the same connection (such as
    /// [tokio]) also fail any pending or future [Stream::recv] on the local stream.
    fn close(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Interface that any transport must implement to receive bytes over a connection.
pub trait Stream: Send + 'static {
    /// Receive up to `buf.len()` bytes, returning how many were read.
    ///
    /// Returns `Ok(0)` once the peer has closed the connection (and only then, given a
    /// non-empty `buf`).
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Error>> + Send;
}
