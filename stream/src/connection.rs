//! Serve and dial secure channels over a [Network].
//!
//! [serve] accepts connections forever and handles each one on its own task: it runs the
//! listener side of the handshake with a fresh key pair, then echoes every message it
//! receives until the peer hangs up. [connect] is the matching dialer.

use crate::{
    handshake,
    transport::{Listener, Network, Sink, SinkOf, Stream, StreamOf},
    Closer as _, Error, Reader as _, SecureChannel, Writer as _,
};
use rand::rngs::OsRng;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Configuration for [serve].
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Configuration of each accepted channel.
    pub stream: crate::Config,

    /// Maximum number of messages echoed on a connection before it is closed.
    ///
    /// `None` echoes until the peer closes the connection.
    pub max_exchanges: Option<usize>,
}

/// Accept connections from `listener` and echo over each one on a spawned task.
///
/// Failures on one connection are logged and never affect the others. Only returns
/// once the listener fails to accept.
pub async fn serve<L: Listener>(mut listener: L, config: Config) -> Result<(), Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "serving");
    }
    loop {
        let (addr, sink, stream) = listener.accept().await.map_err(Error::Network)?;
        debug!(%addr, "accepted connection");

        let config = config.clone();
        tokio::spawn(async move {
            match echo(sink, stream, &config).await {
                Ok(exchanges) => debug!(%addr, exchanges, "connection finished"),
                Err(err) => warn!(%addr, ?err, "connection failed"),
            }
        });
    }
}

/// Handle a single accepted connection, returning how many messages were echoed.
async fn echo<Si: Sink, St: Stream>(
    sink: Si,
    stream: St,
    config: &Config,
) -> Result<usize, Error> {
    let handshake = handshake::listen(&mut OsRng, sink, stream).await?;
    let mut channel = handshake.into_channel(&config.stream)?;

    // A zero-sized buffer would never consume a frame
    let mut buf = vec![0u8; config.stream.max_message_size.max(1)];
    let mut exchanges = 0;
    let result = loop {
        if config.max_exchanges.is_some_and(|max| exchanges >= max) {
            break Ok(());
        }
        let n = match channel.read(&mut buf).await {
            Ok(n) => n,
            Err(Error::EndOfStream) => break Ok(()),
            Err(err) => break Err(err),
        };
        if let Err(err) = channel.write(&buf[..n]).await {
            break Err(err);
        }
        exchanges += 1;
    };

    if let Err(err) = channel.close().await {
        debug!(?err, "failed to close channel");
    }
    result.map(|_| exchanges)
}

/// Dial `addr` and run the dialer side of the handshake.
pub async fn connect<N: Network>(
    network: &N,
    addr: SocketAddr,
    config: &crate::Config,
) -> Result<SecureChannel<SinkOf<N>, StreamOf<N>>, Error> {
    let (sink, stream) = network.dial(addr).await.map_err(Error::Network)?;
    let handshake = handshake::dial(&mut OsRng, sink, stream).await?;
    handshake.into_channel(config)
}
