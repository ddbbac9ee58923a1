//! Bidirectional secure channel over a single connection.

use crate::{
    cipher::SharedKey,
    transport::{Sink, Stream},
    Closer, Config, Error, Reader, SecureReader, SecureWriter, Writer,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};

/// A [SecureReader] and [SecureWriter] sharing one connection and one key.
///
/// Closing the channel closes the connection exactly once. Every operation
/// after that fails with [Error::ChannelClosed]. Once split, closing the writer
/// closes the connection and a pending read on the reader fails (for transports
/// that pair their halves, such as [crate::transport::tokio]).
pub struct SecureChannel<Si: Sink, St: Stream, R = OsRng> {
    writer: SecureWriter<Si, R>,
    reader: SecureReader<St>,
    closed: bool,
}

impl<Si: Sink, St: Stream> SecureChannel<Si, St> {
    pub fn new(sink: Si, stream: St, key: SharedKey, config: &Config) -> Self {
        Self::with_rng(sink, stream, key, OsRng, config)
    }
}

impl<Si: Sink, St: Stream, R: RngCore + CryptoRng> SecureChannel<Si, St, R> {
    /// Create a channel whose writer draws nonces from `rng`.
    pub fn with_rng(sink: Si, stream: St, key: SharedKey, rng: R, config: &Config) -> Self {
        Self {
            writer: SecureWriter::with_rng(sink, key.clone(), rng, config),
            reader: SecureReader::new(stream, key, config),
            closed: false,
        }
    }

    /// Split the channel into its writing and reading halves.
    ///
    /// This allows sending and receiving to be driven concurrently.
    pub fn split(self) -> (SecureWriter<Si, R>, SecureReader<St>) {
        (self.writer, self.reader)
    }

    /// Returns true once [Closer::close] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<Si: Sink, St: Stream, R: Send> Reader for SecureChannel<Si, St, R> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        self.reader.read(buf).await
    }
}

impl<Si: Sink, St: Stream, R: RngCore + CryptoRng + Send> Writer for SecureChannel<Si, St, R> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        self.writer.write(buf).await
    }
}

impl<Si: Sink, St: Stream, R: Send> Closer for SecureChannel<Si, St, R> {
    async fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        self.closed = true;
        self.writer.close().await
    }
}
