//! Decrypting half of a secure stream.

use crate::{
    cipher::SharedKey, transport::Stream, utils::codec::recv_exact, Config, Error, Reader,
    AUTHENTICATION_TAG_LENGTH, NONCE_LENGTH,
};
use bytes::{Buf as _, Bytes};

/// Opens frames received from the [Stream] and hands back their plaintext.
///
/// A frame whose plaintext does not fit the caller's buffer is not lost: the
/// remainder is kept and served by subsequent reads before another frame is
/// pulled off the transport.
pub struct SecureReader<St: Stream> {
    stream: St,
    key: SharedKey,
    max_message_size: usize,

    /// Plaintext from the last frame not yet returned to the caller.
    pending: Bytes,
    /// Reused ciphertext buffer.
    scratch: Vec<u8>,
}

impl<St: Stream> SecureReader<St> {
    pub fn new(stream: St, key: SharedKey, config: &Config) -> Self {
        Self {
            stream,
            key,
            max_message_size: config.max_message_size,
            pending: Bytes::new(),
            scratch: Vec::new(),
        }
    }

    /// Number of decrypted bytes buffered but not yet read.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Release the underlying [Stream], discarding any buffered plaintext.
    pub fn into_inner(self) -> St {
        self.stream
    }

    /// Receive and open a single frame.
    async fn next_frame(&mut self, capacity: usize) -> Result<Bytes, Error> {
        let mut nonce = [0u8; NONCE_LENGTH];
        recv_exact(&mut self.stream, &mut nonce).await?;

        // The ciphertext is whatever a single receive yields, up to the bound
        let limit = capacity.max(self.max_message_size) + AUTHENTICATION_TAG_LENGTH;
        self.scratch.resize(limit, 0);
        let n = self
            .stream
            .recv(&mut self.scratch)
            .await
            .map_err(Error::RecvFailed)?;
        if n == 0 {
            return Err(Error::Truncated {
                expected: NONCE_LENGTH + AUTHENTICATION_TAG_LENGTH,
                actual: NONCE_LENGTH,
            });
        }

        let plaintext = self.key.open(&nonce, &self.scratch[..n])?;
        Ok(Bytes::from(plaintext))
    }
}

impl<St: Stream> Reader for SecureReader<St> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        // An empty frame carries no data, so keep going until one does
        while self.pending.is_empty() {
            self.pending = self.next_frame(buf.len()).await?;
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}
