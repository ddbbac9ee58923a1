//! Encrypt an arbitrary byte stream with keys agreed over a one-round public key exchange.
//!
//! This crate turns any unauthenticated, unencrypted bidirectional byte stream (for example, a
//! raw TCP connection) into a confidential, integrity-protected stream. Before any application
//! data flows, the two peers swap ephemeral X25519 public keys and each derives the same
//! symmetric key. Afterwards, every write is sealed into an independent frame.
//!
//! # Design
//!
//! ## Handshake
//!
//! Exactly one round trip, with asymmetric roles:
//!
//! - The **listener** (server) generates a fresh key pair, writes its 32-byte public key and then
//!   reads exactly 32 bytes as the dialer's public key.
//! - The **dialer** (client) reads exactly 32 bytes as the listener's public key, generates a
//!   fresh key pair and writes its own 32-byte public key.
//!
//! A short read or short write of either key aborts the handshake and no channel is built.
//!
//! ## Encryption
//!
//! The X25519 output is expanded with HKDF-SHA256 into a single 32-byte key which is computed
//! once per connection and shared by both directions. Frames are sealed with XChaCha20-Poly1305
//! under a nonce drawn uniformly at random for every write:
//!
//! ```txt
//! HandshakeMessage := PublicKey                          (32 bytes)
//! Frame            := Nonce (24 bytes) || Ciphertext     (N + 16 bytes for N bytes of plaintext)
//! ```
//!
//! Frames carry no length prefix. A reader infers the ciphertext length from what the transport
//! delivers in a single receive, bounded by `max(capacity, max_message_size)` plus the tag.
//!
//! ## Frame Boundaries
//!
//! Because of this, a frame is only recovered intact when the transport preserves write
//! boundaries. A byte stream like TCP does not: two frames written back-to-back can arrive in one
//! receive (the buffered TCP reader returns both), or one frame can be split over
//! several. Either way the ciphertext fails authentication with [Error::DecryptionFailed] and
//! the connection must be dropped. Applications that write more than one frame before waiting
//! for a reply should wait for each reply first or add their own framing.
//!
//! ## Compatibility
//!
//! The construction is HKDF-SHA256 + XChaCha20-Poly1305, not NaCl `box` (X25519 +
//! XSalsa20-Poly1305 over the raw shared secret). Frames are not wire-compatible with peers that
//! speak the NaCl format, even though the handshake message is the same 32-byte key.
//!
//! # Security
//!
//! ## Provided
//!
//! - **Confidentiality and Integrity**: Each frame is authenticated; a flipped bit is reported as
//!   [Error::DecryptionFailed] and no plaintext is released.
//! - **Forward Secrecy**: Key pairs are ephemeral and generated per connection.
//!
//! ## Not Provided
//!
//! - **Peer Authentication**: The handshake trusts whichever public key arrives first. An active
//!   attacker can substitute keys.
//! - **Replay and Reordering Protection**: Frames carry no sequence numbers.
//! - **Renegotiation**: Keys are fixed for the lifetime of a connection.

pub mod channel;
pub mod cipher;
pub mod connection;
pub mod handshake;
pub mod reader;
pub mod transport;
pub mod utils;
pub mod writer;
pub mod x25519;

pub use channel::SecureChannel;
pub use reader::SecureReader;
pub use writer::SecureWriter;

use chacha20poly1305::{
    aead::{generic_array::typenum::Unsigned, AeadCore},
    XChaCha20Poly1305,
};
use std::future::Future;
use thiserror::Error;

/// Size (in bytes) of an encoded X25519 public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Size (in bytes) of the nonce written in the clear before every ciphertext.
pub const NONCE_LENGTH: usize = <XChaCha20Poly1305 as AeadCore>::NonceSize::USIZE;

// When encrypting data, an authentication tag is appended to the ciphertext.
// This constant represents the size of the authentication tag in bytes.
pub const AUTHENTICATION_TAG_LENGTH: usize = <XChaCha20Poly1305 as AeadCore>::TagSize::USIZE;

/// Errors that can occur when interacting with a secure stream.
#[derive(Error, Debug)]
pub enum Error {
    // Transport errors
    #[error("send failed: {0}")]
    SendFailed(transport::Error),
    #[error("recv failed: {0}")]
    RecvFailed(transport::Error),
    #[error("network failed: {0}")]
    Network(transport::Error),
    #[error("short write: wrote {actual} of {expected} bytes")]
    ShortWrite { expected: usize, actual: usize },

    // Protocol errors
    #[error("truncated field: read {actual} of {expected} bytes")]
    Truncated { expected: usize, actual: usize },
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("send too large: {0} bytes")]
    SendTooLarge(usize),

    // Cryptographic errors
    #[error("shared secret was not contributory")]
    SharedSecretNotContributory,
    #[error("HKDF expansion failed")]
    HKDFExpansion,
    #[error("random source failed: {0}")]
    RandomSource(rand::Error),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,

    // Lifecycle
    #[error("end of stream")]
    EndOfStream,
    #[error("channel closed")]
    ChannelClosed,
}

impl Error {
    /// Returns true if the peer closed the transport cleanly before a new frame began.
    ///
    /// This distinguishes "peer hung up" from "peer sent garbage".
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// Configuration for a secure stream.
///
/// # Warning
///
/// Synchronize this configuration across all peers. A reader with a smaller
/// `max_message_size` than its peer's writer will fail to authenticate large frames.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum plaintext size (in bytes) of a single frame. Prevents memory exhaustion.
    ///
    /// Writes larger than this are rejected and each read consumes at most
    /// `max(capacity, max_message_size) + AUTHENTICATION_TAG_LENGTH` bytes of ciphertext.
    pub max_message_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024, // 64 KB
        }
    }
}

/// Capability to read decrypted bytes.
pub trait Reader: Send {
    /// Read decrypted bytes into `buf`, returning how many were copied.
    ///
    /// An empty `buf` is a no-op that returns `Ok(0)`.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Error>> + Send;
}

/// Capability to write bytes that are encrypted before reaching the transport.
pub trait Writer: Send {
    /// Encrypt `buf` into a single frame, returning the number of plaintext bytes delivered.
    ///
    /// An empty `buf` is a no-op that returns `Ok(0)`.
    fn write(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize, Error>> + Send;
}

/// Capability to release the underlying transport.
pub trait Closer: Send {
    /// Close the underlying transport.
    fn close(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
}
