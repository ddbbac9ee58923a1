//! One-round exchange of ephemeral public keys.
//!
//! The listener speaks first:
//!
//! ```txt
//! Listener                        Dialer
//!    | ---- PublicKey (32 bytes) ---> |
//!    | <--- PublicKey (32 bytes) ---- |
//! ```
//!
//! Nothing authenticates the exchanged keys. On failure, the transport halves are
//! dropped (closing the connection) and no channel is constructed.

use crate::{
    cipher,
    transport::{Sink, Stream},
    utils::codec::{recv_exact, send_exact},
    x25519::{self, EphemeralSecret, KeyPair, PublicKey},
    Config, Error, SecureChannel, PUBLIC_KEY_LENGTH,
};
use rand::{CryptoRng, Rng};

/// A completed key exchange, ready to be turned into a [SecureChannel].
pub struct Handshake<Si: Sink, St: Stream> {
    secret: EphemeralSecret,
    local: PublicKey,
    remote: PublicKey,
    sink: Si,
    stream: St,
}

impl<Si: Sink, St: Stream> Handshake<Si, St> {
    /// Our ephemeral public key for this connection.
    pub fn local(&self) -> &PublicKey {
        &self.local
    }

    /// The peer's ephemeral public key for this connection.
    pub fn remote(&self) -> &PublicKey {
        &self.remote
    }

    /// Derive the shared key and wrap the transport in a [SecureChannel].
    ///
    /// Consumes the local secret.
    pub fn into_channel(self, config: &Config) -> Result<SecureChannel<Si, St>, Error> {
        let key = cipher::derive(self.secret, &self.remote)?;
        Ok(SecureChannel::new(self.sink, self.stream, key, config))
    }
}

/// Run the handshake as the listener (server role).
///
/// Generates a fresh key pair, sends our public key and then reads the dialer's.
pub async fn listen<R: Rng + CryptoRng, Si: Sink, St: Stream>(
    rng: &mut R,
    mut sink: Si,
    mut stream: St,
) -> Result<Handshake<Si, St>, Error> {
    let (secret, local) = KeyPair::generate(rng).into_parts();
    send_exact(&mut sink, &x25519::encode_public_key(local)).await?;
    let remote = recv_public_key(&mut stream).await?;

    Ok(Handshake {
        secret,
        local,
        remote,
        sink,
        stream,
    })
}

/// Run the handshake as the dialer (client role).
///
/// Reads the listener's public key, then generates a fresh key pair and sends ours.
pub async fn dial<R: Rng + CryptoRng, Si: Sink, St: Stream>(
    rng: &mut R,
    mut sink: Si,
    mut stream: St,
) -> Result<Handshake<Si, St>, Error> {
    let remote = recv_public_key(&mut stream).await?;
    let (secret, local) = KeyPair::generate(rng).into_parts();
    send_exact(&mut sink, &x25519::encode_public_key(local)).await?;

    Ok(Handshake {
        secret,
        local,
        remote,
        sink,
        stream,
    })
}

async fn recv_public_key<St: Stream>(stream: &mut St) -> Result<PublicKey, Error> {
    let mut buf = [0u8; PUBLIC_KEY_LENGTH];
    recv_exact(stream, &mut buf).await?;
    x25519::decode_public_key(&buf)
}
