use crate::{x25519, Error, NONCE_LENGTH};
use chacha20poly1305::{aead::Aead, KeyInit, KeySizeUser, XChaCha20Poly1305, XNonce};
use hkdf::{hmac::digest::typenum::Unsigned, Hkdf};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Size (in bytes) of the key used by the XChaCha20Poly1305 cipher.
pub const KEY_LENGTH: usize = <XChaCha20Poly1305 as KeySizeUser>::KeySize::USIZE;

/// A constant prefix used for the salt hash in the HKDF key derivation.
/// This prevents key derivation collisions with other applications.
const BASE_KDF_PREFIX: &[u8] = b"sealstream/KDF/v1/";

/// Info for the traffic key (shared by both directions).
const TRAFFIC_INFO: &[u8] = b"traffic";

/// Symmetric key shared by both peers of a connection.
///
/// Derived once per connection and cloned into the reader and writer so the
/// key agreement is never repeated per message.
#[derive(Clone)]
pub struct SharedKey {
    cipher: XChaCha20Poly1305,
}

impl SharedKey {
    /// Encrypt `plaintext` under `nonce`, appending the authentication tag.
    pub fn seal(&self, nonce: &[u8; NONCE_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.cipher
            .encrypt(XNonce::from_slice(nonce), plaintext)
            .map_err(|_| Error::EncryptionFailed)
    }

    /// Authenticate and decrypt `ciphertext` under `nonce`.
    ///
    /// Nothing is returned unless the tag verifies.
    pub fn open(&self, nonce: &[u8; NONCE_LENGTH], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionFailed)
    }
}

impl From<[u8; KEY_LENGTH]> for SharedKey {
    fn from(mut key: [u8; KEY_LENGTH]) -> Self {
        let cipher = XChaCha20Poly1305::new(&key.into());
        key.zeroize();
        Self { cipher }
    }
}

/// Derive the [SharedKey] for a connection from our secret and the peer's public key.
///
/// Both peers arrive at the same key from their respective `(secret, peer public)` pairs.
pub fn derive(
    secret: x25519::EphemeralSecret,
    remote: &x25519::PublicKey,
) -> Result<SharedKey, Error> {
    // Perform the key agreement and ensure it is contributory
    let shared_secret = secret.diffie_hellman(remote);
    if !shared_secret.was_contributory() {
        return Err(Error::SharedSecretNotContributory);
    }
    expand(shared_secret.as_bytes())
}

/// Expand input key material into a [SharedKey] using HKDF-SHA256.
fn expand(ikm: &[u8]) -> Result<SharedKey, Error> {
    let salt = Sha256::digest(BASE_KDF_PREFIX);

    // HKDF-Extract: creates a pseudorandom key (PRK)
    let prk = Hkdf::<Sha256>::new(Some(salt.as_slice()), ikm);

    let mut buf = [0u8; KEY_LENGTH];
    prk.expand(TRAFFIC_INFO, &mut buf)
        .map_err(|_| Error::HKDFExpansion)?;
    let key = SharedKey::from(buf);
    buf.zeroize();
    Ok(key)
}
