//! Ephemeral X25519 key pairs.

use crate::{Error, PUBLIC_KEY_LENGTH};
use rand::{CryptoRng, Rng};
pub use x25519_dalek::{EphemeralSecret, PublicKey};

/// A public/private key pair generated for a single connection.
///
/// The secret half is consumed when deriving a [crate::cipher::SharedKey], so it can
/// never be reused across connections.
pub struct KeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from a cryptographically secure RNG.
    pub fn generate<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let secret = EphemeralSecret::random_from_rng(rng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half, safe to transmit.
    pub fn public(&self) -> PublicKey {
        self.public
    }

    /// Split into the secret and public halves.
    pub fn into_parts(self) -> (EphemeralSecret, PublicKey) {
        (self.secret, self.public)
    }
}

pub fn decode_public_key(public_key: &[u8]) -> Result<PublicKey, Error> {
    let public_key: [u8; PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| Error::InvalidPublicKey)?;
    Ok(PublicKey::from(public_key))
}

pub fn encode_public_key(public_key: PublicKey) -> [u8; PUBLIC_KEY_LENGTH] {
    public_key.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_public_key() {
        let mut rng = rand::thread_rng();
        let key_pair = KeyPair::generate(&mut rng);
        let public_key = key_pair.public();

        let encoded = encode_public_key(public_key);
        let decoded = decode_public_key(&encoded).unwrap();

        assert_eq!(public_key, decoded);
    }

    #[test]
    fn test_invalid_public_key() {
        // Too short
        let result = decode_public_key(&[1, 2, 3]);
        assert!(matches!(result, Err(Error::InvalidPublicKey)));

        // Too long
        let result = decode_public_key(&[0u8; 33]);
        assert!(matches!(result, Err(Error::InvalidPublicKey)));
    }

    #[test]
    fn test_fresh_key_pairs_differ() {
        let mut rng = rand::thread_rng();
        let a = KeyPair::generate(&mut rng);
        let b = KeyPair::generate(&mut rng);
        assert_ne!(a.public(), b.public());
    }
}
