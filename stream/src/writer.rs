//! Encrypting half of a secure stream.

use crate::{
    cipher::SharedKey, transport::Sink, utils::codec::send_exact, Closer, Config, Error, Writer,
    NONCE_LENGTH,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};

/// Seals every write into an independent frame before handing it to the [Sink].
///
/// Each frame is a fresh random nonce (drawn from `R`) followed by the ciphertext
/// (with its authentication tag).
pub struct SecureWriter<Si: Sink, R = OsRng> {
    sink: Si,
    key: SharedKey,
    rng: R,
    max_message_size: usize,
}

impl<Si: Sink> SecureWriter<Si> {
    /// Create a writer that draws nonces from the operating system.
    pub fn new(sink: Si, key: SharedKey, config: &Config) -> Self {
        Self::with_rng(sink, key, OsRng, config)
    }
}

impl<Si: Sink, R: RngCore + CryptoRng> SecureWriter<Si, R> {
    /// Create a writer that draws nonces from `rng`.
    pub fn with_rng(sink: Si, key: SharedKey, rng: R, config: &Config) -> Self {
        Self {
            sink,
            key,
            rng,
            max_message_size: config.max_message_size,
        }
    }

    /// Release the underlying [Sink] without closing it.
    pub fn into_inner(self) -> Si {
        self.sink
    }
}

impl<Si: Sink, R: RngCore + CryptoRng + Send> Writer for SecureWriter<Si, R> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if buf.len() > self.max_message_size {
            return Err(Error::SendTooLarge(buf.len()));
        }

        // Draw a fresh nonce for this frame
        let mut nonce = [0u8; NONCE_LENGTH];
        self.rng
            .try_fill_bytes(&mut nonce)
            .map_err(Error::RandomSource)?;
        let ciphertext = self.key.seal(&nonce, buf)?;

        // Nonce and ciphertext are sent back-to-back
        send_exact(&mut self.sink, &nonce).await?;
        send_exact(&mut self.sink, &ciphertext).await?;
        Ok(buf.len())
    }
}

impl<Si: Sink, R: Send> Closer for SecureWriter<Si, R> {
    async fn close(&mut self) -> Result<(), Error> {
        self.sink.close().await.map_err(Error::SendFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cipher::KEY_LENGTH,
        transport::{self, mocks, Stream as _},
        AUTHENTICATION_TAG_LENGTH,
    };
    use futures::executor::block_on;
    use rand::{rngs::StdRng, SeedableRng as _};
    use test_case::test_case;

    fn key() -> SharedKey {
        SharedKey::from([3u8; KEY_LENGTH])
    }

    /// Collect everything sent until the sink is closed.
    async fn drain(stream: &mut mocks::Stream) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        let mut buf = vec![0u8; 1024];
        loop {
            let n = stream.recv(&mut buf).await.unwrap();
            if n == 0 {
                return chunks;
            }
            chunks.push(buf[..n].to_vec());
        }
    }

    /// A sink that reports accepting fewer bytes than requested once `budget` is spent.
    struct ShortSink {
        budget: usize,
    }

    impl Sink for ShortSink {
        async fn send(&mut self, buf: &[u8]) -> Result<usize, transport::Error> {
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        async fn close(&mut self) -> Result<(), transport::Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_empty() {
        let (sink, mut stream) = mocks::Channel::init();
        let mut writer = SecureWriter::new(sink, key(), &Config::default());
        assert_eq!(writer.write(&[]).await.unwrap(), 0);
        writer.close().await.unwrap();

        // Nothing reached the transport
        assert!(drain(&mut stream).await.is_empty());
    }

    #[tokio::test]
    async fn test_write_frame_layout() {
        let (sink, mut stream) = mocks::Channel::init();
        let mut writer = SecureWriter::new(sink, key(), &Config::default());
        let msg = b"hello world\n";
        assert_eq!(writer.write(msg).await.unwrap(), msg.len());
        writer.close().await.unwrap();

        let chunks = drain(&mut stream).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), NONCE_LENGTH);
        assert_eq!(chunks[1].len(), msg.len() + AUTHENTICATION_TAG_LENGTH);

        // The plaintext never appears on the wire
        let wire = chunks.concat();
        assert!(!wire.windows(msg.len()).any(|w| w == msg));

        // The frame opens under the same key
        let nonce: [u8; NONCE_LENGTH] = chunks[0].as_slice().try_into().unwrap();
        assert_eq!(key().open(&nonce, &chunks[1]).unwrap(), msg);
    }

    #[tokio::test]
    async fn test_write_fresh_nonce() {
        let (sink, mut stream) = mocks::Channel::init();
        let mut writer = SecureWriter::new(sink, key(), &Config::default());
        writer.write(b"same").await.unwrap();
        writer.write(b"same").await.unwrap();
        writer.close().await.unwrap();

        let chunks = drain(&mut stream).await;
        assert_eq!(chunks.len(), 4);
        assert_ne!(chunks[0], chunks[2]);
        assert_ne!(chunks[1], chunks[3]);
    }

    /// An RNG that always fails.
    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            panic!("exhausted")
        }

        fn next_u64(&mut self) -> u64 {
            panic!("exhausted")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("exhausted")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("exhausted"))
        }
    }

    impl CryptoRng for FailingRng {}

    #[tokio::test]
    async fn test_write_nonce_from_rng() {
        let (sink, mut stream) = mocks::Channel::init();
        let rng = StdRng::seed_from_u64(42);
        let mut writer = SecureWriter::with_rng(sink, key(), rng, &Config::default());
        writer.write(b"seeded").await.unwrap();
        writer.close().await.unwrap();

        // The nonce is exactly what the injected RNG produced
        let mut expected = [0u8; NONCE_LENGTH];
        StdRng::seed_from_u64(42).fill_bytes(&mut expected);
        let chunks = drain(&mut stream).await;
        assert_eq!(chunks[0], expected);
        assert_eq!(key().open(&expected, &chunks[1]).unwrap(), b"seeded");
    }

    #[tokio::test]
    async fn test_write_rng_failure() {
        let (sink, mut stream) = mocks::Channel::init();
        let mut writer = SecureWriter::with_rng(sink, key(), FailingRng, &Config::default());
        assert!(matches!(
            writer.write(b"no nonce").await,
            Err(Error::RandomSource(_))
        ));
        writer.close().await.unwrap();

        // Nothing reached the transport
        assert!(drain(&mut stream).await.is_empty());
    }

    #[tokio::test]
    async fn test_write_too_large() {
        let (sink, mut stream) = mocks::Channel::init();
        let config = Config {
            max_message_size: 8,
        };
        let mut writer = SecureWriter::new(sink, key(), &config);
        assert!(matches!(
            writer.write(&[0u8; 9]).await,
            Err(Error::SendTooLarge(9))
        ));
        assert_eq!(writer.write(&[0u8; 8]).await.unwrap(), 8);
        writer.close().await.unwrap();
        assert_eq!(drain(&mut stream).await.len(), 2);
    }

    #[tokio::test]
    async fn test_write_closed_sink() {
        let (sink, _stream) = mocks::Channel::init();
        let mut writer = SecureWriter::new(sink, key(), &Config::default());
        writer.close().await.unwrap();
        assert!(matches!(
            writer.write(b"late").await,
            Err(Error::SendFailed(transport::Error::Closed))
        ));
        assert!(matches!(
            writer.close().await,
            Err(Error::SendFailed(transport::Error::Closed))
        ));
    }

    #[test_case(0, NONCE_LENGTH; "nonce short")]
    #[test_case(NONCE_LENGTH, 5 + AUTHENTICATION_TAG_LENGTH; "ciphertext short")]
    #[test_case(NONCE_LENGTH - 1, NONCE_LENGTH; "nonce partially written")]
    fn test_write_short(budget: usize, expected: usize) {
        block_on(async {
            let mut writer = SecureWriter::new(ShortSink { budget }, key(), &Config::default());
            let result = writer.write(b"short").await;
            match result {
                Err(Error::ShortWrite {
                    expected: e,
                    actual,
                }) => {
                    assert_eq!(e, expected);
                    assert!(actual < e);
                }
                other => panic!("unexpected result: {other:?}"),
            }
        });
    }
}
