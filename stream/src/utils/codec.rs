use crate::{
    transport::{Sink, Stream},
    Error,
};

/// Sends all of `buf` to the sink.
/// Returns an error if the sink fails or accepts fewer bytes than provided.
pub async fn send_exact<Si: Sink>(sink: &mut Si, buf: &[u8]) -> Result<(), Error> {
    let n = sink.send(buf).await.map_err(Error::SendFailed)?;
    if n != buf.len() {
        return Err(Error::ShortWrite {
            expected: buf.len(),
            actual: n,
        });
    }
    Ok(())
}

/// Fills `buf` from the stream.
///
/// Returns [Error::EndOfStream] if the stream closes before any byte is read and
/// [Error::Truncated] if it closes part way through.
pub async fn recv_exact<St: Stream>(stream: &mut St, buf: &mut [u8]) -> Result<(), Error> {
    let mut read = 0;
    while read < buf.len() {
        let n = stream
            .recv(&mut buf[read..])
            .await
            .map_err(Error::RecvFailed)?;
        if n == 0 {
            if read == 0 {
                return Err(Error::EndOfStream);
            }
            return Err(Error::Truncated {
                expected: buf.len(),
                actual: read,
            });
        }
        read += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{self, mocks};
    use futures::executor::block_on;

    /// A sink that accepts at most `limit` bytes per send.
    struct ShortSink {
        limit: usize,
    }

    impl Sink for ShortSink {
        async fn send(&mut self, buf: &[u8]) -> Result<usize, transport::Error> {
            Ok(buf.len().min(self.limit))
        }

        async fn close(&mut self) -> Result<(), transport::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_send_exact() {
        block_on(async {
            let (mut sink, mut stream) = mocks::Channel::init();
            send_exact(&mut sink, b"exact").await.unwrap();

            let mut buf = [0u8; 5];
            recv_exact(&mut stream, &mut buf).await.unwrap();
            assert_eq!(&buf, b"exact");
        });
    }

    #[test]
    fn test_send_exact_short() {
        block_on(async {
            let mut sink = ShortSink { limit: 3 };
            let result = send_exact(&mut sink, b"exact").await;
            assert!(matches!(
                result,
                Err(Error::ShortWrite {
                    expected: 5,
                    actual: 3
                })
            ));
        });
    }

    #[test]
    fn test_send_exact_closed() {
        block_on(async {
            let (mut sink, _stream) = mocks::Channel::init();
            sink.close().await.unwrap();
            let result = send_exact(&mut sink, b"late").await;
            assert!(matches!(
                result,
                Err(Error::SendFailed(transport::Error::Closed))
            ));
        });
    }

    #[test]
    fn test_recv_exact_across_sends() {
        block_on(async {
            let (mut sink, mut stream) = mocks::Channel::init();
            sink.send(b"hel").await.unwrap();
            sink.send(b"lo").await.unwrap();

            let mut buf = [0u8; 5];
            recv_exact(&mut stream, &mut buf).await.unwrap();
            assert_eq!(&buf, b"hello");
        });
    }

    #[test]
    fn test_recv_exact_end_of_stream() {
        block_on(async {
            let (mut sink, mut stream) = mocks::Channel::init();
            sink.close().await.unwrap();

            let mut buf = [0u8; 5];
            let result = recv_exact(&mut stream, &mut buf).await;
            assert!(matches!(result, Err(Error::EndOfStream)));
        });
    }

    #[test]
    fn test_recv_exact_truncated() {
        block_on(async {
            let (mut sink, mut stream) = mocks::Channel::init();
            sink.send(b"abc").await.unwrap();
            sink.close().await.unwrap();

            let mut buf = [0u8; 5];
            let result = recv_exact(&mut stream, &mut buf).await;
            assert!(matches!(
                result,
                Err(Error::Truncated {
                    expected: 5,
                    actual: 3
                })
            ));
        });
    }
}
