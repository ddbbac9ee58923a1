use super::Error;
use futures::{
    channel::oneshot,
    future::{select, Either},
};
use std::{net::SocketAddr, pin::pin, time::Duration};
use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
    time::timeout,
};
use tracing::warn;

/// Implementation of [super::Sink] over a TCP connection.
///
/// Closing (or dropping) the sink also releases the paired [Stream]: any pending or
/// future [super::Stream::recv] fails with [Error::Closed].
pub struct Sink {
    write_timeout: Duration,
    sink: OwnedWriteHalf,
    closed: Option<oneshot::Sender<()>>,
}

impl super::Sink for Sink {
    async fn send(&mut self, buf: &[u8]) -> Result<usize, Error> {
        // Time out if we take too long to write
        timeout(self.write_timeout, self.sink.write_all(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|_| Error::SendFailed)?;
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<(), Error> {
        // Dropping the sender wakes the read half
        drop(self.closed.take());

        timeout(self.write_timeout, self.sink.shutdown())
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::Io)
    }
}

/// Implementation of [super::Stream] over a TCP connection.
///
/// Uses a [`BufReader`] to reduce syscall overhead. Multiple small reads
/// can be satisfied from the buffer without additional network operations.
pub struct Stream {
    read_timeout: Duration,
    stream: Option<BufReader<OwnedReadHalf>>,
    closed: oneshot::Receiver<()>,
}

impl super::Stream for Stream {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::Closed);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        // Time out if we take too long to read
        let result = {
            let read = pin!(timeout(self.read_timeout, stream.read(buf)));
            match select(&mut self.closed, read).await {
                Either::Left(_) => None,
                Either::Right((result, _)) => Some(result),
            }
        };

        // The local sink was closed, so release the read half
        let Some(result) = result else {
            self.stream = None;
            return Err(Error::Closed);
        };
        result
            .map_err(|_| Error::Timeout)?
            .map_err(|_| Error::RecvFailed)
    }
}

/// Implementation of [super::Listener] over a TCP socket.
pub struct Listener {
    cfg: Config,
    listener: TcpListener,
}

impl super::Listener for Listener {
    type Sink = Sink;
    type Stream = Stream;

    async fn accept(&mut self) -> Result<(SocketAddr, Self::Sink, Self::Stream), Error> {
        // Accept a new TCP stream
        let (stream, addr) = self.listener.accept().await.map_err(|_| Error::Closed)?;
        let (sink, stream) = self.cfg.split(stream);
        Ok((addr, sink, stream))
    }

    fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }
}

/// Configuration for the TCP implementation of [super::Network].
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether or not to disable Nagle's algorithm.
    ///
    /// Frames are written as a nonce followed by a ciphertext, so latency-sensitive
    /// deployments should consider disabling it to avoid delaying the second write.
    tcp_nodelay: Option<bool>,
    /// Read timeout for connections, after which the read fails.
    read_timeout: Duration,
    /// Write timeout for connections, after which the write fails.
    write_timeout: Duration,
    /// Size of the read buffer for batching network reads.
    read_buffer_size: usize,
}

impl Config {
    // Setters
    /// See [Config]
    pub const fn with_tcp_nodelay(mut self, tcp_nodelay: Option<bool>) -> Self {
        self.tcp_nodelay = tcp_nodelay;
        self
    }
    /// See [Config]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
    /// See [Config]
    pub const fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }
    /// See [Config]
    pub const fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    // Getters
    /// See [Config]
    pub const fn tcp_nodelay(&self) -> Option<bool> {
        self.tcp_nodelay
    }
    /// See [Config]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
    /// See [Config]
    pub const fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
    /// See [Config]
    pub const fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    fn split(&self, stream: TcpStream) -> (Sink, Stream) {
        if let Some(tcp_nodelay) = self.tcp_nodelay {
            if let Err(err) = stream.set_nodelay(tcp_nodelay) {
                warn!(?err, "failed to set TCP_NODELAY");
            }
        }

        let (read_half, sink) = stream.into_split();
        let (closer, closed) = oneshot::channel();
        (
            Sink {
                write_timeout: self.write_timeout,
                sink,
                closed: Some(closer),
            },
            Stream {
                read_timeout: self.read_timeout,
                stream: Some(BufReader::with_capacity(self.read_buffer_size, read_half)),
                closed,
            },
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tcp_nodelay: Some(true),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(30),
            read_buffer_size: 64 * 1024, // 64 KB
        }
    }
}

/// [super::Network] implementation over TCP.
#[derive(Clone, Debug, Default)]
pub struct Network {
    cfg: Config,
}

impl From<Config> for Network {
    fn from(cfg: Config) -> Self {
        Self { cfg }
    }
}

impl super::Network for Network {
    type Listener = Listener;

    async fn bind(&self, socket: SocketAddr) -> Result<Self::Listener, Error> {
        TcpListener::bind(socket)
            .await
            .map_err(|_| Error::BindFailed)
            .map(|listener| Listener {
                cfg: self.cfg.clone(),
                listener,
            })
    }

    async fn dial(&self, socket: SocketAddr) -> Result<(Sink, Stream), Error> {
        let stream = TcpStream::connect(socket)
            .await
            .map_err(|_| Error::ConnectionFailed)?;
        Ok(self.cfg.split(stream))
    }
}
