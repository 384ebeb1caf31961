//! Connection Handler
//!
//! One handler instance per connection, running the read-decode-invoke
//! loop:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  Read bytes into BytesMut    │
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │  Decode one command frame    │──── incomplete ──> read more
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │  Invoke the pipeline with a  │
//! │  fresh RedisContext, await   │
//! └──────────────┬───────────────┘
//!                ▼
//!           [loop back]
//! ```
//!
//! The pipeline invocation is awaited before the next command is read,
//! so processing within one connection is strictly sequential. Distinct
//! connections run in their own tasks and never block each other.
//!
//! TCP is a stream: a read may hold a partial command or several
//! commands at once, which is why decoding runs off an accumulating
//! buffer.

use crate::commands::{CmdName, RedisCmd, RedisContext};
use crate::connection::client::RedisClient;
use crate::pipeline::Next;
use crate::protocol::{CommandParser, ParseError};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Server-wide connection counters.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Commands handed to the pipeline
    pub commands_dispatched: AtomicU64,
    /// Total bytes read off the wire
    pub bytes_read: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_dispatched(&self) {
        self.commands_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer violated the wire protocol
    #[error("protocol error: {0}")]
    Parse(#[from] ParseError),

    /// A fault escaped a pipeline step or handler
    #[error("pipeline fault: {0}")]
    Pipeline(anyhow::Error),

    /// Client disconnected normally
    #[error("client disconnected")]
    ClientDisconnected,

    /// Stream ended with a partial command in the buffer
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Read buffer limit exceeded
    #[error("read buffer limit exceeded")]
    BufferFull,
}

/// Drives one client connection to completion.
pub struct ConnectionHandler<R> {
    /// Read side of the connection
    reader: R,

    /// Peer address (for logging)
    addr: SocketAddr,

    /// Accumulates inbound bytes until a full frame is present
    buffer: BytesMut,

    /// Inbound frame decoder
    parser: CommandParser,

    /// Client handle shared with pipeline invocations
    client: Arc<RedisClient>,

    /// The composed server pipeline
    pipeline: Next<RedisContext>,

    /// Shared counters
    stats: Arc<ConnectionStats>,
}

impl<R: AsyncRead + Unpin> ConnectionHandler<R> {
    pub fn new(
        reader: R,
        addr: SocketAddr,
        client: Arc<RedisClient>,
        pipeline: Next<RedisContext>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            reader,
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: CommandParser::new(),
            client,
            pipeline,
            stats,
        }
    }

    /// Runs the connection loop until the peer leaves or a fault ends it.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-decode-invoke loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(cmd) = self.next_command()? {
                let quitting = cmd.name() == CmdName::Quit;

                let ctx = RedisContext::new(Arc::clone(&self.client), cmd);
                (self.pipeline)(ctx)
                    .await
                    .map_err(ConnectionError::Pipeline)?;
                self.stats.command_dispatched();

                if quitting {
                    return Ok(());
                }
            }

            // Need more data
            self.read_more_data().await?;
        }
    }

    /// Decodes the next complete command out of the buffer, skipping
    /// frames that carry no words (blank inline lines, empty arrays).
    fn next_command(&mut self) -> Result<Option<RedisCmd>, ConnectionError> {
        loop {
            if self.buffer.is_empty() {
                return Ok(None);
            }

            match self.parser.parse(&self.buffer)? {
                Some((words, consumed)) => {
                    let _ = self.buffer.split_to(consumed);
                    trace!(
                        client = %self.addr,
                        consumed = consumed,
                        remaining = self.buffer.len(),
                        "Decoded command frame"
                    );

                    match RedisCmd::from_words(words) {
                        Some(cmd) => return Ok(Some(cmd)),
                        None => continue,
                    }
                }
                None => {
                    trace!(
                        client = %self.addr,
                        buffered = self.buffer.len(),
                        "Incomplete frame, need more data"
                    );
                    return Ok(None);
                }
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }
}

/// Handles one accepted TCP connection to completion.
///
/// Splits the stream, wraps the write side in a [`RedisClient`], and
/// runs the connection loop, swallowing the expected disconnect cases.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    pipeline: Next<RedisContext>,
    stats: Arc<ConnectionStats>,
) {
    let (reader, writer) = stream.into_split();
    let client = Arc::new(RedisClient::new(addr, BufWriter::new(writer)));

    let handler = ConnectionHandler::new(reader, addr, client, pipeline, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
