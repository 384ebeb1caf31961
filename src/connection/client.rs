//! Client Handle
//!
//! [`RedisClient`] is the per-connection handle the pipeline works
//! against: the tri-state authentication flag and the send side of the
//! connection. The transport owns the socket; this type never opens or
//! closes anything.
//!
//! ## The Auth Flag
//!
//! Per-connection processing is strictly sequential (the transport awaits
//! one pipeline invocation before reading the next command), and only
//! invocations belonging to this connection touch the flag. A relaxed
//! atomic is therefore enough; no lock is involved on the hot path.

use crate::protocol::Reply;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Tri-state authentication flag for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthState {
    /// Nothing decided yet; the auth gate will resolve this
    Unknown = 0,
    /// The session may run commands
    Authenticated = 1,
    /// The session presented a wrong password; everything is refused
    Rejected = 2,
}

impl AuthState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AuthState::Authenticated,
            2 => AuthState::Rejected,
            _ => AuthState::Unknown,
        }
    }
}

/// One connected client: auth flag plus the connection's write side.
pub struct RedisClient {
    /// Peer address (for logging)
    addr: SocketAddr,

    /// Tri-state auth flag, see [`AuthState`]
    auth: AtomicU8,

    /// Write side of the connection
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl RedisClient {
    /// Wraps the write side of a connection. New sessions start `Unknown`.
    pub fn new(addr: SocketAddr, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            addr,
            auth: AtomicU8::new(AuthState::Unknown as u8),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// The peer's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current auth state.
    pub fn auth_state(&self) -> AuthState {
        AuthState::from_u8(self.auth.load(Ordering::Relaxed))
    }

    /// Moves the session to a new auth state.
    pub fn set_auth_state(&self, state: AuthState) {
        self.auth.store(state as u8, Ordering::Relaxed);
    }

    /// Sends a reply's wire bytes to the peer.
    ///
    /// Replies carry their final bytes already, so this is a write and a
    /// flush. Returns the number of bytes written. Once the connection is
    /// gone this fails with an ordinary I/O error, which propagates out
    /// of the pipeline invocation.
    pub async fn send(&self, reply: &Reply) -> io::Result<usize> {
        let bytes = reply.as_bytes();
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(bytes.len())
    }
}

impl fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisClient")
            .field("addr", &self.addr)
            .field("auth", &self.auth_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn sessions_start_unknown() {
        let client = RedisClient::new(test_addr(), tokio::io::sink());
        assert_eq!(client.auth_state(), AuthState::Unknown);
    }

    #[test]
    fn auth_state_transitions_are_visible() {
        let client = RedisClient::new(test_addr(), tokio::io::sink());

        client.set_auth_state(AuthState::Authenticated);
        assert_eq!(client.auth_state(), AuthState::Authenticated);

        client.set_auth_state(AuthState::Rejected);
        assert_eq!(client.auth_state(), AuthState::Rejected);
    }

    #[tokio::test]
    async fn send_writes_the_exact_frame() {
        let mock = tokio_test::io::Builder::new().write(b"+PONG\r\n").build();
        let client = RedisClient::new(test_addr(), mock);

        let written = client.send(&Reply::pong()).await.unwrap();
        assert_eq!(written, 7);
    }

    #[tokio::test]
    async fn send_reports_bytes_written() {
        let client = RedisClient::new(test_addr(), tokio::io::sink());
        let reply = Reply::bulk("hello");
        let written = client.send(&reply).await.unwrap();
        assert_eq!(written, reply.as_bytes().len());
    }
}
