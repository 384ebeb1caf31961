//! Reply Encoder
//!
//! Outbound frames are produced through [`BufferBuilder`], an incremental
//! byte builder over resizable backing storage, and wrapped in [`Reply`],
//! which is immutable once constructed. Every reply shape emits its exact
//! wire bytes up front; `as_bytes()` is then a borrow and sending is a
//! plain byte copy. This runs on every response, so the builder avoids
//! intermediate allocations (`itoa` for decimal fields, one buffer per
//! frame).

use bytes::{BufMut, Bytes, BytesMut};

/// The line terminator used by the RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// Incremental builder for a single wire frame.
///
/// # Example
///
/// ```
/// use respline::protocol::BufferBuilder;
///
/// let mut builder = BufferBuilder::new();
/// builder.write(b"$").write_decimal(5).write_crlf().write(b"hello").write_crlf();
/// assert_eq!(&builder.freeze()[..], b"$5\r\nhello\r\n");
/// ```
#[derive(Debug, Default)]
pub struct BufferBuilder {
    buf: BytesMut,
}

impl BufferBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Creates a builder with pre-reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends raw bytes.
    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends a single byte.
    pub fn write_byte(&mut self, byte: u8) -> &mut Self {
        self.buf.put_u8(byte);
        self
    }

    /// Appends a decimal-formatted integer, without allocating.
    pub fn write_decimal(&mut self, n: i64) -> &mut Self {
        let mut fmt = itoa::Buffer::new();
        self.buf.extend_from_slice(fmt.format(n).as_bytes());
        self
    }

    /// Appends the RESP line terminator.
    pub fn write_crlf(&mut self) -> &mut Self {
        self.buf.extend_from_slice(CRLF);
        self
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finishes the frame, returning its immutable byte sequence.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// An outgoing reply, one variant per reply shape.
///
/// Each variant holds the complete, protocol-exact wire frame, built at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple string frame: `+<s>\r\n`
    Simple(Bytes),

    /// Error frame: `-<message>\r\n`
    Error(Bytes),

    /// Integer frame: `:<n>\r\n`
    Integer(Bytes),

    /// Bulk string frame: `$<byte-length>\r\n<payload>\r\n`
    Bulk(Bytes),

    /// Array of bulk strings: `*<count>\r\n<bulk frames>`
    MultiBulk(Bytes),
}

impl Reply {
    /// Builds a simple string reply.
    pub fn simple(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();
        let mut builder = BufferBuilder::with_capacity(1 + s.len() + 2);
        builder.write_byte(b'+').write(s.as_bytes()).write_crlf();
        Reply::Simple(builder.freeze())
    }

    /// Builds an error reply.
    pub fn error(message: impl AsRef<str>) -> Self {
        let message = message.as_ref();
        let mut builder = BufferBuilder::with_capacity(1 + message.len() + 2);
        builder.write_byte(b'-').write(message.as_bytes()).write_crlf();
        Reply::Error(builder.freeze())
    }

    /// Builds an integer reply.
    pub fn integer(n: i64) -> Self {
        let mut builder = BufferBuilder::with_capacity(16);
        builder.write_byte(b':').write_decimal(n).write_crlf();
        Reply::Integer(builder.freeze())
    }

    /// Builds a bulk string reply.
    ///
    /// The length prefix is the payload's length in bytes, not characters.
    pub fn bulk(payload: impl AsRef<[u8]>) -> Self {
        let payload = payload.as_ref();
        let mut builder = BufferBuilder::with_capacity(payload.len() + 16);
        builder
            .write_byte(b'$')
            .write_decimal(payload.len() as i64)
            .write_crlf()
            .write(payload)
            .write_crlf();
        Reply::Bulk(builder.freeze())
    }

    /// Builds an array-of-bulk-strings reply.
    pub fn multi_bulk<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let items: Vec<B> = items.into_iter().collect();
        let mut builder = BufferBuilder::new();
        builder
            .write_byte(b'*')
            .write_decimal(items.len() as i64)
            .write_crlf();
        for item in &items {
            let payload = item.as_ref();
            builder
                .write_byte(b'$')
                .write_decimal(payload.len() as i64)
                .write_crlf()
                .write(payload)
                .write_crlf();
        }
        Reply::MultiBulk(builder.freeze())
    }

    /// The canonical `+OK\r\n` reply.
    pub fn ok() -> Self {
        Reply::Simple(Bytes::from_static(b"+OK\r\n"))
    }

    /// The canonical `+PONG\r\n` reply.
    pub fn pong() -> Self {
        Reply::Simple(Bytes::from_static(b"+PONG\r\n"))
    }

    /// The final wire bytes of this reply.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Reply::Simple(b)
            | Reply::Error(b)
            | Reply::Integer(b)
            | Reply::Bulk(b)
            | Reply::MultiBulk(b) => b,
        }
    }

    /// Returns true if this reply is an error frame.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains_writes() {
        let mut builder = BufferBuilder::new();
        builder
            .write_byte(b'$')
            .write_decimal(4)
            .write_crlf()
            .write(b"info")
            .write_crlf();
        assert_eq!(&builder.freeze()[..], b"$4\r\ninfo\r\n");
    }

    #[test]
    fn builder_grows_past_initial_capacity() {
        let mut builder = BufferBuilder::with_capacity(4);
        let payload = vec![b'x'; 1024];
        builder.write(&payload);
        assert_eq!(builder.len(), 1024);
        assert_eq!(&builder.freeze()[..], &payload[..]);
    }

    #[test]
    fn builder_writes_negative_decimal() {
        let mut builder = BufferBuilder::new();
        builder.write_decimal(-1);
        assert_eq!(&builder.freeze()[..], b"-1");
    }

    #[test]
    fn simple_frame() {
        assert_eq!(Reply::simple("OK").as_bytes(), b"+OK\r\n");
        assert_eq!(Reply::ok().as_bytes(), b"+OK\r\n");
        assert_eq!(Reply::pong().as_bytes(), b"+PONG\r\n");
    }

    #[test]
    fn error_frame() {
        let reply = Reply::error("ERR unknown command 'FOO'");
        assert_eq!(reply.as_bytes(), b"-ERR unknown command 'FOO'\r\n");
        assert!(reply.is_error());
    }

    #[test]
    fn integer_frame() {
        assert_eq!(Reply::integer(1000).as_bytes(), b":1000\r\n");
        assert_eq!(Reply::integer(-42).as_bytes(), b":-42\r\n");
    }

    #[test]
    fn bulk_frame_uses_payload_byte_length() {
        assert_eq!(Reply::bulk("hello").as_bytes(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn bulk_frame_counts_bytes_not_characters() {
        // "héllo" is five characters but six bytes in UTF-8
        let reply = Reply::bulk("héllo".as_bytes());
        assert_eq!(reply.as_bytes(), "$6\r\nhéllo\r\n".as_bytes());
    }

    #[test]
    fn empty_bulk_frame() {
        assert_eq!(Reply::bulk(b"").as_bytes(), b"$0\r\n\r\n");
    }

    #[test]
    fn bulk_frame_is_binary_safe() {
        let reply = Reply::bulk(&b"a\x00b"[..]);
        assert_eq!(reply.as_bytes(), b"$3\r\na\x00b\r\n");
    }

    #[test]
    fn multi_bulk_frame() {
        let reply = Reply::multi_bulk([&b"requirepass"[..], &b"secret"[..]]);
        assert_eq!(
            reply.as_bytes(),
            b"*2\r\n$11\r\nrequirepass\r\n$6\r\nsecret\r\n"
        );
    }

    #[test]
    fn empty_multi_bulk_frame() {
        let reply = Reply::multi_bulk(std::iter::empty::<&[u8]>());
        assert_eq!(reply.as_bytes(), b"*0\r\n");
    }
}
