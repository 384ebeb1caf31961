//! Incremental Command-Frame Parser
//!
//! Decodes inbound client traffic into command words. Clients send
//! commands as RESP arrays of bulk strings; interactive tools may also
//! send inline commands (a bare line of space-separated words).
//!
//! The parser is incremental: it is handed the read buffer as-is and
//! returns
//!
//! - `Ok(Some((words, consumed)))` - a complete command; advance the
//!   buffer by `consumed` bytes
//! - `Ok(None)` - the frame is still incomplete, read more first
//! - `Err(ParseError)` - the peer violated the protocol
//!
//! Decoding stops at the word level. Mapping words onto a command name
//! and arguments belongs to the dispatch layer, not the wire format.

use bytes::Bytes;
use thiserror::Error;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of words in one command frame
pub const MAX_COMMAND_WORDS: usize = 1024 * 1024;

/// Errors raised on malformed inbound frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Array header with a negative or oversized element count
    #[error("invalid multibulk length: {0}")]
    InvalidMultibulkLength(i64),

    /// Bulk length line with a negative value
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// A command array element that is not a bulk string
    #[error("expected '$', got {0:#04x}")]
    ExpectedBulkString(u8),

    /// A length line that is not a decimal integer
    #[error("invalid integer in length line")]
    InvalidLengthLine,

    /// Inline commands must be valid UTF-8
    #[error("invalid UTF-8 in inline command")]
    InvalidUtf8,

    /// A bulk payload not terminated by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// A bulk payload above [`MAX_BULK_SIZE`]
    #[error("bulk string too large: {size} bytes (max: {max})")]
    BulkTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Incremental decoder for client command frames.
///
/// # Example
///
/// ```
/// use respline::protocol::CommandParser;
///
/// let parser = CommandParser::new();
/// let buf = b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n";
/// let (words, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(consumed, buf.len());
/// assert_eq!(&words[0][..], b"ECHO");
/// ```
#[derive(Debug, Default)]
pub struct CommandParser;

impl CommandParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one command frame from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if buf[0] == b'*' {
            self.parse_multibulk(buf)
        } else {
            self.parse_inline(buf)
        }
    }

    /// Parses `*<count>\r\n` followed by `count` bulk strings.
    fn parse_multibulk(&self, buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
        let (count, mut pos) = match read_length_line(&buf[1..])? {
            Some((count, line_len)) => (count, 1 + line_len),
            None => return Ok(None),
        };

        if count < 0 || count as usize > MAX_COMMAND_WORDS {
            return Err(ParseError::InvalidMultibulkLength(count));
        }

        let count = count as usize;
        let mut words = Vec::with_capacity(count);

        for _ in 0..count {
            if pos >= buf.len() {
                return Ok(None);
            }
            if buf[pos] != b'$' {
                return Err(ParseError::ExpectedBulkString(buf[pos]));
            }

            let (len, line_len) = match read_length_line(&buf[pos + 1..])? {
                Some(parsed) => parsed,
                None => return Ok(None),
            };
            if len < 0 {
                return Err(ParseError::InvalidBulkLength(len));
            }
            let len = len as usize;
            if len > MAX_BULK_SIZE {
                return Err(ParseError::BulkTooLarge {
                    size: len,
                    max: MAX_BULK_SIZE,
                });
            }

            let data_start = pos + 1 + line_len;
            let data_end = data_start + len;
            if buf.len() < data_end + 2 {
                return Ok(None);
            }
            if &buf[data_end..data_end + 2] != b"\r\n" {
                return Err(ParseError::MissingCrlf);
            }

            words.push(Bytes::copy_from_slice(&buf[data_start..data_end]));
            pos = data_end + 2;
        }

        Ok(Some((words, pos)))
    }

    /// Parses a bare `word word ...\r\n` line.
    fn parse_inline(&self, buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
        let line_end = match find_crlf(buf) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ParseError::InvalidUtf8)?;

        // A blank line is a no-op, not a protocol violation
        let words = line
            .split_whitespace()
            .map(|word| Bytes::copy_from_slice(word.as_bytes()))
            .collect();

        Ok(Some((words, line_end + 2)))
    }
}

/// Reads a `<decimal>\r\n` line, returning the value and total line length.
///
/// Returns `Ok(None)` when the terminator has not arrived yet.
fn read_length_line(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let line_end = match find_crlf(buf) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ParseError::InvalidLengthLine)?;
    let value: i64 = line.parse().map_err(|_| ParseError::InvalidLengthLine)?;

    Ok(Some((value, line_end + 2)))
}

/// Position of the first CRLF pair, if present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == b"\r\n")
}
