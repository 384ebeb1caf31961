//! RESP Wire Protocol
//!
//! The two halves of the wire format this crate touches:
//!
//! - `parser`: incremental decoder for inbound client command frames
//! - `encoder`: byte builder and reply frames for outbound responses
//!
//! ## Frame Shapes
//!
//! Inbound commands arrive as arrays of bulk strings (or as inline
//! commands from interactive clients):
//!
//! ```text
//! *2\r\n$4\r\nAUTH\r\n$6\r\nsecret\r\n
//! ```
//!
//! Outbound replies are one of:
//!
//! ```text
//! +OK\r\n                      simple string
//! -ERR unknown command\r\n     error
//! :42\r\n                      integer
//! $5\r\nhello\r\n              bulk string (length in bytes)
//! *2\r\n<element><element>     array
//! ```
//!
//! Replies produce their exact wire bytes at construction time, so
//! sending one is a pure byte copy.

pub mod encoder;
pub mod parser;

// Re-export commonly used types for convenience
pub use encoder::{BufferBuilder, Reply, CRLF};
pub use parser::{CommandParser, ParseError, ParseResult};
