//! Parsed Commands
//!
//! The dispatch layer works on [`RedisCmd`], an immutable view of one
//! client command: a name drawn from the closed [`CmdName`] set
//! (case-normalized off the wire) plus its argument list. Commands the
//! server does not recognize map to [`CmdName::Unknown`] while keeping
//! the normalized wire text, so the fallback can still name them in its
//! error reply.

use crate::connection::RedisClient;
use bytes::Bytes;
use std::sync::Arc;

/// The commands this server recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdName {
    Auth,
    Config,
    Echo,
    Info,
    Ping,
    Quit,
    /// Anything outside the recognized set
    Unknown,
}

impl CmdName {
    /// Maps normalized (uppercased) wire text onto the closed set.
    fn from_normalized(name: &str) -> Self {
        match name {
            "AUTH" => CmdName::Auth,
            "CONFIG" => CmdName::Config,
            "ECHO" => CmdName::Echo,
            "INFO" => CmdName::Info,
            "PING" => CmdName::Ping,
            "QUIT" => CmdName::Quit,
            _ => CmdName::Unknown,
        }
    }

    /// Canonical spelling of the name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CmdName::Auth => "AUTH",
            CmdName::Config => "CONFIG",
            CmdName::Echo => "ECHO",
            CmdName::Info => "INFO",
            CmdName::Ping => "PING",
            CmdName::Quit => "QUIT",
            CmdName::Unknown => "UNKNOWN",
        }
    }
}

/// One parsed client command. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RedisCmd {
    name: CmdName,
    raw_name: String,
    args: Vec<Bytes>,
}

impl RedisCmd {
    /// Builds a command from the words of a decoded frame.
    ///
    /// The first word is the command name; it is uppercased before being
    /// matched against the closed set, so `ping`, `Ping` and `PING` are
    /// the same command. Returns `None` when `words` is empty.
    pub fn from_words(words: Vec<Bytes>) -> Option<Self> {
        let mut words = words.into_iter();
        let first = words.next()?;
        let raw_name = String::from_utf8_lossy(&first).to_ascii_uppercase();
        let name = CmdName::from_normalized(&raw_name);

        Some(Self {
            name,
            raw_name,
            args: words.collect(),
        })
    }

    /// Builds a command directly from a recognized name.
    pub fn new(name: CmdName, args: Vec<Bytes>) -> Self {
        Self {
            name,
            raw_name: name.as_str().to_string(),
            args,
        }
    }

    /// The command's name within the closed set.
    pub fn name(&self) -> CmdName {
        self.name
    }

    /// The normalized wire text of the name (meaningful for `Unknown`).
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// The command's arguments, in wire order.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// A single argument by position.
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }
}

/// Per-invocation context: one client paired with one parsed command.
///
/// Exclusively owned by the pipeline invocation processing it and not
/// retained afterward. The only mutable state reachable from here is the
/// client's auth flag.
pub struct RedisContext {
    /// The connection the command arrived on
    pub client: Arc<RedisClient>,

    /// The parsed command
    pub cmd: RedisCmd,
}

impl RedisContext {
    /// Ties a client to one of its commands for a pipeline invocation.
    pub fn new(client: Arc<RedisClient>, cmd: RedisCmd) -> Self {
        Self { client, cmd }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_case_normalized() {
        for spelling in ["ping", "Ping", "PING", "pInG"] {
            let cmd = RedisCmd::from_words(vec![Bytes::from(spelling)]).unwrap();
            assert_eq!(cmd.name(), CmdName::Ping);
            assert_eq!(cmd.raw_name(), "PING");
        }
    }

    #[test]
    fn unrecognized_name_keeps_wire_text() {
        let cmd = RedisCmd::from_words(vec![Bytes::from("flushdb")]).unwrap();
        assert_eq!(cmd.name(), CmdName::Unknown);
        assert_eq!(cmd.raw_name(), "FLUSHDB");
    }

    #[test]
    fn arguments_are_preserved_in_order() {
        let cmd = RedisCmd::from_words(vec![
            Bytes::from("CONFIG"),
            Bytes::from("SET"),
            Bytes::from("requirepass"),
            Bytes::from("secret"),
        ])
        .unwrap();
        assert_eq!(cmd.name(), CmdName::Config);
        assert_eq!(cmd.args().len(), 3);
        assert_eq!(cmd.arg(0), Some(&Bytes::from("SET")));
        assert_eq!(cmd.arg(2), Some(&Bytes::from("secret")));
        assert_eq!(cmd.arg(3), None);
    }

    #[test]
    fn empty_word_list_is_not_a_command() {
        assert!(RedisCmd::from_words(Vec::new()).is_none());
    }

    #[test]
    fn binary_name_maps_to_unknown() {
        let cmd = RedisCmd::from_words(vec![Bytes::from(&b"\xfe\xff"[..])]).unwrap();
        assert_eq!(cmd.name(), CmdName::Unknown);
    }

    #[test]
    fn direct_construction_uses_canonical_spelling() {
        let cmd = RedisCmd::new(CmdName::Info, Vec::new());
        assert_eq!(cmd.name(), CmdName::Info);
        assert_eq!(cmd.raw_name(), "INFO");
    }
}
