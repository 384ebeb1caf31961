//! Command Handlers
//!
//! Each handler claims specific commands via `can_handle` and produces
//! exactly one reply for them. Handlers are registered once at startup,
//! shared across all connections, and therefore hold no per-connection
//! state; anything per-session lives on [`RedisClient`].
//!
//! Adding a command to the server means writing one more handler and
//! registering it; nothing else changes.

use crate::commands::cmd::{CmdName, RedisCmd, RedisContext};
use crate::config::ServerOptions;
use crate::connection::RedisClient;
use crate::protocol::Reply;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A component that claims ownership of specific commands.
#[async_trait]
pub trait CmdHandler: Send + Sync {
    /// Pure predicate: does this handler claim the command?
    ///
    /// Typically a match on the command name. Must not have side effects;
    /// dispatch may probe any number of handlers before one claims.
    fn can_handle(&self, ctx: &RedisContext) -> bool;

    /// Processes a claimed command, sending exactly one reply through the
    /// client (or deliberately staying silent).
    async fn handle(&self, client: &RedisClient, cmd: &RedisCmd) -> Result<()>;
}

/// `PING [message]` - liveness probe.
pub struct PingHandler;

#[async_trait]
impl CmdHandler for PingHandler {
    fn can_handle(&self, ctx: &RedisContext) -> bool {
        ctx.cmd.name() == CmdName::Ping
    }

    async fn handle(&self, client: &RedisClient, cmd: &RedisCmd) -> Result<()> {
        let reply = match cmd.arg(0) {
            Some(message) => Reply::bulk(message),
            None => Reply::pong(),
        };
        client.send(&reply).await?;
        Ok(())
    }
}

/// `ECHO message` - returns its argument verbatim.
pub struct EchoHandler;

#[async_trait]
impl CmdHandler for EchoHandler {
    fn can_handle(&self, ctx: &RedisContext) -> bool {
        ctx.cmd.name() == CmdName::Echo
    }

    async fn handle(&self, client: &RedisClient, cmd: &RedisCmd) -> Result<()> {
        let reply = match cmd.arg(0) {
            Some(message) => Reply::bulk(message),
            None => Reply::error("ERR wrong number of arguments for 'echo' command"),
        };
        client.send(&reply).await?;
        Ok(())
    }
}

/// `INFO [section]` - server information as one bulk string.
///
/// The reply frame is built once, at construction time, with the length
/// prefix computed from the payload's byte length. Handling the command
/// is then a pure byte copy.
pub struct InfoHandler {
    reply: Reply,
}

impl InfoHandler {
    /// Info payload for this server build.
    pub fn new() -> Self {
        Self::with_payload(format!("redis_version: {}", crate::VERSION))
    }

    /// Info payload supplied by the caller.
    pub fn with_payload(info: impl AsRef<str>) -> Self {
        Self {
            reply: Reply::bulk(info.as_ref().as_bytes()),
        }
    }
}

impl Default for InfoHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CmdHandler for InfoHandler {
    fn can_handle(&self, ctx: &RedisContext) -> bool {
        ctx.cmd.name() == CmdName::Info
    }

    async fn handle(&self, client: &RedisClient, _cmd: &RedisCmd) -> Result<()> {
        client.send(&self.reply).await?;
        Ok(())
    }
}

/// `CONFIG GET|SET requirepass` - reads or hot-reloads the password.
pub struct ConfigHandler {
    options: Arc<ServerOptions>,
}

impl ConfigHandler {
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self { options }
    }
}

#[async_trait]
impl CmdHandler for ConfigHandler {
    fn can_handle(&self, ctx: &RedisContext) -> bool {
        ctx.cmd.name() == CmdName::Config
    }

    async fn handle(&self, client: &RedisClient, cmd: &RedisCmd) -> Result<()> {
        let subcommand = cmd.arg(0);
        let parameter = cmd.arg(1);

        let reply = match (subcommand, parameter) {
            (Some(sub), Some(param))
                if sub.eq_ignore_ascii_case(b"GET") && param.eq_ignore_ascii_case(b"requirepass") =>
            {
                let current = self.options.requirepass().unwrap_or_default();
                Reply::multi_bulk([b"requirepass".as_slice(), current.as_bytes()])
            }
            (Some(sub), Some(param))
                if sub.eq_ignore_ascii_case(b"SET") && param.eq_ignore_ascii_case(b"requirepass") =>
            {
                match cmd.arg(2).map(|v| std::str::from_utf8(v)) {
                    Some(Ok(value)) => {
                        self.options.set_requirepass(Some(value.to_string()));
                        Reply::ok()
                    }
                    Some(Err(_)) => Reply::error("ERR invalid password value"),
                    None => Reply::error("ERR wrong number of arguments for 'config' command"),
                }
            }
            (Some(sub), Some(_))
                if sub.eq_ignore_ascii_case(b"GET") || sub.eq_ignore_ascii_case(b"SET") =>
            {
                Reply::error("ERR unsupported CONFIG parameter")
            }
            _ => Reply::error("ERR wrong number of arguments for 'config' command"),
        };

        client.send(&reply).await?;
        Ok(())
    }
}

/// `QUIT` - acknowledges; the transport closes the connection afterwards.
pub struct QuitHandler;

#[async_trait]
impl CmdHandler for QuitHandler {
    fn can_handle(&self, ctx: &RedisContext) -> bool {
        ctx.cmd.name() == CmdName::Quit
    }

    async fn handle(&self, client: &RedisClient, _cmd: &RedisCmd) -> Result<()> {
        client.send(&Reply::ok()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, DuplexStream};

    fn test_client() -> (Arc<RedisClient>, DuplexStream) {
        let (ours, theirs) = tokio::io::duplex(1024);
        let addr = "127.0.0.1:0".parse().unwrap();
        (Arc::new(RedisClient::new(addr, ours)), theirs)
    }

    async fn read_reply(side: &mut DuplexStream) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let n = side.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    fn ctx_for(client: &Arc<RedisClient>, cmd: RedisCmd) -> RedisContext {
        RedisContext::new(Arc::clone(client), cmd)
    }

    #[tokio::test]
    async fn ping_replies_pong() {
        let (client, mut peer) = test_client();
        let cmd = RedisCmd::new(CmdName::Ping, Vec::new());
        PingHandler.handle(&client, &cmd).await.unwrap();
        assert_eq!(read_reply(&mut peer).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn ping_echoes_its_argument() {
        let (client, mut peer) = test_client();
        let cmd = RedisCmd::new(CmdName::Ping, vec![Bytes::from("hello")]);
        PingHandler.handle(&client, &cmd).await.unwrap();
        assert_eq!(read_reply(&mut peer).await, b"$5\r\nhello\r\n");
    }

    #[tokio::test]
    async fn echo_requires_an_argument() {
        let (client, mut peer) = test_client();
        let cmd = RedisCmd::new(CmdName::Echo, Vec::new());
        EchoHandler.handle(&client, &cmd).await.unwrap();
        assert_eq!(
            read_reply(&mut peer).await,
            b"-ERR wrong number of arguments for 'echo' command\r\n"
        );
    }

    #[tokio::test]
    async fn echo_returns_its_argument_as_bulk() {
        let (client, mut peer) = test_client();
        let cmd = RedisCmd::new(CmdName::Echo, vec![Bytes::from("payload")]);
        EchoHandler.handle(&client, &cmd).await.unwrap();
        assert_eq!(read_reply(&mut peer).await, b"$7\r\npayload\r\n");
    }

    #[tokio::test]
    async fn info_emits_exact_bulk_frame() {
        let (client, mut peer) = test_client();
        let handler = InfoHandler::with_payload("redis_version: 9.9.9");
        let cmd = RedisCmd::new(CmdName::Info, Vec::new());
        handler.handle(&client, &cmd).await.unwrap();

        // 20-byte payload, length derived from the payload itself
        assert_eq!(
            read_reply(&mut peer).await,
            b"$20\r\nredis_version: 9.9.9\r\n"
        );
    }

    #[tokio::test]
    async fn info_length_counts_bytes_not_characters() {
        let (client, mut peer) = test_client();
        // Four characters, five bytes
        let handler = InfoHandler::with_payload("vé 1");
        let cmd = RedisCmd::new(CmdName::Info, Vec::new());
        handler.handle(&client, &cmd).await.unwrap();
        assert_eq!(read_reply(&mut peer).await, "$5\r\nvé 1\r\n".as_bytes());
    }

    #[tokio::test]
    async fn info_claims_only_info() {
        let (client, _peer) = test_client();
        let handler = InfoHandler::new();
        assert!(handler.can_handle(&ctx_for(&client, RedisCmd::new(CmdName::Info, Vec::new()))));
        assert!(!handler.can_handle(&ctx_for(&client, RedisCmd::new(CmdName::Ping, Vec::new()))));
    }

    #[tokio::test]
    async fn config_set_hot_reloads_the_password() {
        let (client, mut peer) = test_client();
        let options = Arc::new(ServerOptions::new());
        let handler = ConfigHandler::new(Arc::clone(&options));

        let cmd = RedisCmd::new(
            CmdName::Config,
            vec![
                Bytes::from("SET"),
                Bytes::from("requirepass"),
                Bytes::from("secret"),
            ],
        );
        handler.handle(&client, &cmd).await.unwrap();

        assert_eq!(read_reply(&mut peer).await, b"+OK\r\n");
        assert_eq!(options.requirepass(), Some("secret".to_string()));
    }

    #[tokio::test]
    async fn config_get_reports_the_password() {
        let (client, mut peer) = test_client();
        let options = Arc::new(ServerOptions::with_requirepass("secret"));
        let handler = ConfigHandler::new(options);

        let cmd = RedisCmd::new(
            CmdName::Config,
            vec![Bytes::from("get"), Bytes::from("REQUIREPASS")],
        );
        handler.handle(&client, &cmd).await.unwrap();

        assert_eq!(
            read_reply(&mut peer).await,
            b"*2\r\n$11\r\nrequirepass\r\n$6\r\nsecret\r\n"
        );
    }

    #[tokio::test]
    async fn config_rejects_unsupported_parameters() {
        let (client, mut peer) = test_client();
        let handler = ConfigHandler::new(Arc::new(ServerOptions::new()));

        let cmd = RedisCmd::new(
            CmdName::Config,
            vec![Bytes::from("GET"), Bytes::from("maxmemory")],
        );
        handler.handle(&client, &cmd).await.unwrap();

        assert_eq!(
            read_reply(&mut peer).await,
            b"-ERR unsupported CONFIG parameter\r\n"
        );
    }

    #[tokio::test]
    async fn quit_acknowledges() {
        let (client, mut peer) = test_client();
        let cmd = RedisCmd::new(CmdName::Quit, Vec::new());
        QuitHandler.handle(&client, &cmd).await.unwrap();
        assert_eq!(read_reply(&mut peer).await, b"+OK\r\n");
    }
}
