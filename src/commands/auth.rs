//! Authentication
//!
//! Two pieces share this module:
//!
//! - [`AuthGate`], a pipeline middleware that decides per command whether
//!   the session may proceed, based on the client's tri-state auth flag
//!   and the live password option
//! - [`AuthHandler`], the command handler for `AUTH`, the only place a
//!   session moves out of the `Unknown` state by explicit action
//!
//! ## Gate Decision Table
//!
//! | State         | Command  | Password | Action                          |
//! |---------------|----------|----------|---------------------------------|
//! | Rejected      | any      | any      | error reply, stop               |
//! | Authenticated | any      | any      | continue                        |
//! | Unknown       | AUTH     | any      | continue (handler decides)      |
//! | Unknown       | other    | unset    | mark authenticated, continue    |
//! | Unknown       | other    | set      | error reply, stop, stay Unknown |
//!
//! The gate itself never rejects a session; only a failed explicit AUTH
//! does that. The password is read fresh on every invocation, so a
//! runtime `CONFIG SET requirepass` applies to the very next command.

use crate::commands::cmd::{CmdName, RedisCmd, RedisContext};
use crate::commands::handlers::CmdHandler;
use crate::config::ServerOptions;
use crate::connection::{AuthState, RedisClient};
use crate::pipeline::{Middleware, Next};
use crate::protocol::Reply;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const NOAUTH: &str = "NOAUTH Authentication required";
const WRONGPASS: &str = "WRONGPASS invalid password";
const NO_PASSWORD_SET: &str = "ERR Client sent AUTH, but no password is set";

/// Pipeline step enforcing the authentication policy ahead of dispatch.
///
/// Registered before the handler chain so no command reaches a handler
/// on an unauthenticated session, except `AUTH` itself.
pub struct AuthGate {
    options: Arc<ServerOptions>,
}

impl AuthGate {
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Middleware<RedisContext> for AuthGate {
    async fn invoke(&self, next: Next<RedisContext>, ctx: RedisContext) -> Result<()> {
        match ctx.client.auth_state() {
            AuthState::Rejected => {
                ctx.client.send(&Reply::error(NOAUTH)).await?;
                Ok(())
            }
            AuthState::Authenticated => next(ctx).await,
            AuthState::Unknown => {
                if ctx.cmd.name() == CmdName::Auth {
                    // The AUTH handler downstream resolves the state
                    return next(ctx).await;
                }
                if self.options.requirepass().is_none() {
                    ctx.client.set_auth_state(AuthState::Authenticated);
                    debug!(client = %ctx.client.addr(), "No password configured, session authenticated");
                    next(ctx).await
                } else {
                    ctx.client.send(&Reply::error(NOAUTH)).await?;
                    Ok(())
                }
            }
        }
    }
}

/// Handler for the `AUTH password` command.
pub struct AuthHandler {
    options: Arc<ServerOptions>,
}

impl AuthHandler {
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self { options }
    }
}

#[async_trait]
impl CmdHandler for AuthHandler {
    fn can_handle(&self, ctx: &RedisContext) -> bool {
        ctx.cmd.name() == CmdName::Auth
    }

    async fn handle(&self, client: &RedisClient, cmd: &RedisCmd) -> Result<()> {
        let Some(expected) = self.options.requirepass() else {
            client.send(&Reply::error(NO_PASSWORD_SET)).await?;
            return Ok(());
        };

        let Some(given) = cmd.arg(0) else {
            client
                .send(&Reply::error(
                    "ERR wrong number of arguments for 'auth' command",
                ))
                .await?;
            return Ok(());
        };

        if given.as_ref() == expected.as_bytes() {
            client.set_auth_state(AuthState::Authenticated);
            debug!(client = %client.addr(), "Client authenticated");
            client.send(&Reply::ok()).await?;
        } else {
            client.set_auth_state(AuthState::Rejected);
            warn!(client = %client.addr(), "Failed AUTH attempt, session rejected");
            client.send(&Reply::error(WRONGPASS)).await?;
        }
        Ok(())
    }
}
