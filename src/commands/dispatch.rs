//! Command Dispatch
//!
//! [`HandlerChain`] holds the registered handlers in a fixed order and
//! scans them per command: the first handler whose predicate claims the
//! context processes it exclusively; later handlers are never consulted.
//!
//! [`dispatch_step`] packages a chain as the pipeline's terminal step.
//! A command no handler claims is answered with an error reply rather
//! than dropped. [`build_pipeline`] is the startup wiring: every step
//! and handler instance is constructed here, once, and shared across
//! all connections.

use crate::commands::auth::{AuthGate, AuthHandler};
use crate::commands::cmd::RedisContext;
use crate::commands::handlers::{
    CmdHandler, ConfigHandler, EchoHandler, InfoHandler, PingHandler, QuitHandler,
};
use crate::config::ServerOptions;
use crate::pipeline::{handler_fn, Next, PipelineBuilder};
use crate::protocol::Reply;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Ordered, fixed-at-registration-time list of command handlers.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn CmdHandler>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. Registration order is probe order.
    pub fn register(&mut self, handler: Arc<dyn CmdHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Scans the chain in registration order.
    ///
    /// The first matching handler processes the command; returns whether
    /// any handler matched at all.
    pub async fn dispatch(&self, ctx: &RedisContext) -> Result<bool> {
        for handler in &self.handlers {
            if handler.can_handle(ctx) {
                handler.handle(&ctx.client, &ctx.cmd).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Wraps a chain as the pipeline's terminal step.
///
/// Unmatched commands get an `ERR unknown command` reply; silently
/// dropping them is not acceptable.
pub fn dispatch_step(chain: HandlerChain) -> Next<RedisContext> {
    let chain = Arc::new(chain);
    handler_fn(move |ctx: RedisContext| {
        let chain = Arc::clone(&chain);
        async move {
            if !chain.dispatch(&ctx).await? {
                debug!(client = %ctx.client.addr(), command = %ctx.cmd.raw_name(), "Unrecognized command");
                let reply = Reply::error(format!("ERR unknown command '{}'", ctx.cmd.raw_name()));
                ctx.client.send(&reply).await?;
            }
            Ok(())
        }
    })
}

/// The server's stock handler set, in registration order.
pub fn default_handlers(options: &Arc<ServerOptions>) -> HandlerChain {
    let mut chain = HandlerChain::new();
    chain
        .register(Arc::new(AuthHandler::new(Arc::clone(options))))
        .register(Arc::new(PingHandler))
        .register(Arc::new(EchoHandler))
        .register(Arc::new(InfoHandler::new()))
        .register(Arc::new(ConfigHandler::new(Arc::clone(options))))
        .register(Arc::new(QuitHandler));
    chain
}

/// Composes the full server pipeline: auth gate, then dispatch.
pub fn build_pipeline(options: Arc<ServerOptions>) -> Next<RedisContext> {
    let chain = default_handlers(&options);
    let mut builder = PipelineBuilder::with_fallback(dispatch_step(chain));
    builder.use_middleware(Arc::new(AuthGate::new(options)));
    builder.build()
}
