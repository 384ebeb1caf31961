//! # respline - A Composable Middleware Pipeline for RESP Servers
//!
//! respline dispatches Redis-protocol (RESP) commands through a generic,
//! composable middleware pipeline: an authentication gate, an ordered
//! command-handler chain, and a byte-exact reply encoder, wired together
//! by a pipeline builder that works over any context type.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                             respline                               │
//! │                                                                    │
//! │  ┌─────────────┐     ┌──────────────┐     ┌────────────────────┐   │
//! │  │ TCP Server  │────>│  Connection  │────>│      Pipeline      │   │
//! │  │ (Listener)  │     │   Handler    │     │                    │   │
//! │  └─────────────┘     └──────────────┘     │  ┌──────────────┐  │   │
//! │                             │             │  │   AuthGate   │  │   │
//! │                             │             │  └──────┬───────┘  │   │
//! │                      decode frames        │         ▼ next     │   │
//! │                             │             │  ┌──────────────┐  │   │
//! │                             ▼             │  │ HandlerChain │  │   │
//! │                       RedisContext ──────>│  │ Auth Ping    │  │   │
//! │                                           │  │ Echo Info    │  │   │
//! │                                           │  │ Config Quit  │  │   │
//! │                                           │  └──────┬───────┘  │   │
//! │                                           └─────────┼──────────┘   │
//! │                                                     ▼              │
//! │                                          Reply (exact wire bytes)  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use respline::commands::build_pipeline;
//! use respline::config::ServerOptions;
//! use respline::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = Arc::new(ServerOptions::with_requirepass("secret"));
//!     let pipeline = build_pipeline(options);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             Arc::clone(&pipeline),
//!             Arc::clone(&stats),
//!         ));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`pipeline`]: the generic middleware composition engine
//! - [`protocol`]: RESP frame decoding and the reply encoder
//! - [`commands`]: auth gate, command handlers, and dispatch
//! - [`connection`]: client handle and per-connection loop
//! - [`config`]: hot-reloadable server options
//!
//! ## Design Highlights
//!
//! ### Composition Over Branching
//!
//! Every per-command behavior is a pipeline step. Steps receive the rest
//! of the pipeline as a continuation and stop the chain by simply not
//! invoking it; ordering is the registration order, made concrete by a
//! right-to-left fold in [`pipeline::PipelineBuilder::build`].
//!
//! ### Replies Are Bytes
//!
//! A [`protocol::Reply`] carries its final wire frame from the moment it
//! is constructed, so the send path is a single buffered write with no
//! serialization step.
//!
//! ### Sequential Sessions, Concurrent Server
//!
//! Each connection's commands run one at a time; connections run in
//! independent tasks. The only cross-step state is the client's auth
//! flag, held in an atomic.

pub mod commands;
pub mod config;
pub mod connection;
pub mod pipeline;
pub mod protocol;

// Re-export commonly used types for convenience
pub use commands::{build_pipeline, CmdHandler, CmdName, HandlerChain, RedisCmd, RedisContext};
pub use config::ServerOptions;
pub use connection::{handle_connection, AuthState, ConnectionStats, RedisClient};
pub use pipeline::{handler_fn, Middleware, Next, PipelineBuilder};
pub use protocol::{BufferBuilder, CommandParser, ParseError, Reply};

/// The default port respline listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host respline binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of respline
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
