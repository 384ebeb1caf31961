//! Command Layer
//!
//! Everything between a decoded command frame and its reply:
//!
//! ```text
//! RedisContext (client + parsed cmd)
//!       │
//!       ▼
//! ┌─────────────────┐
//! │    AuthGate     │  middleware: may stop the invocation
//! └────────┬────────┘
//!          │ next
//!          ▼
//! ┌─────────────────┐
//! │  dispatch_step  │  pipeline fallback
//! │                 │
//! │  HandlerChain   │  first matching handler replies;
//! │  [Auth, Ping,   │  no match -> "ERR unknown command"
//! │   Echo, Info,   │
//! │   Config, Quit] │
//! └─────────────────┘
//! ```
//!
//! Handlers and middleware are constructed once at startup and shared
//! across connections; per-session state lives on the client.

pub mod auth;
pub mod cmd;
pub mod dispatch;
pub mod handlers;

// Re-export commonly used types for convenience
pub use auth::{AuthGate, AuthHandler};
pub use cmd::{CmdName, RedisCmd, RedisContext};
pub use dispatch::{build_pipeline, default_handlers, dispatch_step, HandlerChain};
pub use handlers::{
    CmdHandler, ConfigHandler, EchoHandler, InfoHandler, PingHandler, QuitHandler,
};
