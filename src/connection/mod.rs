//! Connection Layer
//!
//! Owns the transport side of a session: the per-connection client
//! handle and the task that reads frames and feeds the pipeline.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  TCP Listener (main.rs)                 │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ accept(), one task per client
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ConnectionHandler                      │
//! │                                                         │
//! │  read ──> decode frame ──> RedisContext ──> pipeline    │
//! │                                    │                    │
//! │                                    ▼                    │
//! │                     RedisClient::send(reply)            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The pipeline and handler chain never touch the socket themselves;
//! they see only [`RedisClient`], which carries the session's auth flag
//! and the write side of the connection.

pub mod client;
pub mod handler;

// Re-export commonly used types for convenience
pub use client::{AuthState, RedisClient};
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
