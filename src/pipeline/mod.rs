//! Generic Middleware Pipeline
//!
//! This module provides the composition engine the rest of the crate is
//! built on: an ordered list of steps folded into a single async callable.
//! It knows nothing about Redis; the context type is generic.
//!
//! ## Architecture
//!
//! ```text
//! PipelineBuilder::wrap / use_fn / use_middleware / when
//!        │
//!        ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │  steps: [s1, s2, ... sn]        fallback                │
//! │                                                         │
//! │  build() folds right-to-left:                           │
//! │                                                         │
//! │      s1( s2( ... sn( fallback ) ... ) )                 │
//! └─────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   Next<C>  - one callable, invocation order == registration order
//! ```
//!
//! Each step receives the rest of the pipeline as a continuation (`next`)
//! and decides whether to invoke it. Not calling `next` is the only way to
//! stop the chain; there is no separate cancellation channel.
//!
//! ## Example
//!
//! ```ignore
//! use respline::pipeline::{handler_fn, PipelineBuilder};
//!
//! let mut builder = PipelineBuilder::with_fallback(handler_fn(|_ctx: ()| async {
//!     anyhow::Ok(())
//! }));
//! builder.use_fn(|next, ctx| async move {
//!     // before
//!     next(ctx).await
//!     // after
//! });
//! let pipeline = builder.build();
//! ```

pub mod builder;

// Re-export commonly used types for convenience
pub use builder::{handler_fn, Middleware, Next, PipelineBuilder};
