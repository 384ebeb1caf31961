//! Pipeline Builder
//!
//! An ordered list of middleware steps composed into one async callable.
//!
//! ## How Composition Works
//!
//! A step is a transform from "the rest of the pipeline" to a new
//! continuation: `Fn(Next<C>) -> Next<C>`. `build()` starts from the
//! fallback and folds the step list right-to-left, so the first step
//! registered is the outermost wrapper and runs first.
//!
//! Steps signal "stop processing" by simply not invoking their
//! continuation. Faults are not handled here: an `Err` from any step or
//! the fallback propagates unmodified to whoever invoked the composed
//! callable.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The continuation type: the remainder of a pipeline as one callable.
///
/// Cheap to clone (reference counted) and callable any number of times.
/// The context is passed by value; each invocation exclusively owns its
/// context for the duration of the call.
pub type Next<C> = Arc<dyn Fn(C) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A registered step: wraps the remaining pipeline into a new continuation.
type Step<C> = Box<dyn Fn(Next<C>) -> Next<C> + Send + Sync>;

/// An object-shaped middleware: anything exposing `invoke(next, ctx)`.
///
/// One instance is constructed at startup and shared across all
/// invocations, so implementations must not carry per-connection mutable
/// state of their own; per-connection state belongs on the context.
#[async_trait]
pub trait Middleware<C>: Send + Sync {
    /// Processes the context, deciding whether to call `next`.
    async fn invoke(&self, next: Next<C>, ctx: C) -> Result<()>;
}

/// Adapts a plain async function into a [`Next`] continuation.
///
/// Used for fallbacks and for the terminal handlers given to
/// [`PipelineBuilder::when`].
pub fn handler_fn<C, F, Fut>(f: F) -> Next<C>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| {
        let fut: BoxFuture<'static, Result<()>> = Box::pin(f(ctx));
        fut
    })
}

/// Builds a pipeline of ordered middleware steps over a fallback handler.
///
/// Insertion order is execution order. `build()` may be called repeatedly;
/// every composed callable shares the same step and fallback instances.
pub struct PipelineBuilder<C> {
    /// The terminal handler invoked once every step has delegated onward
    fallback: Next<C>,

    /// Registered steps, in execution order
    steps: Vec<Step<C>>,
}

impl<C: Send + 'static> PipelineBuilder<C> {
    /// Creates a builder whose fallback does nothing.
    pub fn new() -> Self {
        Self::with_fallback(handler_fn(|_ctx| async { anyhow::Ok(()) }))
    }

    /// Creates a builder with an explicit fallback handler.
    pub fn with_fallback(fallback: Next<C>) -> Self {
        Self {
            fallback,
            steps: Vec::new(),
        }
    }

    /// Appends a raw step: a transform over the remaining pipeline.
    pub fn wrap<W>(&mut self, step: W) -> &mut Self
    where
        W: Fn(Next<C>) -> Next<C> + Send + Sync + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends a step given as an async function of `(next, ctx)`.
    pub fn use_fn<F, Fut>(&mut self, step: F) -> &mut Self
    where
        F: Fn(Next<C>, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let step = Arc::new(step);
        self.wrap(move |next| {
            let step = Arc::clone(&step);
            Arc::new(move |ctx| {
                let fut: BoxFuture<'static, Result<()>> =
                    Box::pin(step(Arc::clone(&next), ctx));
                fut
            })
        })
    }

    /// Appends an object-shaped middleware as a step.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware<C>>) -> &mut Self {
        self.wrap(move |next| {
            let middleware = Arc::clone(&middleware);
            Arc::new(move |ctx| {
                let middleware = Arc::clone(&middleware);
                let next = Arc::clone(&next);
                let fut: BoxFuture<'static, Result<()>> =
                    Box::pin(async move { middleware.invoke(next, ctx).await });
                fut
            })
        })
    }

    /// Appends a conditional step with a terminal handler.
    ///
    /// When the predicate holds, the handler is invoked and the rest of
    /// the pipeline never runs for that invocation; otherwise the step is
    /// transparent and delegates to `next`.
    pub fn when<P>(&mut self, predicate: P, handler: Next<C>) -> &mut Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.wrap(move |next| {
            let predicate = Arc::clone(&predicate);
            let handler = Arc::clone(&handler);
            Arc::new(move |ctx| {
                if predicate(&ctx) {
                    handler(ctx)
                } else {
                    next(ctx)
                }
            })
        })
    }

    /// Appends a conditional branch configured as its own sub-pipeline.
    ///
    /// When the predicate holds, the sub-pipeline runs instead of the
    /// remainder of the outer pipeline. The branch shares the outer
    /// fallback and is composed here, at registration time; its step list
    /// is fixed once `configure` returns, so this is equivalent to
    /// composing it per invocation.
    pub fn when_branch<P, F>(&mut self, predicate: P, configure: F) -> &mut Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut PipelineBuilder<C>),
    {
        let mut branch = self.branch();
        configure(&mut branch);
        self.when(predicate, branch.build())
    }

    /// Creates a new builder with the same fallback and an empty step list.
    pub fn branch(&self) -> PipelineBuilder<C> {
        PipelineBuilder {
            fallback: Arc::clone(&self.fallback),
            steps: Vec::new(),
        }
    }

    /// Composes the registered steps into a single callable.
    ///
    /// The list is folded right-to-left so that invocation order matches
    /// registration order: `s1(s2(...sn(fallback)))`.
    pub fn build(&self) -> Next<C> {
        let mut handler = Arc::clone(&self.fallback);
        for step in self.steps.iter().rev() {
            handler = step(handler);
        }
        handler
    }
}

impl<C: Send + 'static> Default for PipelineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test context: a shared trace of which steps ran, in order.
    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn trace() -> Trace {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorded(t: &Trace) -> Vec<&'static str> {
        t.lock().unwrap().clone()
    }

    /// A pass-through step that records its label before delegating.
    fn passthrough(
        label: &'static str,
    ) -> impl Fn(Next<Trace>, Trace) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static
    {
        move |next, ctx: Trace| {
            let fut: BoxFuture<'static, Result<()>> = Box::pin(async move {
                ctx.lock().unwrap().push(label);
                next(ctx).await
            });
            fut
        }
    }

    fn recording_fallback() -> Next<Trace> {
        handler_fn(|ctx: Trace| async move {
            ctx.lock().unwrap().push("fallback");
            Ok(())
        })
    }

    #[tokio::test]
    async fn steps_run_once_each_in_registration_order() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("s1"));
        builder.use_fn(passthrough("s2"));
        builder.use_fn(passthrough("s3"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["s1", "s2", "s3", "fallback"]);
    }

    #[tokio::test]
    async fn omitting_next_stops_the_chain() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("s1"));
        builder.use_fn(|_next: Next<Trace>, ctx: Trace| async move {
            ctx.lock().unwrap().push("stop");
            Ok(())
        });
        builder.use_fn(passthrough("s3"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["s1", "stop"]);
    }

    #[tokio::test]
    async fn empty_builder_runs_only_the_fallback() {
        let builder = PipelineBuilder::with_fallback(recording_fallback());
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["fallback"]);
    }

    #[tokio::test]
    async fn built_pipeline_is_reusable() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("s1"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["s1", "fallback", "s1", "fallback"]);
    }

    #[tokio::test]
    async fn when_true_invokes_terminal_handler_only() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("before"));
        builder.when(
            |_ctx| true,
            handler_fn(|ctx: Trace| async move {
                ctx.lock().unwrap().push("terminal");
                Ok(())
            }),
        );
        builder.use_fn(passthrough("after"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["before", "terminal"]);
    }

    #[tokio::test]
    async fn when_false_is_transparent() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("before"));
        builder.when(
            |_ctx| false,
            handler_fn(|ctx: Trace| async move {
                ctx.lock().unwrap().push("terminal");
                Ok(())
            }),
        );
        builder.use_fn(passthrough("after"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["before", "after", "fallback"]);
    }

    #[tokio::test]
    async fn when_branch_true_runs_sub_pipeline_with_shared_fallback() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("outer1"));
        builder.when_branch(
            |_ctx| true,
            |branch| {
                branch.use_fn(passthrough("branch1"));
                branch.use_fn(passthrough("branch2"));
            },
        );
        builder.use_fn(passthrough("outer2"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(
            recorded(&t),
            vec!["outer1", "branch1", "branch2", "fallback"]
        );
    }

    #[tokio::test]
    async fn when_branch_false_skips_sub_pipeline() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("outer1"));
        builder.when_branch(
            |_ctx| false,
            |branch| {
                branch.use_fn(passthrough("branch1"));
            },
        );
        builder.use_fn(passthrough("outer2"));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["outer1", "outer2", "fallback"]);
    }

    #[tokio::test]
    async fn branch_has_empty_steps_and_same_fallback() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("outer"));

        let branch = builder.branch();
        let pipeline = branch.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["fallback"]);
    }

    struct Tagger {
        label: &'static str,
    }

    #[async_trait]
    impl Middleware<Trace> for Tagger {
        async fn invoke(&self, next: Next<Trace>, ctx: Trace) -> Result<()> {
            ctx.lock().unwrap().push(self.label);
            next(ctx).await
        }
    }

    #[tokio::test]
    async fn middleware_objects_compose_like_steps() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_middleware(Arc::new(Tagger { label: "mw1" }));
        builder.use_middleware(Arc::new(Tagger { label: "mw2" }));
        let pipeline = builder.build();

        let t = trace();
        pipeline(Arc::clone(&t)).await.unwrap();
        assert_eq!(recorded(&t), vec!["mw1", "mw2", "fallback"]);
    }

    #[tokio::test]
    async fn step_errors_propagate_unmodified() {
        let mut builder = PipelineBuilder::with_fallback(recording_fallback());
        builder.use_fn(passthrough("s1"));
        builder.use_fn(|_next: Next<Trace>, _ctx: Trace| async move {
            Err(anyhow::anyhow!("boom"))
        });
        builder.use_fn(passthrough("s3"));
        let pipeline = builder.build();

        let t = trace();
        let err = pipeline(Arc::clone(&t)).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(recorded(&t), vec!["s1"]);
    }

    #[tokio::test]
    async fn fallback_errors_propagate_unmodified() {
        let builder: PipelineBuilder<Trace> =
            PipelineBuilder::with_fallback(handler_fn(|_ctx: Trace| async move {
                Err(anyhow::anyhow!("fallback fault"))
            }));
        let pipeline = builder.build();

        let err = pipeline(trace()).await.unwrap_err();
        assert_eq!(err.to_string(), "fallback fault");
    }

    #[tokio::test]
    async fn default_fallback_is_a_no_op() {
        let builder: PipelineBuilder<Trace> = PipelineBuilder::new();
        let pipeline = builder.build();
        pipeline(trace()).await.unwrap();
    }
}
