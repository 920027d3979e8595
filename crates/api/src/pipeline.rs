//! Pipeline runner: an ordered list of named steps over a mutable context.
//!
//! Each (entity, verb) pair declares its chain as data: a sequence of
//! [`Step`]s, each a plain function from `&mut C` to a boxed future. One
//! runner executes the chain in order and short-circuits on the first
//! [`Failure`]. There are exactly two terminal states: the context carries
//! the success payload, or the chain yields one failure. A step failing
//! after an earlier write leaves that write in place; there is no
//! compensating rollback.

use std::future::Future;
use std::pin::Pin;

use crate::error::{Failure, Result};

/// Outcome of a single step.
pub type StepResult = Result<()>;

/// Boxed future produced by a step, borrowing the context.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = StepResult> + Send + 'a>>;

/// A step function. Plain `fn` pointers keep the chain inspectable data.
pub type StepFn<C> = for<'a> fn(&'a mut C) -> StepFuture<'a>;

/// One named step in a pipeline.
pub struct Step<C> {
    pub name: &'static str,
    pub run: StepFn<C>,
}

/// An ordered chain of steps for one (entity, verb) pair.
pub struct Pipeline<C> {
    name: &'static str,
    steps: Vec<Step<C>>,
}

impl<C: Send> Pipeline<C> {
    /// Start an empty chain.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Append a named step.
    #[must_use]
    pub fn step(mut self, name: &'static str, run: StepFn<C>) -> Self {
        self.steps.push(Step { name, run });
        self
    }

    /// Execute the steps in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The first [`Failure`] raised by a step, with the remainder of the
    /// chain skipped.
    pub async fn run(&self, ctx: &mut C) -> StepResult {
        for step in &self.steps {
            match (step.run)(ctx).await {
                Ok(()) => {
                    tracing::trace!(pipeline = self.name, step = step.name, "step passed");
                }
                Err(failure) => {
                    tracing::debug!(
                        pipeline = self.name,
                        step = step.name,
                        error = %failure,
                        "pipeline aborted"
                    );
                    return Err(failure);
                }
            }
        }
        Ok(())
    }
}

/// Internal fault for a step that ran before the step that populates its
/// input. Indicates a mis-ordered chain, not a client error.
pub fn state_missing(what: &str) -> Failure {
    Failure::Storage(format!("pipeline state missing: {what}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ctx {
        ran: Vec<&'static str>,
    }

    fn first(ctx: &mut Ctx) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("first");
            Ok(())
        })
    }

    fn failing(ctx: &mut Ctx) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("failing");
            Err(Failure::NotFound("gone".into()))
        })
    }

    fn last(ctx: &mut Ctx) -> StepFuture<'_> {
        Box::pin(async move {
            ctx.ran.push("last");
            Ok(())
        })
    }

    #[tokio::test]
    async fn runs_steps_in_order() {
        let pipeline = Pipeline::new("test").step("first", first).step("last", last);
        let mut ctx = Ctx::default();
        pipeline.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.ran, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn short_circuits_on_first_failure() {
        let pipeline = Pipeline::new("test")
            .step("first", first)
            .step("failing", failing)
            .step("last", last);
        let mut ctx = Ctx::default();

        let err = pipeline.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Failure::NotFound(_)));
        assert_eq!(ctx.ran, vec!["first", "failing"]);
    }
}
