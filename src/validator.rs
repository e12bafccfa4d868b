//! Asynchronous validation predicates
//!
//! Every permission and predicate-backed role carries a [`Validator`]: an
//! async predicate `(name, context) -> bool` supplied by the caller. The
//! engine never inspects what the predicate does; it only orchestrates when
//! predicates run and how their results combine.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

/// Arbitrary caller-defined transition data (target route params, session
/// attributes, ...). Passed to every predicate invoked during one
/// transition's evaluation.
pub type TransitionContext = HashMap<String, serde_json::Value>;

type Predicate = dyn Fn(&str, &TransitionContext) -> BoxFuture<'static, bool> + Send + Sync;

/// Cloneable wrapper over an async validation predicate.
///
/// Synchronous predicates registered through [`Validator::from_fn`] are
/// coerced into immediately-ready futures, so a plain `bool` result and a
/// future resolving to `bool` behave identically everywhere a validation
/// result is consumed.
///
/// A predicate that needs to perform fallible work should map its errors to
/// `false`; the engine treats `false` as a rejection of that single rule and
/// does not catch panics.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<Predicate>,
}

impl Validator {
    /// Wrap a synchronous predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&str, &TransitionContext) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |name, ctx| future::ready(predicate(name, ctx)).boxed()),
        }
    }

    /// Wrap an asynchronous predicate.
    ///
    /// The rule name and context are cloned into the returned future so the
    /// predicate can suspend without borrowing from the caller.
    pub fn from_async<F, Fut>(predicate: F) -> Self
    where
        F: Fn(String, TransitionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |name, ctx| {
                predicate(name.to_owned(), ctx.clone()).boxed()
            }),
        }
    }

    /// A predicate with a fixed outcome. Handy for tests and for rules that
    /// are toggled at registration time rather than per transition.
    pub fn always(allowed: bool) -> Self {
        Self::from_fn(move |_, _| allowed)
    }

    /// Invoke the predicate for the given rule name.
    pub fn validate(
        &self,
        name: &str,
        ctx: &TransitionContext,
    ) -> impl Future<Output = bool> + Send + 'static {
        (self.inner)(name, ctx)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sync_predicate_is_coerced() {
        let validator = Validator::from_fn(|name, _| name == "ADMIN");

        assert!(validator.validate("ADMIN", &TransitionContext::new()).await);
        assert!(!validator.validate("GUEST", &TransitionContext::new()).await);
    }

    #[tokio::test]
    async fn async_predicate_sees_context() {
        let validator = Validator::from_async(|_, ctx| async move {
            ctx.get("userId").and_then(|v| v.as_str()) == Some("42")
        });

        let mut ctx = TransitionContext::new();
        ctx.insert("userId".into(), serde_json::json!("42"));
        assert!(validator.validate("USER", &ctx).await);
        assert!(!validator.validate("USER", &TransitionContext::new()).await);
    }

    #[tokio::test]
    async fn fixed_outcome() {
        assert!(Validator::always(true).validate("X", &TransitionContext::new()).await);
        assert!(!Validator::always(false).validate("X", &TransitionContext::new()).await);
    }
}
