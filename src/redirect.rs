//! Redirect resolution
//!
//! When a transition is denied, the permission map may declare where to send
//! the actor instead. The redirect policy is a tagged union resolved by
//! pattern matching: a fixed state name, a computed (possibly async)
//! function of the rejected rule, or a lookup table keyed by rejected rule
//! name with a mandatory `default` entry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AuthzError, Result};
use crate::validator::TransitionContext;

/// Key consulted when a per-rejection redirect map has no entry for the
/// rejected rule name.
pub const DEFAULT_REDIRECT_KEY: &str = "default";

/// Resolved redirect destination handed back to the host, which performs
/// the actual navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectState {
    /// Target state/route identifier.
    pub state: String,

    /// Parameters to apply to the target state.
    pub params: TransitionContext,
}

impl RedirectState {
    /// Destination with no parameters.
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            params: TransitionContext::new(),
        }
    }

    /// Attach parameters to the destination.
    pub fn with_params(mut self, params: TransitionContext) -> Self {
        self.params = params;
        self
    }
}

/// What a computed redirect function yields: a bare state name or a full
/// destination descriptor returned as-is.
#[derive(Debug, Clone)]
pub enum RedirectOutcome {
    /// Bare state name, resolved into a parameterless destination.
    State(String),

    /// Full destination, used verbatim.
    Descriptor(RedirectState),
}

impl RedirectOutcome {
    fn into_state(self) -> RedirectState {
        match self {
            Self::State(state) => RedirectState::new(state),
            Self::Descriptor(descriptor) => descriptor,
        }
    }
}

type ComputedRedirect =
    dyn Fn(&str, &TransitionContext) -> BoxFuture<'static, RedirectOutcome> + Send + Sync;

/// Cloneable wrapper over a computed redirect function
/// `(rejected_name, context) -> RedirectOutcome`.
#[derive(Clone)]
pub struct RedirectFn {
    inner: Arc<ComputedRedirect>,
}

impl RedirectFn {
    /// Wrap a synchronous redirect function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str, &TransitionContext) -> RedirectOutcome + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |rejected, ctx| future::ready(f(rejected, ctx)).boxed()),
        }
    }

    /// Wrap an asynchronous redirect function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(String, TransitionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RedirectOutcome> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |rejected, ctx| f(rejected.to_owned(), ctx.clone()).boxed()),
        }
    }

    async fn resolve(&self, rejected: &str, ctx: &TransitionContext) -> RedirectOutcome {
        (self.inner)(rejected, ctx).await
    }
}

impl fmt::Debug for RedirectFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RedirectFn(..)")
    }
}

/// One entry of a per-rejection redirect map.
///
/// A nested descriptor is used verbatim; strings and functions resolve the
/// same way as at the top level. Resolution recurses exactly one level.
#[derive(Debug, Clone)]
pub enum RedirectRule {
    /// Fixed state name.
    State(String),

    /// Computed from the rejected rule name and context.
    Computed(RedirectFn),

    /// Full destination, used verbatim.
    Descriptor(RedirectState),
}

/// Redirect policy of a permission map.
#[derive(Debug, Clone)]
pub enum RedirectTarget {
    /// Always redirect to this state.
    State(String),

    /// Compute the destination from the rejected rule name and context.
    Computed(RedirectFn),

    /// Choose per rejected rule name, falling back to the `default` entry.
    ByRejection(HashMap<String, RedirectRule>),
}

impl RedirectTarget {
    /// Resolve the destination for a rejected rule name.
    ///
    /// # Errors
    ///
    /// [`AuthzError::MissingDefaultRedirect`] when a per-rejection map has
    /// no `default` entry.
    pub(crate) async fn resolve(
        &self,
        rejected: &str,
        ctx: &TransitionContext,
    ) -> Result<RedirectState> {
        match self {
            Self::State(state) => Ok(RedirectState::new(state.clone())),
            Self::Computed(f) => Ok(f.resolve(rejected, ctx).await.into_state()),
            Self::ByRejection(rules) => {
                if !rules.contains_key(DEFAULT_REDIRECT_KEY) {
                    return Err(AuthzError::MissingDefaultRedirect);
                }
                let Some(rule) = rules
                    .get(rejected)
                    .or_else(|| rules.get(DEFAULT_REDIRECT_KEY))
                else {
                    return Err(AuthzError::MissingDefaultRedirect);
                };
                match rule {
                    RedirectRule::State(state) => Ok(RedirectState::new(state.clone())),
                    RedirectRule::Computed(f) => {
                        Ok(f.resolve(rejected, ctx).await.into_state())
                    }
                    RedirectRule::Descriptor(descriptor) => Ok(descriptor.clone()),
                }
            }
        }
    }
}

impl From<&str> for RedirectTarget {
    fn from(state: &str) -> Self {
        Self::State(state.to_owned())
    }
}

impl From<String> for RedirectTarget {
    fn from(state: String) -> Self {
        Self::State(state)
    }
}

fn redirect_state_from_object(map: &serde_json::Map<String, Value>) -> Option<RedirectState> {
    let state = map.get("state")?.as_str()?.to_owned();
    let params = match map.get("params") {
        Some(Value::Object(params)) => params.clone().into_iter().collect(),
        _ => TransitionContext::new(),
    };
    Some(RedirectState { state, params })
}

fn redirect_rule_from_value<E: de::Error>(value: &Value) -> std::result::Result<RedirectRule, E> {
    match value {
        Value::String(state) => Ok(RedirectRule::State(state.clone())),
        Value::Object(map) => redirect_state_from_object(map)
            .map(RedirectRule::Descriptor)
            .ok_or_else(|| {
                de::Error::custom("redirect descriptor requires a string `state` field")
            }),
        _ => Err(de::Error::custom(
            "redirect entry must be a state name or a destination object",
        )),
    }
}

/// Deserializes the literal subset of the declared-permission shape:
/// a string state name, or an object keyed by rejected rule name whose
/// values are state names or `{ "state": ..., "params": ... }` objects.
/// Function-valued redirects are code-only.
impl<'de> Deserialize<'de> for RedirectTarget {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(state) => Ok(Self::State(state)),
            Value::Object(map) => {
                let mut rules = HashMap::with_capacity(map.len());
                for (key, entry) in &map {
                    rules.insert(key.clone(), redirect_rule_from_value(entry)?);
                }
                Ok(Self::ByRejection(rules))
            }
            _ => Err(de::Error::custom(
                "redirectTo must be a state name or a per-rejection map",
            )),
        }
    }
}
