//! Authorization engine
//!
//! Decides accept or reject for one transition from a [`PermissionMap`],
//! using except-first evaluation: any matching `except` rule denies
//! immediately; otherwise every `only` rule-group must contain at least one
//! match (an empty `only` leaves the transition unrestricted).
//!
//! All rules inside a group are validated concurrently through
//! [`first_success`](crate::combine::first_success); groups evaluate one at
//! a time, most specific (leaf route) first. The engine holds no mutable
//! state: it reads the registry optimistically per name lookup and is
//! invoked at most once per transition attempt by the host.
//!
//! Cancellation is by drop: when the host abandons a transition (a newer
//! one superseded it), dropping the future returned by [`authorize`]
//! abandons the evaluation, and no orphaned predicate result can surface
//! afterwards. No timeouts are imposed; a predicate that never settles
//! stalls its rule-group.

use std::fmt;

use futures::future::{self, FutureExt};
use tracing::{debug, info};

use crate::combine::{first_success, GroupFailure, Rejection, RuleFuture};
use crate::map::PermissionMap;
use crate::store::Registry;
use crate::validator::TransitionContext;

/// Accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// The map declared no `only` rules; nothing restricted the transition.
    Unrestricted,

    /// At least one `only` rule matched; carries the matched name of the
    /// most specific rule-group.
    Matched(String),
}

impl Grant {
    /// The matched rule name, when one exists.
    pub fn matched_name(&self) -> Option<&str> {
        match self {
            Self::Unrestricted => None,
            Self::Matched(name) => Some(name),
        }
    }
}

/// Denied transition.
///
/// Carries the offending rule name: the matched `except` rule, or the
/// rejection of a failed `only` group that settled last. The host feeds
/// this name to [`PermissionMap::resolve_redirect_state`]. The full
/// rejection list of the failing group is kept, in input order, for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct Denial {
    name: Option<String>,
    rejections: Vec<Rejection>,
}

impl Denial {
    fn matched_except(name: String) -> Self {
        Self {
            name: Some(name),
            rejections: Vec::new(),
        }
    }

    fn failed_only(failure: GroupFailure) -> Self {
        Self {
            name: failure.last_settled.map(Rejection::into_name),
            rejections: failure.rejections,
        }
    }

    /// The rule name responsible for the denial.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rejections of the failing `only` group, in input order. Empty when
    /// the denial came from a matched `except` rule.
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "transition denied by rule `{name}`"),
            None => f.write_str("transition denied"),
        }
    }
}

impl std::error::Error for Denial {}

/// Build one validation future per name of a flat rule-group, in input
/// order.
///
/// A name registered as a role resolves through the role (shadowing any
/// permission of the same name); otherwise through the permission; a name
/// registered in neither store yields an already-rejected future carrying
/// that name.
pub fn resolve_property_validity<'a>(
    group: &'a [String],
    registry: &Registry,
    ctx: &'a TransitionContext,
) -> Vec<RuleFuture<'a>> {
    group
        .iter()
        .map(|name| {
            if let Some(role) = registry.roles.get(name) {
                let permissions = registry.permissions.clone();
                async move { role.validate_role(&permissions, ctx).await }.boxed()
            } else if let Some(permission) = registry.permissions.get(name) {
                async move { permission.validate_permission(ctx).await }.boxed()
            } else {
                future::ready(Err(Rejection::named(name.as_str()))).boxed()
            }
        })
        .collect()
}

/// Evaluate a permission map against the registry for one transition.
///
/// Fulfils with a [`Grant`] when the transition is permitted; fails with a
/// [`Denial`] carrying the offending rule name otherwise. The host performs
/// all navigation side effects, including redirect resolution on denial.
///
/// When several rules of one group would match, which one wins depends on
/// settlement order and is not specified; the decision itself is the same
/// either way.
pub async fn authorize(
    map: &PermissionMap,
    registry: &Registry,
    ctx: &TransitionContext,
) -> Result<Grant, Denial> {
    debug!(
        except_groups = map.except().len(),
        only_groups = map.only().len(),
        "evaluating permission map"
    );

    // Explicit deny wins: any match in any except group rejects, and every
    // group of the inheritance chain applies simultaneously.
    for group in map.except() {
        let rules = resolve_property_validity(group, registry, ctx);
        if let Ok(name) = first_success(rules).await {
            info!(rule = %name, "transition denied by except rule");
            return Err(Denial::matched_except(name));
        }
    }

    // Every only group needs at least one match; the leaf-most group's
    // match names the grant.
    let mut groups = map.only().iter();
    let Some(leaf) = groups.next() else {
        debug!("no only rules declared, transition unrestricted");
        return Ok(Grant::Unrestricted);
    };

    let rules = resolve_property_validity(leaf, registry, ctx);
    let matched = match first_success(rules).await {
        Ok(name) => {
            debug!(rule = %name, "only rule matched");
            name
        }
        Err(failure) => {
            info!("transition denied: no only rule matched");
            return Err(Denial::failed_only(failure));
        }
    };

    for group in groups {
        let rules = resolve_property_validity(group, registry, ctx);
        match first_success(rules).await {
            Ok(name) => debug!(rule = %name, "only rule matched"),
            Err(failure) => {
                info!("transition denied: no only rule matched");
                return Err(Denial::failed_only(failure));
            }
        }
    }

    Ok(Grant::Matched(matched))
}
