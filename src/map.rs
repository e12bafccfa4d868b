//! Permission maps
//!
//! A [`PermissionMap`] aggregates the `only`/`except` rules and redirect
//! policy governing one transition. Heterogeneous rule inputs are normalized
//! at construction; maps from an inheritance chain of nested routes merge
//! into ordered rule-groups, most specific (leaf) first.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::redirect::{RedirectState, RedirectTarget};
use crate::validator::TransitionContext;

type DynamicRule = dyn Fn(&TransitionContext) -> Vec<String> + Send + Sync;

/// Cloneable wrapper over a dynamic rule source: a function producing the
/// rule names for the current transition.
#[derive(Clone)]
pub struct RuleFn {
    inner: Arc<DynamicRule>,
}

impl RuleFn {
    /// Wrap a rule-producing function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TransitionContext) -> Vec<String> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    fn call(&self, ctx: &TransitionContext) -> Vec<String> {
        (self.inner)(ctx)
    }
}

impl fmt::Debug for RuleFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RuleFn(..)")
    }
}

/// Source of one `only`/`except` rule-group before normalization: a literal
/// list of names, or a function invoked with the transition context.
///
/// The string → singleton-list coercion of the declared-permission shape is
/// expressed through the `From` conversions, so equivalent descriptors
/// normalize to structurally equal groups.
#[derive(Debug, Clone)]
pub enum RuleSource {
    /// Fixed list of permission/role names.
    Literal(Vec<String>),

    /// Names computed per transition.
    Dynamic(RuleFn),
}

impl RuleSource {
    /// Produce the rule names for this transition.
    pub fn normalize(&self, ctx: &TransitionContext) -> Vec<String> {
        match self {
            Self::Literal(names) => names.clone(),
            Self::Dynamic(f) => f.call(ctx),
        }
    }

    /// A dynamic source computed from the transition context.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&TransitionContext) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Dynamic(RuleFn::new(f))
    }
}

impl From<&str> for RuleSource {
    fn from(name: &str) -> Self {
        Self::Literal(vec![name.to_owned()])
    }
}

impl From<String> for RuleSource {
    fn from(name: String) -> Self {
        Self::Literal(vec![name])
    }
}

impl From<Vec<String>> for RuleSource {
    fn from(names: Vec<String>) -> Self {
        Self::Literal(names)
    }
}

impl<const N: usize> From<[&str; N]> for RuleSource {
    fn from(names: [&str; N]) -> Self {
        Self::Literal(names.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// Deserializes the literal subset of the declared-permission shape: a
/// string (singleton group) or a list of strings. Dynamic sources are
/// code-only.
impl<'de> Deserialize<'de> for RuleSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(name) => Ok(Self::Literal(vec![name])),
            Value::Array(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(name) => names.push(name),
                        other => {
                            return Err(de::Error::custom(format!(
                                "rule name must be a string, got {other}"
                            )))
                        }
                    }
                }
                Ok(Self::Literal(names))
            }
            _ => Err(de::Error::custom(
                "rules must be a name or a list of names",
            )),
        }
    }
}

/// The declared-permission shape consumed from route configuration:
/// `{ only?, except?, redirectTo? }`.
///
/// This is the de facto wire format between route metadata and the engine.
/// The literal subset (names and state identifiers) deserializes from
/// config; function-valued rules and redirects are attached in code.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PermissionDescriptor {
    /// Rules of which at least one must match for the transition to be
    /// permitted.
    #[serde(default)]
    pub only: Option<RuleSource>,

    /// Rules of which any match denies the transition.
    #[serde(default)]
    pub except: Option<RuleSource>,

    /// Where to send the actor on denial.
    #[serde(default, rename = "redirectTo")]
    pub redirect_to: Option<RedirectTarget>,
}

impl PermissionDescriptor {
    /// An empty descriptor (unrestricted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `only` rules.
    pub fn only(mut self, rules: impl Into<RuleSource>) -> Self {
        self.only = Some(rules.into());
        self
    }

    /// Set the `except` rules.
    pub fn except(mut self, rules: impl Into<RuleSource>) -> Self {
        self.except = Some(rules.into());
        self
    }

    /// Set the redirect policy.
    pub fn redirect_to(mut self, target: impl Into<RedirectTarget>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }
}

/// Aggregated `only`/`except` rules and redirect policy for one transition.
///
/// Constructed once per transition evaluation and discarded after the
/// transition resolves. Rule-groups are ordered most specific first: when a
/// route hierarchy is folded leaf-ward, each child's groups sit ahead of its
/// ancestors'.
#[derive(Debug, Clone, Default)]
pub struct PermissionMap {
    only: Vec<Vec<String>>,
    except: Vec<Vec<String>>,
    redirect_to: Option<RedirectTarget>,
}

impl PermissionMap {
    /// Normalize a descriptor against the transition context.
    ///
    /// Dynamic rule sources are invoked here, once; a source producing no
    /// names contributes no rule-group.
    pub fn new(descriptor: &PermissionDescriptor, ctx: &TransitionContext) -> Self {
        let mut map = Self::default();
        if let Some(source) = &descriptor.only {
            let names = source.normalize(ctx);
            if !names.is_empty() {
                map.only.push(names);
            }
        }
        if let Some(source) = &descriptor.except {
            let names = source.normalize(ctx);
            if !names.is_empty() {
                map.except.push(names);
            }
        }
        map.redirect_to = descriptor.redirect_to.clone();
        map
    }

    /// A map with no rules: every transition is unrestricted.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// `only` rule-groups, most specific first.
    pub fn only(&self) -> &[Vec<String>] {
        &self.only
    }

    /// `except` rule-groups, most specific first.
    pub fn except(&self) -> &[Vec<String>] {
        &self.except
    }

    /// Declared redirect policy, if any.
    pub fn redirect_to(&self) -> Option<&RedirectTarget> {
        self.redirect_to.as_ref()
    }

    /// Whether the map declares no rules at all.
    pub fn is_unrestricted(&self) -> bool {
        self.only.is_empty() && self.except.is_empty()
    }

    /// Merge a more specific (child) map into this one.
    ///
    /// The child's rule-groups are placed ahead of the existing groups, and
    /// a redirect declared by the child unconditionally replaces the
    /// current one. Callers fold a route hierarchy root→leaf, so the leaf's
    /// groups end up first and its redirect is applied last and wins: the
    /// most specific route decides where denials go.
    pub fn extend(&mut self, child: PermissionMap) {
        let mut only = child.only;
        only.append(&mut self.only);
        self.only = only;

        let mut except = child.except;
        except.append(&mut self.except);
        self.except = except;

        if child.redirect_to.is_some() {
            self.redirect_to = child.redirect_to;
        }
    }

    /// Resolve the redirect destination for a rejected rule name.
    ///
    /// # Errors
    ///
    /// [`AuthzError::NoRedirect`](crate::error::AuthzError::NoRedirect)
    /// when the map declares no redirect (the host stays on the current
    /// view);
    /// [`AuthzError::MissingDefaultRedirect`](crate::error::AuthzError::MissingDefaultRedirect)
    /// when a per-rejection map lacks its `default` entry.
    pub async fn resolve_redirect_state(
        &self,
        rejected: &str,
        ctx: &TransitionContext,
    ) -> Result<RedirectState> {
        let Some(target) = &self.redirect_to else {
            debug!(rule = %rejected, "denied transition has no redirect declared");
            return Err(crate::error::AuthzError::NoRedirect);
        };
        let state = target.resolve(rejected, ctx).await?;
        debug!(rule = %rejected, state = %state.state, "redirect resolved");
        Ok(state)
    }
}

/// Fold the declared permissions of a route hierarchy into one map.
///
/// `descriptors` is the ancestor chain ordered root→leaf. Each step's
/// groups are placed ahead of its ancestors' per [`PermissionMap::extend`],
/// so the resulting groups read leaf-first.
pub fn derive_from_route_hierarchy<'a, I>(
    descriptors: I,
    ctx: &TransitionContext,
) -> PermissionMap
where
    I: IntoIterator<Item = &'a PermissionDescriptor>,
{
    let mut map = PermissionMap::default();
    for descriptor in descriptors {
        map.extend(PermissionMap::new(descriptor, ctx));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> TransitionContext {
        TransitionContext::new()
    }

    #[test]
    fn string_and_singleton_list_normalize_identically() {
        let from_str = PermissionMap::new(&PermissionDescriptor::new().only("ADMIN"), &ctx());
        let from_list = PermissionMap::new(
            &PermissionDescriptor::new().only(vec!["ADMIN".to_owned()]),
            &ctx(),
        );
        assert_eq!(from_str.only(), from_list.only());
        assert_eq!(from_str.except(), from_list.except());
    }

    #[test]
    fn empty_rule_source_contributes_no_group() {
        let map = PermissionMap::new(
            &PermissionDescriptor::new().only(Vec::<String>::new()),
            &ctx(),
        );
        assert!(map.only().is_empty());
        assert!(map.is_unrestricted());
    }

    #[test]
    fn dynamic_source_is_invoked_with_the_context() {
        let descriptor = PermissionDescriptor::new().only(RuleSource::from_fn(|ctx| {
            match ctx.get("section").and_then(|v| v.as_str()) {
                Some("billing") => vec!["ACCOUNTANT".to_owned()],
                _ => vec!["USER".to_owned()],
            }
        }));

        let mut billing = TransitionContext::new();
        billing.insert("section".into(), json!("billing"));
        let map = PermissionMap::new(&descriptor, &billing);
        assert_eq!(map.only(), &[vec!["ACCOUNTANT".to_owned()]]);

        let map = PermissionMap::new(&descriptor, &ctx());
        assert_eq!(map.only(), &[vec!["USER".to_owned()]]);
    }

    #[test]
    fn extend_places_child_groups_first() {
        let mut map = PermissionMap::new(
            &PermissionDescriptor::new().only("accepted").except("denied"),
            &ctx(),
        );
        map.extend(PermissionMap::new(
            &PermissionDescriptor::new()
                .only("acceptedChild")
                .except("deniedChild"),
            &ctx(),
        ));

        assert_eq!(
            map.only(),
            &[vec!["acceptedChild".to_owned()], vec!["accepted".to_owned()]]
        );
        assert_eq!(
            map.except(),
            &[vec!["deniedChild".to_owned()], vec!["denied".to_owned()]]
        );
    }

    #[test]
    fn hierarchy_fold_orders_groups_leaf_first() {
        let root = PermissionDescriptor::new().only("accepted").except("denied");
        let child = PermissionDescriptor::new()
            .only("acceptedChild")
            .except("deniedChild");

        let map = derive_from_route_hierarchy([&root, &child], &ctx());
        assert_eq!(
            map.only(),
            &[vec!["acceptedChild".to_owned()], vec!["accepted".to_owned()]]
        );
        assert_eq!(
            map.except(),
            &[vec!["deniedChild".to_owned()], vec!["denied".to_owned()]]
        );
    }

    #[tokio::test]
    async fn leaf_redirect_wins_over_ancestors() {
        let root = PermissionDescriptor::new().only("A").redirect_to("rootFallback");
        let leaf = PermissionDescriptor::new().only("B").redirect_to("leafFallback");

        let map = derive_from_route_hierarchy([&root, &leaf], &ctx());
        let state = map.resolve_redirect_state("B", &ctx()).await.unwrap();
        assert_eq!(state.state, "leafFallback");
    }

    #[tokio::test]
    async fn ancestor_redirect_survives_when_leaf_declares_none() {
        let root = PermissionDescriptor::new().only("A").redirect_to("rootFallback");
        let leaf = PermissionDescriptor::new().only("B");

        let map = derive_from_route_hierarchy([&root, &leaf], &ctx());
        let state = map.resolve_redirect_state("B", &ctx()).await.unwrap();
        assert_eq!(state.state, "rootFallback");
    }

    #[tokio::test]
    async fn no_redirect_declared_rejects() {
        let map = PermissionMap::new(&PermissionDescriptor::new().only("A"), &ctx());
        assert!(matches!(
            map.resolve_redirect_state("A", &ctx()).await,
            Err(crate::error::AuthzError::NoRedirect)
        ));
    }

    #[test]
    fn descriptor_deserializes_from_route_metadata() {
        let descriptor: PermissionDescriptor = serde_json::from_value(json!({
            "only": ["ADMIN", "MODERATOR"],
            "except": "BANNED",
            "redirectTo": { "ADMIN": "adminLogin", "default": "login" }
        }))
        .unwrap();

        let map = PermissionMap::new(&descriptor, &ctx());
        assert_eq!(
            map.only(),
            &[vec!["ADMIN".to_owned(), "MODERATOR".to_owned()]]
        );
        assert_eq!(map.except(), &[vec!["BANNED".to_owned()]]);
        assert!(map.redirect_to().is_some());
    }

    #[test]
    fn descriptor_rejects_non_string_rule_names() {
        assert!(serde_json::from_value::<PermissionDescriptor>(json!({
            "only": [1, 2]
        }))
        .is_err());
    }
}
