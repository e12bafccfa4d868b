//! Role entity

use futures::future::{self, FutureExt};

use crate::combine::{all_succeed, Rejection, RuleFuture, RuleResult};
use crate::error::{AuthzError, Result};
use crate::store::PermissionStore;
use crate::validator::{TransitionContext, Validator};

/// What a role is defined by: a list of permission names that must all
/// validate, or its own standalone predicate.
#[derive(Debug, Clone)]
pub enum RoleSource {
    /// Every named permission must be registered and validate.
    Permissions(Vec<String>),

    /// The role validates through its own predicate.
    Predicate(Validator),
}

/// A named group of permissions, or a standalone predicate.
#[derive(Debug, Clone)]
pub struct Role {
    name: String,
    source: RoleSource,
}

impl Role {
    /// Create a role.
    ///
    /// # Errors
    ///
    /// [`AuthzError::InvalidName`] if `name` is empty or blank;
    /// [`AuthzError::InvalidDefinition`] if the permission list is empty:
    /// a role must have permission names or a predicate, not neither.
    pub fn new(name: impl Into<String>, source: RoleSource) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuthzError::InvalidName(
                "role name must be a non-empty string".into(),
            ));
        }
        if let RoleSource::Permissions(names) = &source {
            if names.is_empty() {
                return Err(AuthzError::InvalidDefinition(format!(
                    "role `{name}` must define permission names or a validation predicate"
                )));
            }
        }
        Ok(Self { name, source })
    }

    /// Name of the role.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Permission names this role delegates to, when defined by a list.
    pub fn permission_names(&self) -> Option<&[String]> {
        match &self.source {
            RoleSource::Permissions(names) => Some(names),
            RoleSource::Predicate(_) => None,
        }
    }

    /// Validate the role for this transition.
    ///
    /// A list-backed role validates all of its named permissions
    /// concurrently and fulfils only if every one succeeds; a name missing
    /// from `permissions` fails that single permission, which fails the
    /// role. A predicate-backed role runs its own predicate. Either way the
    /// settled name is the role's own.
    pub async fn validate_role(
        &self,
        permissions: &PermissionStore,
        ctx: &TransitionContext,
    ) -> RuleResult {
        match &self.source {
            RoleSource::Predicate(validator) => {
                if validator.validate(&self.name, ctx).await {
                    Ok(self.name.clone())
                } else {
                    Err(Rejection::named(&self.name))
                }
            }
            RoleSource::Permissions(names) => {
                let tasks: Vec<RuleFuture<'_>> = names
                    .iter()
                    .map(|name| match permissions.get(name) {
                        Some(permission) => {
                            async move { permission.validate_permission(ctx).await }.boxed()
                        }
                        None => future::ready(Err(Rejection::named(name.as_str()))).boxed(),
                    })
                    .collect();

                match all_succeed(tasks).await {
                    Ok(_) => Ok(self.name.clone()),
                    Err(_) => Err(Rejection::named(&self.name)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_permission_list_is_a_configuration_error() {
        assert!(matches!(
            Role::new("ACCOUNTANT", RoleSource::Permissions(Vec::new())),
            Err(AuthzError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn empty_name_is_a_configuration_error() {
        assert!(matches!(
            Role::new("", RoleSource::Predicate(Validator::always(true))),
            Err(AuthzError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn predicate_role_fulfils_with_role_name() {
        let role = Role::new("ADMIN", RoleSource::Predicate(Validator::always(true))).unwrap();
        let store = PermissionStore::new();
        let result = role.validate_role(&store, &TransitionContext::new()).await;
        assert_eq!(result.unwrap(), "ADMIN");
    }

    #[tokio::test]
    async fn list_role_requires_every_permission() {
        let store = PermissionStore::new();
        store.define("READ", Validator::always(true)).unwrap();
        store.define("WRITE", Validator::always(false)).unwrap();

        let editor = Role::new(
            "EDITOR",
            RoleSource::Permissions(vec!["READ".into(), "WRITE".into()]),
        )
        .unwrap();
        assert_eq!(editor.permission_names().map(<[String]>::len), Some(2));
        let rejection = editor
            .validate_role(&store, &TransitionContext::new())
            .await
            .unwrap_err();
        assert_eq!(rejection.name(), "EDITOR");

        let reader = Role::new("READER", RoleSource::Permissions(vec!["READ".into()])).unwrap();
        let result = reader.validate_role(&store, &TransitionContext::new()).await;
        assert_eq!(result.unwrap(), "READER");
    }

    #[tokio::test]
    async fn unregistered_permission_fails_the_role() {
        let store = PermissionStore::new();
        store.define("READ", Validator::always(true)).unwrap();

        let role = Role::new(
            "AUDITOR",
            RoleSource::Permissions(vec!["READ".into(), "GHOST".into()]),
        )
        .unwrap();
        assert!(role
            .validate_role(&store, &TransitionContext::new())
            .await
            .is_err());
    }
}
