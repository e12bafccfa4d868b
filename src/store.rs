//! Permission and role registries
//!
//! The registries are explicit values handed to the engine, not process-wide
//! state: a host creates one [`Registry`] per authorization context, which
//! keeps tests isolated and allows several independent contexts in one
//! process.
//!
//! Stores are cheap clonable handles over shared concurrent maps. Lookups
//! during an in-flight evaluation are optimistic snapshot reads per name;
//! definitions added or removed mid-evaluation may or may not be observed by
//! that evaluation, and no lock is held across suspension points.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Result;
use crate::permission::Permission;
use crate::role::{Role, RoleSource};
use crate::validator::Validator;

/// Registry of named permissions.
#[derive(Debug, Clone, Default)]
pub struct PermissionStore {
    inner: Arc<DashMap<String, Permission>>,
}

impl PermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a permission. Redefining a name silently overwrites the
    /// previous definition.
    pub fn define(&self, name: impl Into<String>, validator: Validator) -> Result<()> {
        let permission = Permission::new(name, validator)?;
        self.inner.insert(permission.name().to_owned(), permission);
        Ok(())
    }

    /// Define several permissions sharing one validation predicate. An
    /// empty list is a no-op.
    pub fn define_many<I>(&self, names: I, validator: Validator) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for name in names {
            self.define(name, validator.clone())?;
        }
        Ok(())
    }

    /// Whether a permission with this name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Snapshot of the named permission, if registered.
    pub fn get(&self, name: &str) -> Option<Permission> {
        self.inner.get(name).map(|entry| entry.value().clone())
    }

    /// Remove a permission. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Remove several permissions.
    pub fn remove_many<'a, I>(&self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            self.inner.remove(name);
        }
    }

    /// Remove every permission.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Registered permission names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered permissions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Registry of named roles.
#[derive(Debug, Clone, Default)]
pub struct RoleStore {
    inner: Arc<DashMap<String, Role>>,
}

impl RoleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a role. Redefining a name silently overwrites the previous
    /// definition.
    pub fn define(&self, name: impl Into<String>, source: RoleSource) -> Result<()> {
        let role = Role::new(name, source)?;
        self.inner.insert(role.name().to_owned(), role);
        Ok(())
    }

    /// Define a role over permission names, auto-registering each name in
    /// `permissions` with the shared predicate.
    ///
    /// Convenience composition for the common case where a role and the
    /// permissions it groups validate the same way.
    pub fn define_with_permissions<I>(
        &self,
        name: impl Into<String>,
        permission_names: I,
        validator: Validator,
        permissions: &PermissionStore,
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let names: Vec<String> = permission_names.into_iter().map(Into::into).collect();
        permissions.define_many(names.clone(), validator)?;
        self.define(name, RoleSource::Permissions(names))
    }

    /// Whether a role with this name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Snapshot of the named role, if registered.
    pub fn get(&self, name: &str) -> Option<Role> {
        self.inner.get(name).map(|entry| entry.value().clone())
    }

    /// Remove a role. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Remove several roles.
    pub fn remove_many<'a, I>(&self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            self.inner.remove(name);
        }
    }

    /// Remove every role.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Registered role names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered roles.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// One authorization context: the permission and role registries the engine
/// resolves rule names against.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Permission definitions.
    pub permissions: PermissionStore,

    /// Role definitions.
    pub roles: RoleStore,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every permission and role. Typically called on logout or in
    /// test teardown.
    pub fn clear(&self) {
        self.permissions.clear();
        self.roles.clear();
    }
}
