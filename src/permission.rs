//! Permission entity

use crate::combine::{Rejection, RuleResult};
use crate::error::{AuthzError, Result};
use crate::validator::{TransitionContext, Validator};

/// A named capability with an asynchronous validation predicate.
///
/// Immutable after creation; redefining the same name in a
/// [`PermissionStore`](crate::store::PermissionStore) replaces the whole
/// definition.
#[derive(Debug, Clone)]
pub struct Permission {
    name: String,
    validator: Validator,
}

impl Permission {
    /// Create a permission.
    ///
    /// # Errors
    ///
    /// [`AuthzError::InvalidName`] if `name` is empty or blank.
    pub fn new(name: impl Into<String>, validator: Validator) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuthzError::InvalidName(
                "permission name must be a non-empty string".into(),
            ));
        }
        Ok(Self { name, validator })
    }

    /// Name of the permission.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the validation predicate for this transition.
    ///
    /// Fulfils with the permission name when the predicate returns `true`,
    /// rejects with the name otherwise.
    pub async fn validate_permission(&self, ctx: &TransitionContext) -> RuleResult {
        if self.validator.validate(&self.name, ctx).await {
            Ok(self.name.clone())
        } else {
            Err(Rejection::named(&self.name))
        }
    }
}
