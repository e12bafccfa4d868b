//! Error types for the permission resolution engine

use thiserror::Error;

/// Configuration errors surfaced at construction or registration time.
///
/// Evaluation failures (a predicate returning `false`, an unregistered rule
/// name, a rule-group with no match) are *not* errors; they travel as
/// [`Rejection`](crate::combine::Rejection) values through the evaluation
/// pipeline so the host can learn which rule caused a denial.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Empty or blank permission/role name
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Role or permission group defined with unusable contents
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// Transition was denied and the map declares no redirect
    #[error("no redirect declared for denied transition")]
    NoRedirect,

    /// Per-rejection redirect map has no `default` entry
    #[error("redirect map is missing the required `default` entry")]
    MissingDefaultRedirect,
}

/// Result type for configuration-level operations
pub type Result<T> = std::result::Result<T, AuthzError>;
