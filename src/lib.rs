//! # routeguard
//!
//! Permission and role resolution engine for client-side route transitions.
//!
//! On every navigation attempt the host routing framework asks this engine
//! whether the target view is permitted for the current actor, and on
//! denial where to redirect instead. The engine owns the permission/role
//! data model, the map aggregating `only`/`except` rules across a hierarchy
//! of nested routes, and the asynchronous except-first evaluation algorithm.
//! Validation itself is a caller-supplied predicate; the engine only
//! orchestrates when predicates run and how their results combine.
//!
//! ## Features
//!
//! - **Async-first evaluation**: predicates inside a rule-group run
//!   concurrently; accept/deny is built from two explicit combinators
//!   (first-success OR, all-succeed AND)
//! - **Except-first semantics**: an explicit deny always wins over any
//!   allow rule
//! - **Route-hierarchy inheritance**: rules declared on ancestor routes
//!   merge with the target's, most specific first
//! - **Redirect policies**: fixed state, computed function, or
//!   per-rejection lookup with a mandatory default
//! - **Isolated registries**: permission/role stores are explicit values,
//!   not process globals; one [`Registry`] per authorization context
//!
//! ## Example
//!
//! ```rust
//! use routeguard::{authorize, PermissionDescriptor, PermissionMap, Registry, Validator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Registry::new();
//!     registry
//!         .permissions
//!         .define("VIEW_REPORTS", Validator::from_fn(|_, _| true))
//!         .unwrap();
//!
//!     let descriptor = PermissionDescriptor::new()
//!         .only("VIEW_REPORTS")
//!         .redirect_to("login");
//!     let map = PermissionMap::new(&descriptor, &Default::default());
//!
//!     match authorize(&map, &registry, &Default::default()).await {
//!         Ok(grant) => assert_eq!(grant.matched_name(), Some("VIEW_REPORTS")),
//!         Err(denial) => {
//!             let name = denial.name().unwrap_or("default");
//!             let redirect = map
//!                 .resolve_redirect_state(name, &Default::default())
//!                 .await
//!                 .unwrap();
//!             println!("redirecting to {}", redirect.state);
//!         }
//!     }
//! }
//! ```

pub mod combine;
pub mod engine;
pub mod error;
pub mod map;
pub mod permission;
pub mod redirect;
pub mod role;
pub mod store;
pub mod validator;

// Re-export the public surface
pub use combine::{all_succeed, first_success, GroupFailure, Rejection, RuleFuture, RuleResult};
pub use engine::{authorize, resolve_property_validity, Denial, Grant};
pub use error::{AuthzError, Result};
pub use map::{
    derive_from_route_hierarchy, PermissionDescriptor, PermissionMap, RuleFn, RuleSource,
};
pub use permission::Permission;
pub use redirect::{
    RedirectFn, RedirectOutcome, RedirectRule, RedirectState, RedirectTarget,
    DEFAULT_REDIRECT_KEY,
};
pub use role::{Role, RoleSource};
pub use store::{PermissionStore, Registry, RoleStore};
pub use validator::{TransitionContext, Validator};
