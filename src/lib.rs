//! Authz Core - Policy-Based Authorization Engine
//!
//! This crate provides an in-process attribute-based authorization engine:
//! policies evaluate to four-valued permissions (Permit, Deny, Indeterminate,
//! NotApplicable), combining algorithms fold them into one decision, and
//! per-resource-kind authorization points turn that decision into
//! pass-through or a structured access denial.

pub mod actor;
pub mod condition;
pub mod error;
pub mod event;
pub mod permission;
pub mod point;
pub mod policy;
pub mod resource;
pub mod selector;

// Re-export commonly used types
pub use actor::Actor;
pub use error::{AccessDeniedError, AuthzError, Result};
pub use event::{AuthorizationListener, AuthorizedEvent};
pub use permission::{
    CombinedPermission, CombiningAlgorithm, Decision, IndeterminateKind, Obligation, Permission,
};
pub use point::{PointConfig, PolicyLoader};
pub use policy::{Effect, Policy, PolicyTargets};
