//! Four-valued authorization decisions.
//!
//! A [`Permission`] is the immutable outcome of evaluating one policy (or of
//! combining many). The decision vocabulary follows the standard ABAC one:
//! `Permit`, `Deny`, `Indeterminate` (with a flavor recording which effect
//! the failed evaluation leaned toward) and `NotApplicable`.

pub mod combining;
pub mod obligation;

pub use combining::{CombinedPermission, CombiningAlgorithm};
pub use obligation::{DataFilterObligation, Obligation, ObligationPayload};

use crate::policy::Effect;
use std::fmt;
use std::sync::Arc;

/// Flavor of an Indeterminate decision: which effect the policy would have
/// produced had its evaluation not failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndeterminateKind {
    #[default]
    Neither,
    Permit,
    Deny,
    Both,
}

/// The decision value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
    Indeterminate(IndeterminateKind),
    NotApplicable,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Permit => f.write_str("Permit"),
            Decision::Deny => f.write_str("Deny"),
            Decision::Indeterminate(IndeterminateKind::Neither) => f.write_str("Indeterminate"),
            Decision::Indeterminate(IndeterminateKind::Permit) => f.write_str("Indeterminate{P}"),
            Decision::Indeterminate(IndeterminateKind::Deny) => f.write_str("Indeterminate{D}"),
            Decision::Indeterminate(IndeterminateKind::Both) => f.write_str("Indeterminate{DP}"),
            Decision::NotApplicable => f.write_str("NotApplicable"),
        }
    }
}

/// An immutable authorization decision with its obligations and provenance.
///
/// Created once per policy per evaluation, or synthetically by a combining
/// algorithm. Combining never mutates its inputs; the only mutation a
/// permission allows is [`Permission::add_obligation`], used to accumulate
/// obligations discovered while the decision is being applied.
#[derive(Debug, Clone)]
pub struct Permission {
    decision: Decision,
    explanation: String,
    policy_name: Option<String>,
    obligations: Vec<Obligation>,
    cause: Option<Arc<anyhow::Error>>,
}

impl Permission {
    fn new(decision: Decision, policy: Option<&str>, reason: Option<&str>) -> Self {
        Self {
            decision,
            explanation: reason.unwrap_or_default().to_string(),
            policy_name: policy.map(str::to_string),
            obligations: Vec::new(),
            cause: None,
        }
    }

    pub fn permitted(policy: Option<&str>, reason: Option<&str>) -> Self {
        Self::new(Decision::Permit, policy, reason)
    }

    pub fn denied(policy: Option<&str>, reason: Option<&str>) -> Self {
        Self::new(Decision::Deny, policy, reason)
    }

    pub fn not_applicable(policy: Option<&str>, reason: Option<&str>) -> Self {
        Self::new(Decision::NotApplicable, policy, reason)
    }

    /// An Indeterminate decision leaning toward the effect the policy was
    /// configured with, carrying the triggering error if any.
    pub fn indeterminate(
        cause: Option<anyhow::Error>,
        leaning: Option<Effect>,
        policy: Option<&str>,
        reason: Option<&str>,
    ) -> Self {
        let kind = match leaning {
            Some(Effect::Permit) => IndeterminateKind::Permit,
            Some(Effect::Deny) => IndeterminateKind::Deny,
            None => IndeterminateKind::Neither,
        };
        Self::indeterminate_kind(kind, cause, policy, reason)
    }

    pub fn indeterminate_kind(
        kind: IndeterminateKind,
        cause: Option<anyhow::Error>,
        policy: Option<&str>,
        reason: Option<&str>,
    ) -> Self {
        let mut permission = Self::new(Decision::Indeterminate(kind), policy, reason);
        permission.cause = cause.map(Arc::new);
        permission
    }

    /// Permit or Deny, straight from a policy effect.
    pub fn from_effect(effect: Effect, policy: Option<&str>, reason: Option<&str>) -> Self {
        match effect {
            Effect::Permit => Self::permitted(policy, reason),
            Effect::Deny => Self::denied(policy, reason),
        }
    }

    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn is_permitted(&self) -> bool {
        self.decision == Decision::Permit
    }

    pub fn is_denied(&self) -> bool {
        self.decision == Decision::Deny
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self.decision, Decision::Indeterminate(_))
    }

    pub fn is_indeterminate_permit(&self) -> bool {
        self.decision == Decision::Indeterminate(IndeterminateKind::Permit)
    }

    pub fn is_indeterminate_deny(&self) -> bool {
        self.decision == Decision::Indeterminate(IndeterminateKind::Deny)
    }

    pub fn is_not_applicable(&self) -> bool {
        self.decision == Decision::NotApplicable
    }

    pub fn has_obligations(&self) -> bool {
        !self.obligations.is_empty()
    }

    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    pub fn obligations_mut(&mut self) -> impl Iterator<Item = &mut Obligation> {
        self.obligations.iter_mut()
    }

    /// Append an obligation discovered while applying this decision.
    pub fn add_obligation(&mut self, obligation: Obligation) {
        self.obligations.push(obligation);
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Name of the policy this permission came from, for diagnostics.
    pub fn policy_name(&self) -> Option<&str> {
        self.policy_name.as_deref()
    }

    /// The error that caused an Indeterminate decision, if any.
    pub fn exception(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.decision.fmt(f)
    }
}
