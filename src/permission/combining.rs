//! Combining algorithms: folding an ordered sequence of permissions into
//! one.
//!
//! The permission sequence is pulled lazily and consumed at most once, so an
//! algorithm that reaches a definitive result stops evaluating the remaining
//! policies. Every permission actually pulled is recorded and available via
//! [`CombinedPermission::combined_permissions`].

use crate::permission::{Decision, IndeterminateKind, Obligation, Permission};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The standard policy combining algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombiningAlgorithm {
    /// Permit if any permit is found, otherwise Deny. Never Indeterminate
    /// or NotApplicable.
    #[default]
    DenyUnlessPermit,
    /// Deny on the first deny found, otherwise Permit. Never Indeterminate
    /// or NotApplicable.
    PermitUnlessDeny,
    /// Any Permit wins; errors and denies only surface when no permit
    /// exists.
    PermitOverrides,
    /// Any Deny wins immediately; permits only surface when no deny and no
    /// plain error exists.
    DenyOverrides,
}

impl fmt::Display for CombiningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CombiningAlgorithm::DenyUnlessPermit => "deny-unless-permit",
            CombiningAlgorithm::PermitUnlessDeny => "permit-unless-deny",
            CombiningAlgorithm::PermitOverrides => "permit-overrides",
            CombiningAlgorithm::DenyOverrides => "deny-overrides",
        };
        f.write_str(name)
    }
}

impl FromStr for CombiningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deny-unless-permit" => Ok(CombiningAlgorithm::DenyUnlessPermit),
            "permit-unless-deny" => Ok(CombiningAlgorithm::PermitUnlessDeny),
            "permit-overrides" => Ok(CombiningAlgorithm::PermitOverrides),
            "deny-overrides" => Ok(CombiningAlgorithm::DenyOverrides),
            other => Err(format!("Unknown combining algorithm \"{}\"", other)),
        }
    }
}

/// What each algorithm observed while consuming the sequence.
#[derive(Debug, Default)]
struct Observed {
    permit: bool,
    deny: bool,
    indeterminate: bool,
    indeterminate_permit: bool,
    indeterminate_deny: bool,
}

impl Observed {
    fn record(&mut self, permission: &Permission) {
        match permission.decision() {
            Decision::Permit => self.permit = true,
            Decision::Deny => self.deny = true,
            Decision::NotApplicable => {}
            // A {DP} input carries no more information than a plain
            // Indeterminate for precedence purposes.
            Decision::Indeterminate(IndeterminateKind::Neither)
            | Decision::Indeterminate(IndeterminateKind::Both) => self.indeterminate = true,
            Decision::Indeterminate(IndeterminateKind::Permit) => {
                self.indeterminate_permit = true
            }
            Decision::Indeterminate(IndeterminateKind::Deny) => self.indeterminate_deny = true,
        }
    }
}

/// The combined outcome of a permission sequence.
///
/// Exposes the same read API as [`Permission`] (delegating to the computed
/// result) plus access to the permissions that were actually consumed.
/// Obligation queries aggregate over the result and every consumed
/// sub-permission.
#[derive(Debug, Clone)]
pub struct CombinedPermission {
    algorithm: CombiningAlgorithm,
    result: Permission,
    consumed: Vec<Permission>,
}

impl CombinedPermission {
    /// Fold a permission sequence with the given algorithm. The sequence is
    /// pulled lazily; algorithms that reach a definitive result stop
    /// pulling.
    pub fn combine<I>(algorithm: CombiningAlgorithm, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        let mut consumed = Vec::new();
        let iter = permissions.into_iter();
        let result = match algorithm {
            CombiningAlgorithm::DenyUnlessPermit => deny_unless_permit(iter, &mut consumed),
            CombiningAlgorithm::PermitUnlessDeny => permit_unless_deny(iter, &mut consumed),
            CombiningAlgorithm::PermitOverrides => permit_overrides(iter, &mut consumed),
            CombiningAlgorithm::DenyOverrides => deny_overrides(iter, &mut consumed),
        };
        Self {
            algorithm,
            result,
            consumed,
        }
    }

    pub fn algorithm(&self) -> CombiningAlgorithm {
        self.algorithm
    }

    pub fn result(&self) -> &Permission {
        &self.result
    }

    /// Exactly the permissions the algorithm consumed, in evaluation order.
    /// Not necessarily all that were available: algorithms may stop early.
    pub fn combined_permissions(&self) -> &[Permission] {
        &self.consumed
    }

    pub fn decision(&self) -> Decision {
        self.result.decision()
    }

    pub fn is_permitted(&self) -> bool {
        self.result.is_permitted()
    }

    pub fn is_denied(&self) -> bool {
        self.result.is_denied()
    }

    pub fn is_indeterminate(&self) -> bool {
        self.result.is_indeterminate()
    }

    pub fn is_not_applicable(&self) -> bool {
        self.result.is_not_applicable()
    }

    pub fn explanation(&self) -> &str {
        self.result.explanation()
    }

    /// True when the result or any consumed sub-permission carries
    /// obligations.
    pub fn has_obligations(&self) -> bool {
        self.result.has_obligations() || self.consumed.iter().any(Permission::has_obligations)
    }

    /// All obligations: the result's own first, then those of each consumed
    /// sub-permission in evaluation order.
    pub fn obligations(&self) -> impl Iterator<Item = &Obligation> {
        self.result
            .obligations()
            .iter()
            .chain(self.consumed.iter().flat_map(|p| p.obligations().iter()))
    }

    pub fn obligations_mut(&mut self) -> impl Iterator<Item = &mut Obligation> {
        self.result
            .obligations_mut()
            .chain(self.consumed.iter_mut().flat_map(|p| p.obligations_mut()))
    }

    /// Append an obligation to the outermost combined result.
    pub fn add_obligation(&mut self, obligation: Obligation) {
        self.result.add_obligation(obligation);
    }
}

impl fmt::Display for CombinedPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.result.fmt(f)
    }
}

fn deny_unless_permit(
    iter: impl Iterator<Item = Permission>,
    consumed: &mut Vec<Permission>,
) -> Permission {
    let mut permitted = false;
    for permission in iter {
        // An unconditional permit settles the outcome; a permit with
        // obligations keeps the scan going so further obligations are
        // collected.
        let stop = permission.is_permitted() && !permission.has_obligations();
        permitted = permitted || permission.is_permitted();
        consumed.push(permission);
        if stop {
            break;
        }
    }
    if permitted {
        Permission::permitted(None, Some("deny-unless-permit: permit found"))
    } else {
        Permission::denied(None, Some("deny-unless-permit: no permit found"))
    }
}

fn permit_unless_deny(
    iter: impl Iterator<Item = Permission>,
    consumed: &mut Vec<Permission>,
) -> Permission {
    for permission in iter {
        let denied = permission.is_denied();
        consumed.push(permission);
        if denied {
            return Permission::denied(None, Some("permit-unless-deny: deny found"));
        }
    }
    Permission::permitted(None, Some("permit-unless-deny: no deny found"))
}

fn permit_overrides(
    iter: impl Iterator<Item = Permission>,
    consumed: &mut Vec<Permission>,
) -> Permission {
    let mut observed = Observed::default();
    for permission in iter {
        observed.record(&permission);
        let stop = permission.is_permitted() && !permission.has_obligations();
        consumed.push(permission);
        if stop {
            break;
        }
    }
    if observed.permit {
        Permission::permitted(None, Some("permit-overrides: permit found"))
    } else if observed.indeterminate {
        Permission::indeterminate_kind(
            IndeterminateKind::Neither,
            None,
            None,
            Some("permit-overrides: indeterminate found"),
        )
    } else if observed.indeterminate_permit && (observed.indeterminate_deny || observed.deny) {
        Permission::indeterminate_kind(
            IndeterminateKind::Both,
            None,
            None,
            Some("permit-overrides: conflicting indeterminates"),
        )
    } else if observed.indeterminate_permit {
        Permission::indeterminate_kind(
            IndeterminateKind::Permit,
            None,
            None,
            Some("permit-overrides: indeterminate permit found"),
        )
    } else if observed.deny {
        Permission::denied(None, Some("permit-overrides: deny found, no permit"))
    } else if observed.indeterminate_deny {
        Permission::indeterminate_kind(
            IndeterminateKind::Deny,
            None,
            None,
            Some("permit-overrides: indeterminate deny found"),
        )
    } else {
        Permission::not_applicable(None, Some("permit-overrides: no policy applied"))
    }
}

fn deny_overrides(
    iter: impl Iterator<Item = Permission>,
    consumed: &mut Vec<Permission>,
) -> Permission {
    let mut observed = Observed::default();
    for permission in iter {
        observed.record(&permission);
        let stop = permission.is_denied();
        consumed.push(permission);
        if stop {
            return Permission::denied(None, Some("deny-overrides: deny found"));
        }
    }
    if observed.indeterminate {
        Permission::indeterminate_kind(
            IndeterminateKind::Neither,
            None,
            None,
            Some("deny-overrides: indeterminate found"),
        )
    } else if observed.indeterminate_deny && (observed.indeterminate_permit || observed.permit) {
        Permission::indeterminate_kind(
            IndeterminateKind::Both,
            None,
            None,
            Some("deny-overrides: conflicting indeterminates"),
        )
    } else if observed.indeterminate_deny {
        Permission::indeterminate_kind(
            IndeterminateKind::Deny,
            None,
            None,
            Some("deny-overrides: indeterminate deny found"),
        )
    } else if observed.permit {
        Permission::permitted(None, Some("deny-overrides: permit found, no deny"))
    } else if observed.indeterminate_permit {
        Permission::indeterminate_kind(
            IndeterminateKind::Permit,
            None,
            None,
            Some("deny-overrides: indeterminate permit found"),
        )
    } else {
        Permission::not_applicable(None, Some("deny-overrides: no policy applied"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionGroup;

    fn conditional_permit() -> Permission {
        Permission::permitted(None, None)
            .with_obligation(Obligation::data_filter(Some(ConditionGroup::and()), None))
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in [
            CombiningAlgorithm::DenyUnlessPermit,
            CombiningAlgorithm::PermitUnlessDeny,
            CombiningAlgorithm::PermitOverrides,
            CombiningAlgorithm::DenyOverrides,
        ] {
            let name = algorithm.to_string();
            assert_eq!(name.parse::<CombiningAlgorithm>().unwrap(), algorithm);
            let json = serde_json::to_string(&algorithm).unwrap();
            assert_eq!(json, format!("\"{}\"", name));
        }
        assert!("first-applicable".parse::<CombiningAlgorithm>().is_err());
    }

    #[test]
    fn test_deny_unless_permit_short_circuits_on_unconditional_permit() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::DenyUnlessPermit,
            vec![
                Permission::permitted(None, None),
                Permission::denied(None, None),
            ],
        );
        assert!(combined.is_permitted());
        assert_eq!(combined.combined_permissions().len(), 1);
    }

    #[test]
    fn test_deny_unless_permit_scans_past_conditional_permit() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::DenyUnlessPermit,
            vec![conditional_permit(), Permission::denied(None, None)],
        );
        assert!(combined.is_permitted());
        assert_eq!(combined.combined_permissions().len(), 2);
        assert!(combined.has_obligations());
    }

    #[test]
    fn test_deny_unless_permit_defaults_to_deny() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::DenyUnlessPermit,
            vec![
                Permission::not_applicable(None, None),
                Permission::indeterminate(None, None, None, None),
            ],
        );
        assert!(combined.is_denied());
        assert_eq!(combined.combined_permissions().len(), 2);
    }

    #[test]
    fn test_permit_unless_deny_stops_on_first_deny() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::PermitUnlessDeny,
            vec![
                Permission::not_applicable(None, None),
                Permission::denied(None, None),
                Permission::permitted(None, None),
            ],
        );
        assert!(combined.is_denied());
        assert_eq!(combined.combined_permissions().len(), 2);
    }

    #[test]
    fn test_permit_unless_deny_defaults_to_permit() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::PermitUnlessDeny,
            vec![Permission::indeterminate(None, None, None, None)],
        );
        assert!(combined.is_permitted());
    }

    #[test]
    fn test_deny_overrides_stops_on_first_deny() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::DenyOverrides,
            vec![
                Permission::permitted(None, None),
                Permission::denied(None, None),
                Permission::permitted(None, None),
            ],
        );
        assert!(combined.is_denied());
        assert_eq!(combined.combined_permissions().len(), 2);
    }

    #[test]
    fn test_permit_overrides_short_circuits_on_unconditional_permit() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::PermitOverrides,
            vec![
                Permission::permitted(None, None),
                Permission::denied(None, None),
            ],
        );
        assert!(combined.is_permitted());
        assert_eq!(combined.combined_permissions().len(), 1);
    }

    #[test]
    fn test_has_obligations_aggregates_consumed() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::DenyUnlessPermit,
            vec![conditional_permit()],
        );
        // The synthetic result has no obligations of its own.
        assert!(!combined.result().has_obligations());
        assert!(combined.has_obligations());
        assert_eq!(combined.obligations().count(), 1);
    }

    #[test]
    fn test_add_obligation_lands_on_result() {
        let mut combined =
            CombinedPermission::combine(CombiningAlgorithm::DenyUnlessPermit, vec![
                Permission::permitted(None, None),
            ]);
        combined.add_obligation(Obligation::data_filter(None, None));
        assert!(combined.result().has_obligations());
        assert_eq!(combined.obligations().count(), 1);
    }

    #[test]
    fn test_single_permit_round_trip() {
        let combined = CombinedPermission::combine(
            CombiningAlgorithm::DenyOverrides,
            std::iter::once(Permission::from_effect(crate::policy::Effect::Permit, None, None)),
        );
        assert!(combined.is_permitted());
        assert_eq!(combined.to_string(), "Permit");
    }

    #[test]
    fn test_empty_sequence() {
        let none = Vec::<Permission>::new();
        assert!(CombinedPermission::combine(CombiningAlgorithm::DenyUnlessPermit, none.clone())
            .is_denied());
        assert!(CombinedPermission::combine(CombiningAlgorithm::PermitUnlessDeny, none.clone())
            .is_permitted());
        assert!(CombinedPermission::combine(CombiningAlgorithm::PermitOverrides, none.clone())
            .is_not_applicable());
        assert!(CombinedPermission::combine(CombiningAlgorithm::DenyOverrides, none)
            .is_not_applicable());
    }

    #[test]
    fn test_lazy_consumption_stops_pulling() {
        let mut pulled = 0;
        let sequence = (0..5).map(|i| {
            pulled += 1;
            if i == 1 {
                Permission::denied(None, None)
            } else {
                Permission::not_applicable(None, None)
            }
        });
        let combined = CombinedPermission::combine(CombiningAlgorithm::PermitUnlessDeny, sequence);
        assert!(combined.is_denied());
        assert_eq!(pulled, 2);
    }
}
