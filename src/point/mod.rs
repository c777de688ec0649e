//! Authorization points: the per-resource-kind decision entry points.
//!
//! A point owns a policy set, evaluates it lazily against a resource,
//! combines the per-policy permissions and either passes the resource
//! through or raises an [`AccessDeniedError`]. Points are the only place an
//! error ever escapes the engine, and the only error kind they raise is the
//! access denial.
//!
//! Policy sets are cached per actor identity and reloaded whenever the
//! identity changes. Both the policy cache and the data point's
//! unrestricted-operation cache sit behind a `Mutex` so points can be shared
//! across threads; evaluation itself stays synchronous.
//!
//! Every `authorize` call takes the acting user explicitly. The engine keeps
//! no ambient current-actor state; resolving the session user is the host's
//! job before it calls in.

pub mod action;
pub mod cli;
pub mod context;
pub mod data;
pub mod facade;
pub mod http;
pub mod page;

pub use action::ActionAuthorizationPoint;
pub use cli::CliAuthorizationPoint;
pub use context::ContextAuthorizationPoint;
pub use data::DataAuthorizationPoint;
pub use facade::FacadeAuthorizationPoint;
pub use http::HttpRequestAuthorizationPoint;
pub use page::PageAuthorizationPoint;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::{AccessDeniedError, AuthzError, Result};
use crate::event::{AuthorizationListener, AuthorizedEvent};
use crate::permission::{CombinedPermission, CombiningAlgorithm, Permission};
use crate::policy::{Effect, Policy};

/// Configuration shared by every point kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointConfig {
    pub name: String,
    /// A disabled point passes every resource through untouched.
    pub disabled: bool,
    /// Effect applied when combining yields Indeterminate or NotApplicable.
    pub default_effect: Effect,
    pub combining_algorithm: CombiningAlgorithm,
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            disabled: false,
            default_effect: Effect::Deny,
            combining_algorithm: CombiningAlgorithm::default(),
        }
    }
}

impl PointConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn default_effect(mut self, effect: Effect) -> Self {
        self.default_effect = effect;
        self
    }

    pub fn combining_algorithm(mut self, algorithm: CombiningAlgorithm) -> Self {
        self.combining_algorithm = algorithm;
        self
    }
}

/// Source of per-actor policies, implemented by the host framework. The
/// engine calls it on the first authorization for an actor identity and
/// again whenever the identity changes.
pub trait PolicyLoader<P>: Send + Sync {
    fn load_policies(&self, actor: &Actor) -> Result<Vec<P>>;
}

impl<P, F> PolicyLoader<P> for F
where
    F: Fn(&Actor) -> Result<Vec<P>> + Send + Sync,
{
    fn load_policies(&self, actor: &Actor) -> Result<Vec<P>> {
        self(actor)
    }
}

/// The kind-independent core every point delegates to.
pub(crate) struct PointCore<P: Policy> {
    config: PointConfig,
    /// Resource noun used in log and denial messages, e.g. `action`.
    noun: &'static str,
    base_policies: Vec<P>,
    loader: Option<Box<dyn PolicyLoader<P>>>,
    listeners: Vec<Arc<dyn AuthorizationListener>>,
    /// Last loaded policy set, keyed by actor identity.
    cache: Mutex<Option<(String, Arc<Vec<P>>)>>,
}

/// Cache locks recover from poisoning instead of propagating it.
pub(crate) fn lock_tolerant<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl<P: Policy + Clone> PointCore<P> {
    pub(crate) fn new(config: PointConfig, noun: &'static str) -> Self {
        Self {
            config,
            noun,
            base_policies: Vec::new(),
            loader: None,
            listeners: Vec::new(),
            cache: Mutex::new(None),
        }
    }

    pub(crate) fn config(&self) -> &PointConfig {
        &self.config
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.config.disabled
    }

    pub(crate) fn set_loader(&mut self, loader: Box<dyn PolicyLoader<P>>) {
        self.loader = Some(loader);
        *lock_tolerant(&self.cache) = None;
    }

    pub(crate) fn add_listener(&mut self, listener: Arc<dyn AuthorizationListener>) {
        self.listeners.push(listener);
    }

    /// Append a policy to the in-memory set and drop the cached snapshot so
    /// the next evaluation sees it.
    pub(crate) fn add_policy(&mut self, policy: P) {
        self.base_policies.push(policy);
        *lock_tolerant(&self.cache) = None;
    }

    /// The policy set for this actor, loading and caching on identity
    /// change. A loader failure is an evaluation fault: the base set is used
    /// and an extra Indeterminate permission joins the combining sequence,
    /// and nothing is cached so the next call retries the load.
    fn policies_for(&self, actor: &Actor) -> (Arc<Vec<P>>, Option<Permission>) {
        if let Some((key, set)) = lock_tolerant(&self.cache).as_ref() {
            if key == actor.identity_key() {
                return (Arc::clone(set), None);
            }
        }

        // The cache lock is not held while the loader runs; a loader may
        // authorize its own policy-store reads through this same point.
        let mut set = self.base_policies.clone();
        let fault = match &self.loader {
            Some(loader) => match loader.load_policies(actor) {
                Ok(loaded) => {
                    set.extend(loaded);
                    None
                }
                Err(err) => {
                    tracing::warn!(
                        point = %self.config.name,
                        user = actor.username(),
                        error = %err,
                        "policy loading failed"
                    );
                    Some(Permission::indeterminate(
                        Some(anyhow::Error::new(err)),
                        None,
                        None,
                        Some("policy loading failed"),
                    ))
                }
            },
            None => None,
        };

        let set = Arc::new(set);
        if fault.is_none() {
            *lock_tolerant(&self.cache) =
                Some((actor.identity_key().to_string(), Arc::clone(&set)));
        }
        (set, fault)
    }

    /// Evaluate the policy set lazily and combine. Policies are only pulled
    /// as long as the combining algorithm keeps asking.
    pub(crate) fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&P::Resource>,
    ) -> CombinedPermission {
        let (policies, fault) = self.policies_for(actor);
        let sequence = fault.into_iter().chain(policies.iter().map(|policy| {
            let permission = policy.authorize(actor, resource);
            tracing::debug!(
                point = %self.config.name,
                policy = policy.name(),
                decision = %permission,
                "policy evaluated"
            );
            permission
        }));
        CombinedPermission::combine(self.config.combining_algorithm, sequence)
    }

    /// Turn the combined decision into pass-through or denial, honoring the
    /// default effect for Indeterminate and NotApplicable outcomes.
    pub(crate) fn resolve(
        &self,
        combined: &CombinedPermission,
        actor: &Actor,
        resource_name: &str,
    ) -> Result<()> {
        let undecided = combined.is_indeterminate() || combined.is_not_applicable();
        let granted =
            combined.is_permitted() || (undecided && self.config.default_effect == Effect::Permit);

        if granted {
            tracing::info!(
                point = %self.config.name,
                user = actor.username(),
                resource = resource_name,
                decision = %combined,
                "access granted"
            );
            let event = AuthorizedEvent {
                point: self.config.name.clone(),
                username: actor.username().to_string(),
                anonymous: actor.is_anonymous(),
                resource: resource_name.to_string(),
                decision: combined.to_string(),
                timestamp: Utc::now(),
            };
            for listener in &self.listeners {
                listener.on_authorized(&event);
            }
            return Ok(());
        }

        let message = if actor.is_anonymous() {
            format!(
                "Access to {} \"{}\" denied for anonymous users!",
                self.noun, resource_name
            )
        } else {
            format!(
                "Access to {} \"{}\" denied for user \"{}\"!",
                self.noun,
                resource_name,
                actor.username()
            )
        };
        tracing::info!(
            point = %self.config.name,
            user = actor.username(),
            resource = resource_name,
            decision = %combined,
            "access denied"
        );
        Err(AuthzError::AccessDenied(Box::new(AccessDeniedError {
            point: self.config.name.clone(),
            permission: combined.result().clone(),
            username: (!actor.is_anonymous()).then(|| actor.username().to_string()),
            resource: resource_name.to_string(),
            message,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{GenericPolicy, PolicyTargets};
    use crate::resource::GenericRequest;

    fn permit_for_role(role: &str) -> GenericPolicy {
        GenericPolicy::new(
            format!("permit-{}", role),
            Effect::Permit,
            PolicyTargets::new().role(role),
        )
    }

    #[test]
    fn test_point_config_defaults() {
        let config = PointConfig::new("test");
        assert!(!config.disabled);
        assert_eq!(config.default_effect, Effect::Deny);
        assert_eq!(
            config.combining_algorithm,
            CombiningAlgorithm::DenyUnlessPermit
        );
    }

    #[test]
    fn test_resolve_default_effect_permit_lets_not_applicable_pass() {
        let core: PointCore<GenericPolicy> = PointCore::new(
            PointConfig::new("test")
                .default_effect(Effect::Permit)
                .combining_algorithm(CombiningAlgorithm::PermitOverrides),
            "resource",
        );
        let actor = Actor::named("bob");
        let combined = core.evaluate(&actor, Some(&GenericRequest::new()));
        assert!(combined.is_not_applicable());
        assert!(core.resolve(&combined, &actor, "thing").is_ok());
    }

    #[test]
    fn test_resolve_denial_message_phrasing() {
        let core: PointCore<GenericPolicy> =
            PointCore::new(PointConfig::new("test"), "resource");

        let named = Actor::named("bob");
        let combined = core.evaluate(&named, Some(&GenericRequest::new()));
        let err = core.resolve(&combined, &named, "thing").unwrap_err();
        let AuthzError::AccessDenied(denial) = err else {
            panic!("expected access denial");
        };
        assert_eq!(
            denial.message,
            "Access to resource \"thing\" denied for user \"bob\"!"
        );
        assert_eq!(denial.username.as_deref(), Some("bob"));

        let anon = Actor::anonymous();
        let combined = core.evaluate(&anon, Some(&GenericRequest::new()));
        let err = core.resolve(&combined, &anon, "thing").unwrap_err();
        let AuthzError::AccessDenied(denial) = err else {
            panic!("expected access denial");
        };
        assert_eq!(
            denial.message,
            "Access to resource \"thing\" denied for anonymous users!"
        );
        assert_eq!(denial.username, None);
    }

    #[test]
    fn test_policy_cache_reloads_on_identity_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let mut core: PointCore<GenericPolicy> =
            PointCore::new(PointConfig::new("test"), "resource");
        core.set_loader(Box::new(move |_actor: &Actor| -> Result<Vec<GenericPolicy>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![permit_for_role("Admin")])
        }));

        let bob = Actor::named("bob").with_role("Admin");
        let request = GenericRequest::new();
        core.evaluate(&bob, Some(&request));
        core.evaluate(&bob, Some(&request));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let alice = Actor::named("alice");
        core.evaluate(&alice, Some(&request));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_loader_reentering_the_point_does_not_deadlock() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::OnceLock;

        let point: Arc<OnceLock<Arc<PointCore<GenericPolicy>>>> = Arc::new(OnceLock::new());
        let reentered = Arc::new(AtomicBool::new(false));

        let inner_point = Arc::clone(&point);
        let flag = Arc::clone(&reentered);
        let mut core: PointCore<GenericPolicy> =
            PointCore::new(PointConfig::new("test"), "resource");
        core.set_loader(Box::new(move |_actor: &Actor| -> Result<Vec<GenericPolicy>> {
            // The first load authorizes its own store read through the point.
            if !flag.swap(true, Ordering::SeqCst) {
                if let Some(core) = inner_point.get() {
                    core.evaluate(&Actor::named("store-reader"), Some(&GenericRequest::new()));
                }
            }
            Ok(vec![permit_for_role("Admin")])
        }));
        let core = Arc::new(core);
        let _ = point.set(Arc::clone(&core));

        let combined = core.evaluate(
            &Actor::named("bob").with_role("Admin"),
            Some(&GenericRequest::new()),
        );
        assert!(combined.is_permitted());
        assert!(reentered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_loader_failure_degrades_to_indeterminate() {
        let mut core: PointCore<GenericPolicy> = PointCore::new(
            PointConfig::new("test").combining_algorithm(CombiningAlgorithm::PermitOverrides),
            "resource",
        );
        core.set_loader(Box::new(|_actor: &Actor| -> Result<Vec<GenericPolicy>> {
            Err(AuthzError::Config("policy store unreachable".to_string()))
        }));

        let combined = core.evaluate(&Actor::named("bob"), Some(&GenericRequest::new()));
        assert!(combined.is_indeterminate());
        assert!(combined.combined_permissions()[0].exception().is_some());
    }

    #[test]
    fn test_add_policy_invalidates_cache() {
        let mut core: PointCore<GenericPolicy> =
            PointCore::new(PointConfig::new("test"), "resource");
        let bob = Actor::named("bob").with_role("Admin");
        let request = GenericRequest::new();

        assert!(core.evaluate(&bob, Some(&request)).is_denied());
        core.add_policy(permit_for_role("Admin"));
        assert!(core.evaluate(&bob, Some(&request)).is_permitted());
    }
}
