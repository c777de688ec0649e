//! Authorization point guarding data sheet operations.
//!
//! Beyond pass-or-deny this point is the main obligation consumer: filter
//! obligations attached by permitting policies are OR-joined among
//! themselves and ANDed onto whatever filters the caller already put on the
//! request. One unrestricted obligation nullifies all narrower ones.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::actor::Actor;
use crate::condition::ConditionGroup;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::{CombinedPermission, ObligationPayload};
use crate::point::{lock_tolerant, PointConfig, PointCore, PolicyLoader};
use crate::policy::DataPolicy;
use crate::resource::{DataOperation, DataRequest};

/// Key of the unrestricted-operation cache: object alias, actor identity,
/// operation.
type UnrestrictedKey = (String, String, DataOperation);

/// Checked before a data sheet is read, created, updated or deleted.
pub struct DataAuthorizationPoint {
    core: PointCore<DataPolicy>,
    /// Operations proven unrestricted (Permit with zero obligations) for an
    /// (object, actor) pair. Lives for the lifetime of the point; policy
    /// changes through `add_policy` clear it.
    unrestricted: Mutex<HashSet<UnrestrictedKey>>,
}

impl DataAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "data"),
            unrestricted: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<DataPolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: DataPolicy) {
        self.core.add_policy(policy);
        lock_tolerant(&self.unrestricted).clear();
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    /// Combined decision without pass-or-deny resolution, for inspection.
    pub fn evaluate(&self, request: &DataRequest, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(request))
    }

    /// Authorize the operation and return the request with any filter
    /// obligations merged into its filter set.
    pub fn authorize(&self, mut request: DataRequest, actor: &Actor) -> Result<DataRequest> {
        if self.core.is_disabled() {
            return Ok(request);
        }

        let key = (
            request.object.alias().to_ascii_lowercase(),
            actor.identity_key().to_string(),
            request.operation,
        );
        if lock_tolerant(&self.unrestricted).contains(&key) {
            tracing::debug!(
                point = %self.core.config().name,
                object = request.object.alias(),
                user = actor.username(),
                "operation known unrestricted, skipping evaluation"
            );
            return Ok(request);
        }

        let mut combined = self.core.evaluate(actor, Some(&request));
        self.core
            .resolve(&combined, actor, request.object.alias())?;

        let mut unrestricted = false;
        let mut accumulated: Vec<ConditionGroup> = Vec::new();
        for obligation in combined.obligations_mut() {
            if obligation.is_fulfilled() {
                continue;
            }
            let ObligationPayload::DataFilter(payload) = obligation.payload();
            if payload.is_unrestricted() {
                // One unrestricted permit overrides every narrower filter.
                unrestricted = true;
            } else if !unrestricted {
                if let Some(filters) = payload.effective_filters() {
                    accumulated.push(filters);
                }
            }
            obligation.mark_fulfilled();
        }

        if !unrestricted {
            if let Some(joined) = ConditionGroup::or_of(accumulated) {
                request.filters = Some(ConditionGroup::and_combine(request.filters.take(), joined));
            }
        }

        // A permit that needed no obligation at all is provably
        // unrestricted for this (object, actor, operation) triple.
        if combined.is_permitted() && !combined.has_obligations() {
            lock_tolerant(&self.unrestricted).insert(key);
        }

        Ok(request)
    }
}
