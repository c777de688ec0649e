//! Policy for raw HTTP requests: URL, query, body and client IP matching.

use std::net::IpAddr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::HttpRequestResource;
use crate::selector::{FacadeSelector, RoleSelector};

/// Condition parameters for an [`HttpRequestPolicy`].
///
/// All patterns are full regular expressions. An invalid pattern is a
/// configuration fault and surfaces as an indeterminate decision rather
/// than a silent non-match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpPolicyCondition {
    /// Regex matched against the request path.
    pub url_path_pattern: Option<String>,
    /// Regex matched against the raw query string.
    pub url_query_pattern: Option<String>,
    /// Regex matched against the request body.
    pub body_pattern: Option<String>,
    /// Client IP allow-list, entries are single IPs or IPv4 CIDR blocks.
    pub client_ips: Vec<String>,
    /// Trusted proxies skipped when resolving the client IP from the
    /// forwarding chain. Same format as `client_ips`.
    pub proxy_ips: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HttpRequestPolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    facade: Option<FacadeSelector>,
    condition: Option<serde_json::Value>,
}

impl HttpRequestPolicy {
    pub fn new(
        name: impl Into<String>,
        effect: Effect,
        targets: PolicyTargets,
        condition: Option<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            effect,
            role: targets.user_role.map(RoleSelector::new),
            facade: targets.facade.map(FacadeSelector::new),
            condition,
        }
    }

    fn condition(&self) -> Result<HttpPolicyCondition, AuthzError> {
        match &self.condition {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(HttpPolicyCondition::default()),
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&HttpRequestResource>,
    ) -> Result<Permission, AuthzError> {
        let request = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(selector) = &self.facade {
            let facade_matches = request
                .facade
                .as_ref()
                .is_some_and(|facade| selector.matches(facade));
            if !facade_matches {
                return Ok(does_not_apply(&self.name, "facade does not match"));
            }
        }

        let condition = self.condition()?;

        if let Some(pattern) = &condition.url_path_pattern {
            if !Regex::new(pattern)?.is_match(&request.path) {
                return Ok(does_not_apply(&self.name, "url path does not match"));
            }
        }

        if let Some(pattern) = &condition.url_query_pattern {
            let query = request.query.as_deref().unwrap_or("");
            if !Regex::new(pattern)?.is_match(query) {
                return Ok(does_not_apply(&self.name, "url query does not match"));
            }
        }

        if let Some(pattern) = &condition.body_pattern {
            let body = request.body.as_deref().unwrap_or("");
            if !Regex::new(pattern)?.is_match(body) {
                return Ok(does_not_apply(&self.name, "request body does not match"));
            }
        }

        if !condition.client_ips.is_empty() {
            let Some(client_ip) = resolve_client_ip(request, &condition.proxy_ips) else {
                return Ok(does_not_apply(&self.name, "client ip is unknown"));
            };
            if !ip_allowed(client_ip, &condition.client_ips) {
                return Ok(does_not_apply(&self.name, "client ip does not match"));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for HttpRequestPolicy {
    type Resource = HttpRequestResource;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&HttpRequestResource>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}

/// Resolves the effective client IP for a request that may have passed
/// through reverse proxies.
///
/// Walks the `X-Forwarded-For` chain from the nearest hop backwards,
/// skipping addresses on the trusted proxy list, and returns the first
/// untrusted address. Falls back to the peer address when the chain is
/// empty or fully trusted but the peer itself is not.
fn resolve_client_ip(request: &HttpRequestResource, proxy_ips: &[String]) -> Option<IpAddr> {
    let peer_trusted = request
        .peer_ip
        .is_some_and(|peer| ip_allowed(peer, proxy_ips));

    // A forwarding chain is only trustworthy when the direct peer is a
    // known proxy, otherwise the header could be forged by the client.
    if peer_trusted {
        for hop in request.forwarded_for.iter().rev() {
            if !ip_allowed(*hop, proxy_ips) {
                return Some(*hop);
            }
        }
    }

    request.peer_ip
}

fn ip_allowed(ip: IpAddr, entries: &[String]) -> bool {
    entries.iter().any(|entry| ip_matches_entry(ip, entry))
}

/// Matches an address against a single IP or an IPv4 CIDR block.
/// Malformed entries never match.
fn ip_matches_entry(ip: IpAddr, entry: &str) -> bool {
    if let Some((base, prefix)) = entry.split_once('/') {
        let (Ok(base), Ok(prefix)) = (base.parse::<IpAddr>(), prefix.parse::<u8>()) else {
            return false;
        };
        match (ip, base) {
            (IpAddr::V4(ipv4), IpAddr::V4(basev4)) => {
                if prefix > 32 {
                    return false;
                }
                let mask = if prefix == 0 {
                    0
                } else {
                    u32::MAX << (32 - prefix)
                };
                (u32::from(ipv4) & mask) == (u32::from(basev4) & mask)
            }
            _ => false,
        }
    } else {
        entry.parse::<IpAddr>().map(|parsed| parsed == ip).unwrap_or(false)
    }
}
