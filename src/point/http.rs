//! Authorization point for raw HTTP requests.

use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::CombinedPermission;
use crate::point::{PointConfig, PointCore, PolicyLoader};
use crate::policy::HttpRequestPolicy;
use crate::resource::HttpRequestResource;

/// Checked when an HTTP request arrives, before routing.
pub struct HttpRequestAuthorizationPoint {
    core: PointCore<HttpRequestPolicy>,
}

impl HttpRequestAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "HTTP request"),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<HttpRequestPolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: HttpRequestPolicy) {
        self.core.add_policy(policy);
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    pub fn evaluate(&self, request: &HttpRequestResource, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(request))
    }

    pub fn authorize(
        &self,
        request: HttpRequestResource,
        actor: &Actor,
    ) -> Result<HttpRequestResource> {
        if self.core.is_disabled() {
            return Ok(request);
        }
        let combined = self.core.evaluate(actor, Some(&request));
        let name = format!("{} {}", request.method, request.path);
        self.core.resolve(&combined, actor, &name)?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Effect, PolicyTargets};
    use serde_json::json;

    #[test]
    fn test_ip_restricted_path() {
        let mut point = HttpRequestAuthorizationPoint::new(PointConfig::new("http"));
        point.add_policy(HttpRequestPolicy::new(
            "internal-api",
            Effect::Permit,
            PolicyTargets::new(),
            Some(json!({
                "url_path_pattern": "^/api/internal/",
                "client_ips": ["10.0.0.0/8"],
            })),
        ));

        let actor = Actor::named("bob");
        let inside = HttpRequestResource::new("GET", "/api/internal/jobs")
            .with_peer_ip("10.2.3.4".parse().unwrap());
        assert!(point.authorize(inside, &actor).is_ok());

        let outside = HttpRequestResource::new("GET", "/api/internal/jobs")
            .with_peer_ip("203.0.113.9".parse().unwrap());
        let err = point.authorize(outside, &actor).unwrap_err();
        assert!(err.to_string().contains(
            "Access to HTTP request \"GET /api/internal/jobs\" denied for user \"bob\"!"
        ));
    }
}
