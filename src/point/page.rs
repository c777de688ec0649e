//! Authorization point for page and menu item visibility.

use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::CombinedPermission;
use crate::point::{PointConfig, PointCore, PolicyLoader};
use crate::policy::PagePolicy;
use crate::resource::PageRef;

/// Checked before a page is shown or listed in a menu. Unpublished-page
/// policies are opt-in, so a default effect of Deny hides unpublished pages
/// from everyone without a matching policy.
pub struct PageAuthorizationPoint {
    core: PointCore<PagePolicy>,
}

impl PageAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "page"),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<PagePolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: PagePolicy) {
        self.core.add_policy(policy);
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    pub fn evaluate(&self, page: &PageRef, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(page))
    }

    pub fn authorize(&self, page: PageRef, actor: &Actor) -> Result<PageRef> {
        if self.core.is_disabled() {
            return Ok(page);
        }
        let combined = self.core.evaluate(actor, Some(&page));
        self.core.resolve(&combined, actor, page.alias())?;
        Ok(page)
    }

    /// Convenience for menu building: visibility as a plain boolean.
    pub fn is_visible(&self, page: &PageRef, actor: &Actor) -> bool {
        if self.core.is_disabled() {
            return true;
        }
        let combined = self.core.evaluate(actor, Some(page));
        self.core.resolve(&combined, actor, page.alias()).is_ok()
    }
}
