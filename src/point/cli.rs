//! Authorization point for command line commands.

use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::CombinedPermission;
use crate::point::{PointConfig, PointCore, PolicyLoader};
use crate::policy::CliPolicy;
use crate::resource::CliCommand;

/// Checked before a console command runs.
pub struct CliAuthorizationPoint {
    core: PointCore<CliPolicy>,
}

impl CliAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "command"),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<CliPolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: CliPolicy) {
        self.core.add_policy(policy);
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    pub fn evaluate(&self, command: &CliCommand, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(command))
    }

    pub fn authorize(&self, command: CliCommand, actor: &Actor) -> Result<CliCommand> {
        if self.core.is_disabled() {
            return Ok(command);
        }
        let combined = self.core.evaluate(actor, Some(&command));
        self.core.resolve(&combined, actor, &command.command)?;
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Effect, PolicyTargets};
    use serde_json::json;

    #[test]
    fn test_command_pattern_gate() {
        let mut point = CliAuthorizationPoint::new(PointConfig::new("cli"));
        point.add_policy(CliPolicy::new(
            "ops-migrations",
            Effect::Permit,
            PolicyTargets::new().role("Ops"),
            Some(json!({ "command_pattern": "^migrate(\\s|$)" })),
        ));

        let ops = Actor::named("carol").with_role("Ops");
        assert!(point
            .authorize(CliCommand::new("migrate --dry-run"), &ops)
            .is_ok());
        assert!(point
            .authorize(CliCommand::new("drop-database"), &ops)
            .is_err());
    }
}
