//! Selectors: small matcher values used as policy targets.
//!
//! Each selector matches one attribute of a resource or actor by alias.
//! An unset target in a policy means "matches anything"; the selectors here
//! therefore only implement the positive match.

use crate::resource::{ActionRef, FacadeRef, ObjectRef, PageRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Matches a user role by alias (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSelector(String);

impl RoleSelector {
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    pub fn alias(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, role_alias: &str) -> bool {
        self.0.eq_ignore_ascii_case(role_alias)
    }
}

/// Matches an action by alias or by prototype path / class name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSelector(String);

impl ActionSelector {
    pub fn new(alias_or_path: impl Into<String>) -> Self {
        Self(alias_or_path.into())
    }

    pub fn matches(&self, action: &ActionRef) -> bool {
        if self.0.eq_ignore_ascii_case(action.alias()) {
            return true;
        }
        action
            .prototype_path()
            .map(|p| self.0.eq_ignore_ascii_case(p))
            .unwrap_or(false)
    }
}

/// Matches a meta object, either exactly or including objects extending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSelector {
    alias: String,
    #[serde(default = "default_true")]
    include_extending: bool,
}

fn default_true() -> bool {
    true
}

impl ObjectSelector {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            include_extending: true,
        }
    }

    /// Restrict the selector to exact alias matches, excluding objects that
    /// merely extend the selected one.
    pub fn exact(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            include_extending: false,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn matches(&self, object: &ObjectRef) -> bool {
        if self.include_extending {
            object.is_a(&self.alias)
        } else {
            object.alias().eq_ignore_ascii_case(&self.alias)
        }
    }
}

/// Matches a page by membership in a page group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageGroupSelector(String);

impl PageGroupSelector {
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    pub fn matches(&self, page: &PageRef) -> bool {
        page.groups().iter().any(|g| self.0.eq_ignore_ascii_case(g))
    }
}

/// Matches a facade by alias or class path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacadeSelector(String);

impl FacadeSelector {
    pub fn new(alias_or_path: impl Into<String>) -> Self {
        Self(alias_or_path.into())
    }

    pub fn matches(&self, facade: &FacadeRef) -> bool {
        if self.0.eq_ignore_ascii_case(facade.alias()) {
            return true;
        }
        facade
            .class_path()
            .map(|p| self.0.eq_ignore_ascii_case(p))
            .unwrap_or(false)
    }
}

/// Matches an app by UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppSelector(Uuid);

impl AppSelector {
    pub fn new(uid: Uuid) -> Self {
        Self(uid)
    }

    pub fn uid(&self) -> Uuid {
        self.0
    }

    pub fn matches(&self, app_uid: Option<Uuid>) -> bool {
        app_uid == Some(self.0)
    }
}
