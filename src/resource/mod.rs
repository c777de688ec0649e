//! Resource views: the per-kind slices of the host framework's model that
//! the engine authorizes.
//!
//! The metamodel, data sheets, pages and facades live outside this crate.
//! Each view here carries exactly the attributes policy targets and
//! conditions can match against, nothing more.

use crate::condition::ConditionGroup;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// A meta object, identified by alias, with its inheritance line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    alias: String,
    app_uid: Option<Uuid>,
    parents: Vec<String>,
}

impl ObjectRef {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            app_uid: None,
            parents: Vec::new(),
        }
    }

    pub fn with_app(mut self, app_uid: Uuid) -> Self {
        self.app_uid = Some(app_uid);
        self
    }

    pub fn with_parent(mut self, parent_alias: impl Into<String>) -> Self {
        self.parents.push(parent_alias.into());
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn app_uid(&self) -> Option<Uuid> {
        self.app_uid
    }

    /// True when this object is the given object or extends it.
    pub fn is_a(&self, alias: &str) -> bool {
        self.alias.eq_ignore_ascii_case(alias)
            || self.parents.iter().any(|p| p.eq_ignore_ascii_case(alias))
    }
}

/// Built-in action families that are exempt from trigger-widget matching:
/// showing a widget and reading its prefill are how any widget is opened in
/// the first place, so no widget "defines" them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    ShowWidget,
    ReadPrefill,
    #[default]
    Other,
}

/// An action, possibly a chain wrapping nested sub-actions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionRef {
    alias: String,
    prototype_path: Option<String>,
    app_uid: Option<Uuid>,
    kind: ActionKind,
    object: Option<ObjectRef>,
    sub_actions: Vec<ActionRef>,
}

impl ActionRef {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Default::default()
        }
    }

    pub fn with_prototype_path(mut self, path: impl Into<String>) -> Self {
        self.prototype_path = Some(path.into());
        self
    }

    pub fn with_app(mut self, app_uid: Uuid) -> Self {
        self.app_uid = Some(app_uid);
        self
    }

    pub fn with_kind(mut self, kind: ActionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_object(mut self, object: ObjectRef) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_sub_action(mut self, action: ActionRef) -> Self {
        self.sub_actions.push(action);
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn prototype_path(&self) -> Option<&str> {
        self.prototype_path.as_deref()
    }

    pub fn app_uid(&self) -> Option<Uuid> {
        self.app_uid
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn object(&self) -> Option<&ObjectRef> {
        self.object.as_ref()
    }

    pub fn sub_actions(&self) -> &[ActionRef] {
        &self.sub_actions
    }

    fn same_action(&self, other: &ActionRef) -> bool {
        self.alias.eq_ignore_ascii_case(&other.alias)
    }

    /// True when `other` is this action or any transitively nested
    /// sub-action of it (action chains).
    pub fn chain_contains(&self, other: &ActionRef) -> bool {
        self.same_action(other) || self.sub_actions.iter().any(|a| a.chain_contains(other))
    }
}

/// The widget an action was triggered from and the action that widget is
/// configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRef {
    id: String,
    action: Option<ActionRef>,
}

impl WidgetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: ActionRef) -> Self {
        self.action = Some(action);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn action(&self) -> Option<&ActionRef> {
        self.action.as_ref()
    }
}

/// A page (menu item) with its publication state and group memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    alias: String,
    app_uid: Option<Uuid>,
    published: bool,
    groups: Vec<String>,
}

impl PageRef {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            app_uid: None,
            published: true,
            groups: Vec::new(),
        }
    }

    pub fn with_app(mut self, app_uid: Uuid) -> Self {
        self.app_uid = Some(app_uid);
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    pub fn with_group(mut self, group_alias: impl Into<String>) -> Self {
        self.groups.push(group_alias.into());
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn app_uid(&self) -> Option<Uuid> {
        self.app_uid
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}

/// A facade (transport adapter) identified by alias or class path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeRef {
    alias: String,
    class_path: Option<String>,
}

impl FacadeRef {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            class_path: None,
        }
    }

    pub fn with_class_path(mut self, path: impl Into<String>) -> Self {
        self.class_path = Some(path.into());
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn class_path(&self) -> Option<&str> {
        self.class_path.as_deref()
    }
}

/// The task context an action runs in: where it came from and what triggered
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskInfo {
    http: bool,
    command_line: bool,
    scheduler: bool,
    facade: Option<FacadeRef>,
    page: Option<PageRef>,
    trigger_widget: Option<WidgetRef>,
}

impl TaskInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn via_http(mut self) -> Self {
        self.http = true;
        self
    }

    pub fn via_command_line(mut self) -> Self {
        self.command_line = true;
        self
    }

    pub fn via_scheduler(mut self) -> Self {
        self.scheduler = true;
        self
    }

    pub fn with_facade(mut self, facade: FacadeRef) -> Self {
        self.facade = Some(facade);
        self
    }

    pub fn with_page(mut self, page: PageRef) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_trigger_widget(mut self, widget: WidgetRef) -> Self {
        self.trigger_widget = Some(widget);
        self
    }

    pub fn is_http(&self) -> bool {
        self.http
    }

    pub fn is_command_line(&self) -> bool {
        self.command_line
    }

    pub fn is_scheduler(&self) -> bool {
        self.scheduler
    }

    pub fn facade(&self) -> Option<&FacadeRef> {
        self.facade.as_ref()
    }

    pub fn page(&self) -> Option<&PageRef> {
        self.page.as_ref()
    }

    pub fn trigger_widget(&self) -> Option<&WidgetRef> {
        self.trigger_widget.as_ref()
    }
}

/// Resource of the action authorization point: an action about to run plus
/// the task it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: ActionRef,
    pub task: Option<TaskInfo>,
}

impl ActionRequest {
    pub fn new(action: ActionRef) -> Self {
        Self { action, task: None }
    }

    pub fn with_task(mut self, task: TaskInfo) -> Self {
        self.task = Some(task);
        self
    }
}

/// CRUD operation tag of a data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOperation {
    Read,
    Create,
    Update,
    Delete,
}

/// Resource of the data authorization point: a data sheet operation with the
/// filters the caller already specified. Filter obligations are merged into
/// `filters` by the point.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub object: ObjectRef,
    pub operation: DataOperation,
    pub filters: Option<ConditionGroup>,
}

impl DataRequest {
    pub fn new(object: ObjectRef, operation: DataOperation) -> Self {
        Self {
            object,
            operation,
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: ConditionGroup) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Resource of the HTTP request authorization point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestResource {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<String>,
    /// Address of the peer the request arrived from (the socket peer).
    pub peer_ip: Option<IpAddr>,
    /// `X-Forwarded-For` chain, nearest proxy last.
    pub forwarded_for: Vec<IpAddr>,
    pub facade: Option<FacadeRef>,
}

impl HttpRequestResource {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            body: None,
            peer_ip: None,
            forwarded_for: Vec::new(),
            facade: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_peer_ip(mut self, ip: IpAddr) -> Self {
        self.peer_ip = Some(ip);
        self
    }

    pub fn with_forwarded_for<I: IntoIterator<Item = IpAddr>>(mut self, ips: I) -> Self {
        self.forwarded_for.extend(ips);
        self
    }

    pub fn with_facade(mut self, facade: FacadeRef) -> Self {
        self.facade = Some(facade);
        self
    }
}

/// Resource of the command line authorization point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub command: String,
    pub facade: Option<FacadeRef>,
}

impl CliCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            facade: None,
        }
    }

    pub fn with_facade(mut self, facade: FacadeRef) -> Self {
        self.facade = Some(facade);
        self
    }
}

/// Resource of the context authorization point: a session or application
/// context object identified by alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRef {
    pub alias: String,
}

impl ContextRef {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }
}

/// Resource of points that need no kind-specific conditions: whichever of
/// the common attributes the caller can supply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenericRequest {
    pub action: Option<ActionRef>,
    pub object: Option<ObjectRef>,
    pub page: Option<PageRef>,
    pub facade: Option<FacadeRef>,
}

impl GenericRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: ActionRef) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_object(mut self, object: ObjectRef) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_page(mut self, page: PageRef) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_facade(mut self, facade: FacadeRef) -> Self {
        self.facade = Some(facade);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_is_a() {
        let object = ObjectRef::new("my.App.SPECIAL_ORDER").with_parent("my.App.ORDER");
        assert!(object.is_a("my.app.special_order"));
        assert!(object.is_a("my.App.ORDER"));
        assert!(!object.is_a("my.App.CUSTOMER"));
    }

    #[test]
    fn test_chain_contains_nested_sub_actions() {
        let inner = ActionRef::new("my.App.SendMail");
        let chain = ActionRef::new("my.App.SaveAndNotify")
            .with_sub_action(ActionRef::new("my.App.SaveOrder").with_sub_action(inner.clone()));

        assert!(chain.chain_contains(&chain));
        assert!(chain.chain_contains(&ActionRef::new("my.App.SaveOrder")));
        assert!(chain.chain_contains(&inner));
        assert!(!chain.chain_contains(&ActionRef::new("my.App.DeleteOrder")));
    }

    #[test]
    fn test_task_origin_flags_independent() {
        let task = TaskInfo::new().via_http().via_scheduler();
        assert!(task.is_http());
        assert!(task.is_scheduler());
        assert!(!task.is_command_line());
    }
}
