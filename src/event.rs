//! Authorization events emitted after a successful resolve.

use chrono::{DateTime, Utc};

/// Emitted by a point once access has been granted, before control returns
/// to the caller.
#[derive(Debug, Clone)]
pub struct AuthorizedEvent {
    /// Name of the point that granted access.
    pub point: String,
    pub username: String,
    pub anonymous: bool,
    /// Resource description as used in log and error messages.
    pub resource: String,
    /// Decision token of the combined result, e.g. `Permit` or
    /// `NotApplicable` when the point's default effect let the request pass.
    pub decision: String,
    pub timestamp: DateTime<Utc>,
}

/// Observer notified of granted authorizations. Listeners run synchronously
/// on the authorizing thread and should return quickly.
pub trait AuthorizationListener: Send + Sync {
    fn on_authorized(&self, event: &AuthorizedEvent);
}

impl<F> AuthorizationListener for F
where
    F: Fn(&AuthorizedEvent) + Send + Sync,
{
    fn on_authorized(&self, event: &AuthorizedEvent) {
        self(event)
    }
}
