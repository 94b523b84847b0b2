use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Audit-trail entry describing who did what to which resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub metadata: BTreeMap<String, String>,
}

/// Outbound message for a marketplace participant (delivery is external).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub template: String,
    pub details: BTreeMap<String, String>,
}

/// Trait describing the audit and notification collaborators.
///
/// Both calls are fire-and-forget from the services' perspective: this core
/// guarantees the call is made, not delivery.
pub trait EventPublisher: Send + Sync {
    fn audit(&self, event: AuditEvent) -> Result<(), EventError>;
    fn notify(&self, notification: Notification) -> Result<(), EventError>;
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Emit an audit record without letting collaborator failures surface.
pub(crate) fn audit_best_effort<E: EventPublisher + ?Sized>(publisher: &E, event: AuditEvent) {
    if let Err(err) = publisher.audit(event) {
        tracing::warn!(error = %err, "audit publish failed");
    }
}

/// Send a notification without letting collaborator failures surface.
pub(crate) fn notify_best_effort<E: EventPublisher + ?Sized>(
    publisher: &E,
    notification: Notification,
) {
    if let Err(err) = publisher.notify(notification) {
        tracing::warn!(error = %err, "notification dispatch failed");
    }
}
