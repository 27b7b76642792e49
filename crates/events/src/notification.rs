use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docflow_core::{DocumentId, DocumentKind, TenantId, UserId};

use crate::Event;

/// Notification: a document moved from one status to another.
///
/// Published after the new status has been persisted. Consumers (alerting,
/// email, webhooks) live outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub notification_id: Uuid,
    pub tenant_id: TenantId,
    pub kind: DocumentKind,
    pub document_id: DocumentId,
    pub number: String,
    /// `None` when the document was just created in its initial status.
    pub old_status: Option<String>,
    pub new_status: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl StatusChanged {
    pub fn is_creation(&self) -> bool {
        self.old_status.is_none()
    }
}

impl Event for StatusChanged {
    fn event_type(&self) -> &'static str {
        "documents.status_changed"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
