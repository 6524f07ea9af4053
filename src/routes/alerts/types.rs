use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entity::alerts::{self, Severity};

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertResponse {
    pub id: Uuid,
    /// Null for zone or system level alerts
    pub device_id: Option<Uuid>,
    pub severity: Severity,
    /// Rule that raised the alert, e.g. `offline`
    pub rule_category: String,
    pub message: String,
    pub is_acknowledged: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<alerts::Model> for AlertResponse {
    fn from(a: alerts::Model) -> Self {
        Self {
            id: a.id,
            device_id: a.device_id,
            severity: a.severity,
            rule_category: a.rule_category,
            message: a.message,
            is_acknowledged: a.is_acknowledged,
            created_at: a.created_at,
            resolved_at: a.resolved_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcknowledgeResponse {
    pub status: String,
    pub alert: AlertResponse,
}

/// Query parameters for the alerts list
#[derive(Debug, Deserialize, IntoParams)]
pub struct AlertsQuery {
    /// INFO, WARNING or CRITICAL
    pub severity: Option<Severity>,
    pub is_acknowledged: Option<bool>,
    /// Device code
    pub device: Option<String>,
    /// Only alerts that are not yet resolved
    pub open: Option<bool>,
}
