//! Wire representations of Management API v2 resources.
//!
//! These mirror the JSON documents exchanged with the management service.
//! Field presence matters: optional sub-records are skipped when `None` so
//! the remote never receives an empty list or object that was not declared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Plans
// =============================================================================

/// Lifecycle status of a plan, owned by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Created but not yet visible to consumers.
    Staging,
    /// Published and open for subscriptions.
    Published,
    /// Still served but closed to new subscriptions.
    Deprecated,
    /// Closed for good.
    Closed,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl PlanStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "STAGING",
            Self::Published => "PUBLISHED",
            Self::Deprecated => "DEPRECATED",
            Self::Closed => "CLOSED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security block of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSecurity {
    /// Security type, e.g. `KEY_LESS`, `API_KEY`, `JWT`.
    #[serde(rename = "type")]
    pub security_type: String,
}

/// A plan as exchanged with the management API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition_version: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub security: Option<PlanSecurity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Lifecycle status of a subscription, owned by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Waiting for validation by the API publisher.
    Pending,
    /// Validated, traffic is allowed.
    Accepted,
    /// Temporarily suspended.
    Paused,
    /// Refused by the API publisher.
    Rejected,
    /// Closed for good.
    Closed,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Paused => "PAUSED",
            Self::Rejected => "REJECTED",
            Self::Closed => "CLOSED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{name, value}` header pair sent with push deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Entrypoint-specific settings of a push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointConfiguration {
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
}

/// Consumer side configuration of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerConfiguration {
    pub entrypoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint_configuration: Option<EntrypointConfiguration>,
}

/// A subscription as exchanged with the management API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_configuration: Option<ConsumerConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Body of a subscription update.
///
/// Only the mutable parts of a subscription travel in an update; plan and
/// application are changed through transfer or replacement. Both keys are
/// always serialized so that removing a block clears it remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdate {
    pub consumer_configuration: Option<ConsumerConfiguration>,
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Body of the `_accept` transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptSubscription {
    pub reason: String,
}

/// Body of the `_transfer` transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSubscription {
    #[serde(rename = "plan")]
    pub plan_id: String,
}

// =============================================================================
// APIs
// =============================================================================

/// Read-only view of an API definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Api {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub definition_version: Option<String>,
    /// `PROXY` or `MESSAGE`.
    #[serde(default, rename = "type")]
    pub api_type: Option<String>,
    /// `STARTED` or `STOPPED`.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deployed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_create_payload_omits_remote_fields() {
        let plan = Plan {
            name: "Gold".to_string(),
            description: Some(String::new()),
            definition_version: "V4".to_string(),
            mode: "STANDARD".to_string(),
            security: Some(PlanSecurity {
                security_type: "KEY_LESS".to_string(),
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Gold",
                "description": "",
                "definitionVersion": "V4",
                "mode": "STANDARD",
                "security": { "type": "KEY_LESS" }
            })
        );
    }

    #[test]
    fn test_plan_decodes_remote_document() {
        let plan: Plan = serde_json::from_value(json!({
            "id": "plan-1",
            "name": "Gold",
            "description": null,
            "definitionVersion": "V4",
            "mode": "STANDARD",
            "security": { "type": "API_KEY", "configuration": {} },
            "characteristics": ["fast"],
            "status": "PUBLISHED",
            "order": 1
        }))
        .unwrap();

        assert_eq!(plan.id.as_deref(), Some("plan-1"));
        assert_eq!(plan.description, None);
        assert_eq!(plan.status, Some(PlanStatus::Published));
        assert_eq!(
            plan.security.map(|s| s.security_type),
            Some("API_KEY".to_string())
        );
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let plan: Plan = serde_json::from_value(json!({ "status": "ARCHIVED" })).unwrap();
        assert_eq!(plan.status, Some(PlanStatus::Unknown));

        let sub: Subscription = serde_json::from_value(json!({ "status": "RESUMED" })).unwrap();
        assert_eq!(sub.status, Some(SubscriptionStatus::Unknown));
    }

    #[test]
    fn test_subscription_update_always_carries_both_keys() {
        let value = serde_json::to_value(SubscriptionUpdate::default()).unwrap();
        assert_eq!(
            value,
            json!({ "consumerConfiguration": null, "metadata": null })
        );
    }

    #[test]
    fn test_transfer_body_uses_plan_key() {
        let body = TransferSubscription {
            plan_id: "plan-2".to_string(),
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "plan": "plan-2" })
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PlanStatus::Staging.to_string(), "STAGING");
        assert_eq!(SubscriptionStatus::Accepted.to_string(), "ACCEPTED");
    }
}
