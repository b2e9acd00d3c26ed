//! Typed desired-state records.
//!
//! These are what the user declares (via the manifest) and what the state
//! file remembers as "last applied". Observed records have the same shape,
//! derived from the remote representation, plus the remote-owned fields.

use declarative::{Diff, FieldChange, push_change, push_optional_change};
use gravitee::{PlanStatus, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Plans
// ============================================================================

/// Desired state of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub definition_version: String,
    pub mode: String,
    pub security_type: String,
    /// Absent and empty are different: absent is never sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

impl PlanSpec {
    /// Fields whose change makes a published plan need publishing again.
    pub const REPUBLISH_FIELDS: [&'static str; 5] = [
        "name",
        "description",
        "security_type",
        "mode",
        "characteristics",
    ];

    /// Whether going from `self` to `other` touches the plan's visible contract.
    pub fn needs_republish(&self, other: &Self) -> bool {
        self.changed_fields(other)
            .iter()
            .any(|f| Self::REPUBLISH_FIELDS.contains(&f.as_str()))
    }
}

impl Diff for PlanSpec {
    fn diff(&self, other: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        push_change(&mut changes, "name", &self.name, &other.name);
        push_change(&mut changes, "description", &self.description, &other.description);
        push_change(
            &mut changes,
            "definition_version",
            &self.definition_version,
            &other.definition_version,
        );
        push_change(&mut changes, "mode", &self.mode, &other.mode);
        push_change(
            &mut changes,
            "security_type",
            &self.security_type,
            &other.security_type,
        );
        push_optional_change(
            &mut changes,
            "characteristics",
            self.characteristics.as_ref(),
            other.characteristics.as_ref(),
        );
        push_optional_change(
            &mut changes,
            "validation",
            self.validation.as_ref(),
            other.validation.as_ref(),
        );
        changes
    }
}

/// A plan as read back from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedPlan {
    pub id: String,
    pub status: Option<PlanStatus>,
    pub record: PlanSpec,
}

// ============================================================================
// Subscriptions
// ============================================================================

/// A header sent with push deliveries. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSpec {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrypointConfigurationSpec {
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfigurationSpec {
    pub entrypoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint_configuration: Option<EntrypointConfigurationSpec>,
}

/// Desired state of a subscription.
///
/// `plan_id` here is always a resolved remote id; manifest plan keys are
/// resolved before a record is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    pub plan_id: String,
    pub application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_configuration: Option<ConsumerConfigurationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl SubscriptionSpec {
    /// Whether the consumer configuration or metadata differ.
    pub fn needs_update(&self, other: &Self) -> bool {
        self.consumer_configuration != other.consumer_configuration
            || self.metadata != other.metadata
    }

    /// Whether the subscription must move to another plan.
    pub fn needs_transfer(&self, other: &Self) -> bool {
        self.plan_id != other.plan_id
    }
}

impl Diff for SubscriptionSpec {
    fn diff(&self, other: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        push_change(&mut changes, "plan_id", &self.plan_id, &other.plan_id);
        push_change(
            &mut changes,
            "application_id",
            &self.application_id,
            &other.application_id,
        );
        push_optional_change(
            &mut changes,
            "consumer_configuration",
            self.consumer_configuration.as_ref(),
            other.consumer_configuration.as_ref(),
        );
        push_optional_change(
            &mut changes,
            "metadata",
            self.metadata.as_ref(),
            other.metadata.as_ref(),
        );
        changes
    }
}

/// A subscription as read back from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedSubscription {
    pub id: String,
    pub status: Option<SubscriptionStatus>,
    pub record: SubscriptionSpec,
}
