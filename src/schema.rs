//! Manifest schema: the declared plans and subscriptions.
//!
//! Loading validates the manifest and normalises empty optional values to
//! "not declared", so that what is remembered as applied compares equal to
//! what is later read back from the remote.

use crate::model::{ConsumerConfigurationSpec, PlanSpec, SubscriptionSpec};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default manifest file name, looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "gravitee.toml";

// ============================================================================
// Main Manifest Schema
// ============================================================================

/// The graviteectl manifest
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// Connection settings, overridable from the command line
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Plans by manifest key
    #[serde(default)]
    pub plans: BTreeMap<String, ManifestPlan>,

    /// Subscriptions by manifest key
    #[serde(default)]
    pub subscriptions: BTreeMap<String, ManifestSubscription>,
}

impl Manifest {
    /// Load, validate and normalise a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Parse, validate and normalise manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let mut manifest: Self = toml::from_str(content).context("Invalid TOML format")?;
        manifest.validate()?;
        manifest.normalize();
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<()> {
        for (key, plan) in &self.plans {
            plan.validate()
                .with_context(|| format!("Invalid plan '{}'", key))?;
        }

        for (key, subscription) in &self.subscriptions {
            subscription
                .validate()
                .with_context(|| format!("Invalid subscription '{}'", key))?;
        }

        Ok(())
    }

    /// Drop empty optional values so they count as not declared
    pub fn normalize(&mut self) {
        for plan in self.plans.values_mut() {
            plan.normalize();
        }
        for subscription in self.subscriptions.values_mut() {
            subscription.normalize();
        }
    }

    /// Whether `reference` names a plan of this manifest
    pub fn is_plan_key(&self, reference: &str) -> bool {
        self.plans.contains_key(reference)
    }
}

// ============================================================================
// Provider
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    /// Base URL of the management service
    #[serde(default)]
    pub management_url: Option<String>,

    /// Environment id (DEFAULT when unset)
    #[serde(default)]
    pub environment: Option<String>,

    /// Per-request timeout in seconds (300 when unset)
    #[serde(default)]
    pub timeout: Option<u64>,
}

// ============================================================================
// Plans
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManifestPlan {
    /// API the plan belongs to
    pub api_id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub definition_version: String,

    pub security_type: String,

    pub mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,

    /// Publish after create and after contract changes
    #[serde(default = "default_true")]
    pub auto_publish: bool,
}

impl ManifestPlan {
    /// Manifest entry for an existing plan
    pub fn from_spec(api_id: &str, spec: &PlanSpec) -> Self {
        Self {
            api_id: api_id.to_string(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            definition_version: spec.definition_version.clone(),
            security_type: spec.security_type.clone(),
            mode: spec.mode.clone(),
            characteristics: spec.characteristics.clone(),
            validation: spec.validation.clone(),
            auto_publish: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require("api_id", &self.api_id)?;
        require("name", &self.name)?;
        require("definition_version", &self.definition_version)?;
        require("security_type", &self.security_type)?;
        require("mode", &self.mode)?;
        Ok(())
    }

    fn normalize(&mut self) {
        self.characteristics = self.characteristics.take().filter(|c| !c.is_empty());
        self.validation = self.validation.take().filter(|v| !v.is_empty());
    }

    /// Desired record of this plan
    pub fn to_spec(&self) -> PlanSpec {
        PlanSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            definition_version: self.definition_version.clone(),
            mode: self.mode.clone(),
            security_type: self.security_type.clone(),
            characteristics: self.characteristics.clone(),
            validation: self.validation.clone(),
        }
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManifestSubscription {
    /// API the subscription belongs to
    pub api_id: String,

    pub application_id: String,

    /// Manifest plan key, or a remote plan id
    pub plan: String,

    /// Accept after create and after transfers
    #[serde(default = "default_true")]
    pub auto_validate: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_configuration: Option<ConsumerConfigurationSpec>,
}

impl ManifestSubscription {
    /// Manifest entry for an existing subscription
    pub fn from_spec(api_id: &str, plan: &str, spec: &SubscriptionSpec) -> Self {
        Self {
            api_id: api_id.to_string(),
            application_id: spec.application_id.clone(),
            plan: plan.to_string(),
            auto_validate: true,
            metadata: spec.metadata.clone(),
            consumer_configuration: spec.consumer_configuration.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require("api_id", &self.api_id)?;
        require("application_id", &self.application_id)?;
        require("plan", &self.plan)?;

        if let Some(consumer) = &self.consumer_configuration {
            require("consumer_configuration.entrypoint_id", &consumer.entrypoint_id)?;
            if let Some(entrypoint) = &consumer.entrypoint_configuration {
                require(
                    "consumer_configuration.entrypoint_configuration.callback_url",
                    &entrypoint.callback_url,
                )?;
                if entrypoint.headers.iter().any(|h| h.name.is_empty()) {
                    anyhow::bail!("Header name cannot be empty");
                }
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.metadata = self.metadata.take().filter(|m| !m.is_empty());
        if let Some(consumer) = &mut self.consumer_configuration {
            consumer.channel = consumer.channel.take().filter(|c| !c.is_empty());
        }
    }

    /// Desired record of this subscription, given its resolved plan id
    pub fn to_spec(&self, plan_id: &str) -> SubscriptionSpec {
        SubscriptionSpec {
            plan_id: plan_id.to_string(),
            application_id: self.application_id.clone(),
            consumer_configuration: self.consumer_configuration.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("'{}' cannot be empty", field);
    }
    Ok(())
}

fn default_true() -> bool {
    true
}
