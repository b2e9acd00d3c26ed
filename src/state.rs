use crate::model::{PlanSpec, SubscriptionSpec};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Identity;
use gravitee::{PlanStatus, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory
pub const STATE_DIR_ENV: &str = "GRAVITEECTL_STATE_DIR";

// ============================================================================
// State Structures
// ============================================================================

/// Identities and last applied records of every managed resource
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GraviteeState {
    /// Plans by manifest key
    #[serde(default)]
    pub plans: BTreeMap<String, PlanState>,

    /// Subscriptions by manifest key
    #[serde(default)]
    pub subscriptions: BTreeMap<String, SubscriptionState>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Where the state is saved
    #[serde(skip)]
    path: PathBuf,
}

/// State of one plan
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlanState {
    pub api_id: String,
    pub id: String,

    /// Last observed status
    #[serde(default)]
    pub status: Option<PlanStatus>,

    /// Last record applied in full. Absent after a pass failed part-way.
    #[serde(default)]
    pub applied: Option<PlanSpec>,
}

/// State of one subscription
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub api_id: String,
    pub id: String,

    /// Plan reference as written in the manifest
    pub plan: String,

    /// Last observed status
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,

    /// Last record applied in full. Absent after a pass failed part-way.
    #[serde(default)]
    pub applied: Option<SubscriptionSpec>,
}

impl PlanState {
    pub fn identity(&self) -> Identity {
        Identity::new(self.api_id.clone(), self.id.clone())
    }
}

impl SubscriptionState {
    pub fn identity(&self) -> Identity {
        Identity::new(self.api_id.clone(), self.id.clone())
    }
}

impl Default for GraviteeState {
    fn default() -> Self {
        Self {
            plans: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            last_updated: Utc::now(),
            path: PathBuf::new(),
        }
    }
}

// ============================================================================
// GraviteeState Implementation
// ============================================================================

impl GraviteeState {
    /// Get the state directory path (~/.local/state/graviteectl)
    pub fn state_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".local").join("state").join("graviteectl"))
    }

    /// Get the state file path, honouring an explicit override
    pub fn state_file(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(p.to_path_buf()),
            None => Ok(Self::state_dir()?.join("state.toml")),
        }
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self {
                path: path.to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let mut state: GraviteeState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
        state.path = path.to_path_buf();

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Where this state is saved
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save state to disk
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create state directory: {}", dir.display())
            })?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(&self.path, &content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self) -> Result<()> {
        self.last_updated = Utc::now();
        self.save()
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Remote id of a plan managed under `key`
    pub fn plan_id(&self, key: &str) -> Option<&str> {
        self.plans.get(key).map(|p| p.id.as_str())
    }

    /// Whether any state is recorded
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty() && self.subscriptions.is_empty()
    }
}
