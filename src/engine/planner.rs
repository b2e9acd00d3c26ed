//! Execution planner - orders manifest and state entries into phases
//!
//! Plans are created and updated first so subscriptions can reference them,
//! and removed last so their subscriptions are closed before them.

use crate::model::{PlanSpec, SubscriptionSpec};
use crate::schema::{Manifest, ManifestPlan, ManifestSubscription};
use crate::state::{GraviteeState, PlanState, SubscriptionState};
use declarative::{ExecutionPlan, Identity, Targetable};
use std::collections::BTreeSet;

pub const PLANS_PHASE: &str = "plans";
pub const SUBSCRIPTIONS_PHASE: &str = "subscriptions";
pub const PLAN_DELETIONS_PHASE: &str = "plan deletions";

/// A plan known to the manifest, the state, or both
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub key: String,
    pub declared: Option<ManifestPlan>,
    pub state: Option<PlanState>,
}

/// A subscription known to the manifest, the state, or both
#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    pub key: String,
    pub declared: Option<ManifestSubscription>,
    pub state: Option<SubscriptionState>,
}

#[derive(Debug, Clone)]
pub enum Entry {
    Plan(PlanEntry),
    Subscription(SubscriptionEntry),
}

impl Targetable for Entry {
    fn id(&self) -> &str {
        match self {
            Entry::Plan(e) => &e.key,
            Entry::Subscription(e) => &e.key,
        }
    }

    fn resource_type(&self) -> &'static str {
        match self {
            Entry::Plan(_) => "plan",
            Entry::Subscription(_) => "subscription",
        }
    }
}

impl Entry {
    /// Display name, e.g. `plans.gold`
    pub fn address(&self) -> String {
        format!("{}s.{}", self.resource_type(), self.id())
    }
}

impl PlanEntry {
    pub fn identity(&self) -> Option<Identity> {
        self.state.as_ref().map(PlanState::identity)
    }

    pub fn previous(&self) -> Option<&PlanSpec> {
        self.state.as_ref().and_then(|s| s.applied.as_ref())
    }

    pub fn desired(&self) -> Option<PlanSpec> {
        self.declared.as_ref().map(ManifestPlan::to_spec)
    }

    pub fn auto_publish(&self) -> bool {
        self.declared.as_ref().is_none_or(|d| d.auto_publish)
    }
}

impl SubscriptionEntry {
    pub fn identity(&self) -> Option<Identity> {
        self.state.as_ref().map(SubscriptionState::identity)
    }

    pub fn previous(&self) -> Option<&SubscriptionSpec> {
        self.state.as_ref().and_then(|s| s.applied.as_ref())
    }

    pub fn desired(&self, plan_id: &str) -> Option<SubscriptionSpec> {
        self.declared.as_ref().map(|d| d.to_spec(plan_id))
    }

    pub fn auto_validate(&self) -> bool {
        self.declared.as_ref().is_none_or(|d| d.auto_validate)
    }
}

/// Build the ordered plan for every manifest and state entry
pub fn build(manifest: &Manifest, state: &GraviteeState) -> ExecutionPlan<Entry> {
    let mut plan = ExecutionPlan::new();

    let declared_plans = manifest
        .plans
        .iter()
        .map(|(key, declared)| {
            Entry::Plan(PlanEntry {
                key: key.clone(),
                declared: Some(declared.clone()),
                state: state.plans.get(key).cloned(),
            })
        })
        .collect();
    plan.push_phase(PLANS_PHASE, declared_plans);

    let subscription_keys: BTreeSet<&String> = manifest
        .subscriptions
        .keys()
        .chain(state.subscriptions.keys())
        .collect();
    let subscriptions = subscription_keys
        .into_iter()
        .map(|key| {
            Entry::Subscription(SubscriptionEntry {
                key: key.clone(),
                declared: manifest.subscriptions.get(key).cloned(),
                state: state.subscriptions.get(key).cloned(),
            })
        })
        .collect();
    plan.push_phase(SUBSCRIPTIONS_PHASE, subscriptions);

    let removed_plans = state
        .plans
        .iter()
        .filter(|(key, _)| !manifest.plans.contains_key(*key))
        .map(|(key, plan_state)| {
            Entry::Plan(PlanEntry {
                key: key.clone(),
                declared: None,
                state: Some(plan_state.clone()),
            })
        })
        .collect();
    plan.push_phase(PLAN_DELETIONS_PHASE, removed_plans);

    plan
}

/// Remote id a subscription's plan reference points to.
///
/// A manifest plan key resolves through the state and is `None` until that
/// plan has been created; anything else is taken as a remote plan id.
pub fn resolve_plan_id(
    manifest: &Manifest,
    state: &GraviteeState,
    reference: &str,
) -> Option<String> {
    if manifest.is_plan_key(reference) {
        state.plan_id(reference).map(ToString::to_string)
    } else {
        Some(reference.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::gold;

    fn manifest() -> Manifest {
        Manifest::parse(
            r#"
[plans.gold]
api_id = "api-1"
name = "Gold"
definition_version = "V4"
security_type = "KEY_LESS"
mode = "STANDARD"

[subscriptions.acme]
api_id = "api-1"
application_id = "app-1"
plan = "gold"

[subscriptions.external]
api_id = "api-1"
application_id = "app-2"
plan = "remote-plan"
"#,
        )
        .unwrap()
    }

    fn plan_state(id: &str) -> PlanState {
        PlanState {
            api_id: "api-1".to_string(),
            id: id.to_string(),
            status: None,
            applied: Some(gold()),
        }
    }

    fn names(plan: &ExecutionPlan<Entry>) -> Vec<(&'static str, Vec<String>)> {
        plan.phases
            .iter()
            .map(|p| (p.name, p.entries.iter().map(Entry::address).collect()))
            .collect()
    }

    #[test]
    fn test_phase_order() {
        let mut state = GraviteeState::default();
        state.plans.insert("old".to_string(), plan_state("plan-9"));
        state.subscriptions.insert(
            "gone".to_string(),
            SubscriptionState {
                api_id: "api-1".to_string(),
                id: "sub-9".to_string(),
                plan: "old".to_string(),
                status: None,
                applied: None,
            },
        );

        let plan = build(&manifest(), &state);

        assert_eq!(
            names(&plan),
            vec![
                (PLANS_PHASE, vec!["plans.gold".to_string()]),
                (
                    SUBSCRIPTIONS_PHASE,
                    vec![
                        "subscriptions.acme".to_string(),
                        "subscriptions.external".to_string(),
                        "subscriptions.gone".to_string(),
                    ]
                ),
                (PLAN_DELETIONS_PHASE, vec!["plans.old".to_string()]),
            ]
        );
    }

    #[test]
    fn test_entries_carry_state() {
        let mut state = GraviteeState::default();
        state.plans.insert("gold".to_string(), plan_state("plan-1"));

        let plan = build(&manifest(), &state);

        let Some(Entry::Plan(gold)) = plan.entries().next() else {
            panic!("expected a plan entry first");
        };
        assert!(gold.declared.is_some());
        assert_eq!(gold.state.as_ref().map(|s| s.id.as_str()), Some("plan-1"));
    }

    #[test]
    fn test_filter_by_target() {
        let plan = build(&manifest(), &GraviteeState::default());

        let only_plans = plan.clone().filter_by_target(Some("plans"));
        assert_eq!(only_plans.total_entries(), 1);

        let one = plan.filter_by_target(Some("subscriptions.acme"));
        assert_eq!(one.total_entries(), 1);
        assert_eq!(one.entries().next().map(Entry::address).as_deref(), Some("subscriptions.acme"));
    }

    #[test]
    fn test_resolve_plan_reference() {
        let manifest = manifest();
        let mut state = GraviteeState::default();

        assert_eq!(resolve_plan_id(&manifest, &state, "gold"), None);
        assert_eq!(
            resolve_plan_id(&manifest, &state, "remote-plan").as_deref(),
            Some("remote-plan")
        );

        state.plans.insert("gold".to_string(), plan_state("plan-1"));
        assert_eq!(
            resolve_plan_id(&manifest, &state, "gold").as_deref(),
            Some("plan-1")
        );
    }
}
