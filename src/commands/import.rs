//! `import` - bring existing remote resources under management

use anyhow::{Context as AnyhowContext, Result};
use declarative::{Identity, Resource};
use serde::Serialize;
use std::collections::BTreeMap;

use super::Session;
use crate::Context;
use crate::reconcile::{PlanReconciler, SubscriptionReconciler};
use crate::schema::{ManifestPlan, ManifestSubscription};
use crate::state::{GraviteeState, PlanState, SubscriptionState};
use crate::ui;
use gravitee::{Client, SubscriptionStatus};

pub fn plan(ctx: &Context, key: &str, api_id: &str, id: &str) -> Result<()> {
    let mut session = Session::open(ctx, false)?;
    let entry = import_plan(&session.client, &mut session.state, key, api_id, id)?;
    session.state.touch()?;

    ui::success(&format!("Imported plan {} as plans.{}", id, key));
    print_snippet("plans", key, &entry)
}

pub fn subscription(ctx: &Context, key: &str, api_id: &str, id: &str) -> Result<()> {
    let mut session = Session::open(ctx, false)?;
    let entry = import_subscription(&session.client, &mut session.state, key, api_id, id)?;
    session.state.touch()?;

    ui::success(&format!("Imported subscription {} as subscriptions.{}", id, key));
    print_snippet("subscriptions", key, &entry)
}

/// Record a remote plan in the state; returns its manifest entry
fn import_plan(
    client: &Client,
    state: &mut GraviteeState,
    key: &str,
    api_id: &str,
    id: &str,
) -> Result<ManifestPlan> {
    if let Some(existing) = state.plans.get(key) {
        anyhow::bail!("plans.{} is already managed (id {})", key, existing.id);
    }

    let observed = PlanReconciler::new(client, true)
        .read(&Identity::new(api_id, id))
        .with_context(|| format!("Could not read plan {}", id))?
        .with_context(|| format!("Plan {} not found on API {}", id, api_id))?;

    let entry = ManifestPlan::from_spec(api_id, &observed.record);
    state.plans.insert(
        key.to_string(),
        PlanState {
            api_id: api_id.to_string(),
            id: observed.id,
            status: observed.status,
            applied: Some(observed.record),
        },
    );
    Ok(entry)
}

/// Record a remote subscription in the state; returns its manifest entry.
///
/// The plan reference is the key of a managed plan with the same id, or the
/// plan id itself.
fn import_subscription(
    client: &Client,
    state: &mut GraviteeState,
    key: &str,
    api_id: &str,
    id: &str,
) -> Result<ManifestSubscription> {
    if let Some(existing) = state.subscriptions.get(key) {
        anyhow::bail!(
            "subscriptions.{} is already managed (id {})",
            key,
            existing.id
        );
    }

    let observed = SubscriptionReconciler::new(client, true)
        .read(&Identity::new(api_id, id))
        .with_context(|| format!("Could not read subscription {}", id))?
        .with_context(|| format!("Subscription {} not found on API {}", id, api_id))?;
    if observed.status == Some(SubscriptionStatus::Closed) {
        anyhow::bail!("Subscription {} is closed", id);
    }

    let plan = state
        .plans
        .iter()
        .find(|(_, p)| p.api_id == api_id && p.id == observed.record.plan_id)
        .map(|(plan_key, _)| plan_key.clone())
        .unwrap_or_else(|| observed.record.plan_id.clone());

    let entry = ManifestSubscription::from_spec(api_id, &plan, &observed.record);
    state.subscriptions.insert(
        key.to_string(),
        SubscriptionState {
            api_id: api_id.to_string(),
            id: observed.id,
            plan,
            status: observed.status,
            applied: Some(observed.record),
        },
    );
    Ok(entry)
}

/// Render `[section.key]` as it would appear in the manifest
fn snippet<T: Serialize>(section: &str, key: &str, entry: &T) -> Result<String> {
    let table = BTreeMap::from([(section, BTreeMap::from([(key, entry)]))]);
    toml::to_string_pretty(&table).context("Failed to render manifest entry")
}

fn print_snippet<T: Serialize>(section: &str, key: &str, entry: &T) -> Result<()> {
    println!();
    ui::dim("Add this to the manifest:");
    println!();
    println!("{}", snippet(section, key, entry)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper;
    use crate::model::fixtures::{gold, subscription, webhook};
    use crate::model::SubscriptionSpec;
    use crate::schema::Manifest;
    use gravitee::MockBackend;

    fn setup() -> (MockBackend, Client) {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone()));
        (mock, client)
    }

    #[test]
    fn test_import_plan_records_state() {
        let (mock, client) = setup();
        let id = mock.insert_plan("api-1", mapper::plan::to_create(&gold()));
        let mut state = GraviteeState::default();

        let entry = import_plan(&client, &mut state, "gold", "api-1", &id).unwrap();

        assert_eq!(entry.to_spec(), gold());
        let recorded = &state.plans["gold"];
        assert_eq!(recorded.id, id);
        assert_eq!(recorded.applied, Some(gold()));
    }

    #[test]
    fn test_import_refuses_managed_key() {
        let (mock, client) = setup();
        let id = mock.insert_plan("api-1", mapper::plan::to_create(&gold()));
        let mut state = GraviteeState::default();
        import_plan(&client, &mut state, "gold", "api-1", &id).unwrap();

        let err = import_plan(&client, &mut state, "gold", "api-1", &id).unwrap_err();
        assert!(err.to_string().contains("already managed"));
    }

    #[test]
    fn test_import_missing_plan() {
        let (_mock, client) = setup();
        let mut state = GraviteeState::default();

        let err = import_plan(&client, &mut state, "gold", "api-1", "nope").unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_import_subscription_links_managed_plan() {
        let (mock, client) = setup();
        let plan_id = mock.insert_plan("api-1", mapper::plan::to_create(&gold()));
        let spec = SubscriptionSpec {
            consumer_configuration: Some(webhook()),
            ..subscription(&plan_id)
        };
        let sub_id = mock.insert_subscription("api-1", mapper::subscription::to_create(&spec));
        let mut state = GraviteeState::default();
        import_plan(&client, &mut state, "gold", "api-1", &plan_id).unwrap();

        let entry = import_subscription(&client, &mut state, "acme", "api-1", &sub_id).unwrap();

        assert_eq!(entry.plan, "gold");
        assert_eq!(state.subscriptions["acme"].plan, "gold");
        assert_eq!(entry.to_spec(&plan_id), spec);
    }

    #[test]
    fn test_import_subscription_unmanaged_plan_uses_id() {
        let (mock, client) = setup();
        let sub_id = mock.insert_subscription(
            "api-1",
            mapper::subscription::to_create(&subscription("plan-77")),
        );
        let mut state = GraviteeState::default();

        let entry = import_subscription(&client, &mut state, "acme", "api-1", &sub_id).unwrap();

        assert_eq!(entry.plan, "plan-77");
    }

    #[test]
    fn test_snippet_parses_back() {
        let entry = ManifestSubscription::from_spec(
            "api-1",
            "gold",
            &SubscriptionSpec {
                consumer_configuration: Some(webhook()),
                ..subscription("plan-1")
            },
        );

        let text = snippet("subscriptions", "acme", &entry).unwrap();
        let manifest = Manifest::parse(&text).unwrap();

        assert_eq!(manifest.subscriptions["acme"], entry);
    }
}
