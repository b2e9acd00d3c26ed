//! `status` - drift between the last applied records and the remote

use anyhow::Result;
use colored::Colorize;
use declarative::{Diff, FieldChange, Identity, Resource};

use super::Session;
use crate::Context;
use crate::engine::{self, planner::Entry};
use crate::model::{ObservedPlan, ObservedSubscription};
use crate::reconcile::{PlanReconciler, StepError, SubscriptionReconciler};
use crate::ui;

/// What a read found compared to the last applied record
#[derive(Debug)]
enum Drift {
    InSync,
    Changed(Vec<FieldChange>),
    /// An earlier apply stopped part-way; nothing to compare against
    Incomplete,
    Gone,
    Unreadable(StepError),
}

#[derive(Debug)]
struct Check {
    drift: Drift,
    status: Option<String>,
}

#[derive(Debug, Default)]
struct Tally {
    in_sync: usize,
    drifted: usize,
    missing: usize,
    errors: usize,
}

impl Tally {
    fn add(&mut self, drift: &Drift) {
        match drift {
            Drift::InSync => self.in_sync += 1,
            Drift::Changed(_) | Drift::Incomplete => self.drifted += 1,
            Drift::Gone => self.missing += 1,
            Drift::Unreadable(_) => self.errors += 1,
        }
    }
}

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx, false)?;
    let plan = engine::build(&session.manifest, &session.state).filter_by_target(target);

    ui::header("Drift Status");

    let mut tally = Tally::default();
    let mut section = None;

    for entry in plan.entries() {
        let (kind, key, check) = match entry {
            Entry::Plan(e) => {
                let Some(state) = &e.state else {
                    continue;
                };
                let reconciler = PlanReconciler::new(&session.client, true);
                let check = check(
                    &reconciler,
                    &state.identity(),
                    state.applied.as_ref(),
                    |o: &ObservedPlan| (&o.record, o.status.map(|s| s.to_string())),
                );
                ("Plans", &e.key, check)
            }
            Entry::Subscription(e) => {
                let Some(state) = &e.state else {
                    continue;
                };
                let reconciler = SubscriptionReconciler::new(&session.client, true);
                let check = check(
                    &reconciler,
                    &state.identity(),
                    state.applied.as_ref(),
                    |o: &ObservedSubscription| (&o.record, o.status.map(|s| s.to_string())),
                );
                ("Subscriptions", &e.key, check)
            }
        };

        if section != Some(kind) {
            ui::section(kind);
            section = Some(kind);
        }
        print_check(key, &check);
        tally.add(&check.drift);
    }

    print_declared_only(&session);

    println!();
    if tally.in_sync + tally.drifted + tally.missing + tally.errors == 0 {
        ui::info("No managed resources");
        return Ok(());
    }
    ui::kv(
        "Summary",
        &format!(
            "{} in sync, {} drifted, {} missing, {} unreadable",
            tally.in_sync.to_string().green(),
            tally.drifted.to_string().yellow(),
            tally.missing.to_string().red(),
            tally.errors
        ),
    );

    if tally.errors > 0 {
        anyhow::bail!("{} resource(s) could not be read", tally.errors);
    }
    Ok(())
}

/// Read one resource and compare it to what was last applied
fn check<R, F>(
    reconciler: &R,
    identity: &Identity,
    applied: Option<&R::Desired>,
    split: F,
) -> Check
where
    R: Resource<Error = StepError>,
    R::Desired: Diff,
    F: Fn(&R::Observed) -> (&R::Desired, Option<String>),
{
    let observed = match reconciler.read(identity) {
        Ok(Some(observed)) => observed,
        Ok(None) => {
            return Check {
                drift: Drift::Gone,
                status: None,
            };
        }
        Err(e) => {
            return Check {
                drift: Drift::Unreadable(e),
                status: None,
            };
        }
    };

    let (record, status) = split(&observed);
    let drift = match applied {
        None => Drift::Incomplete,
        Some(applied) => {
            let changes = applied.diff(record);
            if changes.is_empty() {
                Drift::InSync
            } else {
                Drift::Changed(changes)
            }
        }
    };
    Check { drift, status }
}

fn print_check(key: &str, check: &Check) {
    let status = check.status.as_deref().unwrap_or("").dimmed();
    match &check.drift {
        Drift::InSync => println!("  {} {:<24} {}", "✓".green(), key, status),
        Drift::Changed(changes) => {
            println!("  {} {:<24} {} {}", "~".yellow(), key, status, "drifted".yellow());
            for change in changes {
                ui::change(&change.field, change.from.as_deref(), change.to.as_deref());
            }
        }
        Drift::Incomplete => println!(
            "  {} {:<24} {} {}",
            "~".yellow(),
            key,
            status,
            "incomplete, the next apply resumes it".yellow()
        ),
        Drift::Gone => println!(
            "  {} {:<24} {}",
            "✗".red(),
            key,
            "gone from the remote, the next apply recreates it".red()
        ),
        Drift::Unreadable(e) => {
            println!("  {} {:<24} {}", "✗".red(), key, e);
            ui::dim(e.source.category().advice());
        }
    }
}

fn print_declared_only(session: &Session) {
    let plans = session
        .manifest
        .plans
        .keys()
        .filter(|k| !session.state.plans.contains_key(*k))
        .map(|k| format!("plans.{}", k));
    let subscriptions = session
        .manifest
        .subscriptions
        .keys()
        .filter(|k| !session.state.subscriptions.contains_key(*k))
        .map(|k| format!("subscriptions.{}", k));
    let pending: Vec<String> = plans.chain(subscriptions).collect();

    if !pending.is_empty() {
        ui::section("Not yet created");
        for address in pending {
            ui::dim(&address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper;
    use crate::model::PlanSpec;
    use crate::model::fixtures::gold;
    use gravitee::{Client, MockBackend};

    fn setup() -> (MockBackend, Client, Identity) {
        let mock = MockBackend::new();
        let id = mock.insert_plan("api-1", mapper::plan::to_create(&gold()));
        let client = Client::with_backend(Box::new(mock.clone()));
        (mock, client, Identity::new("api-1", id))
    }

    fn check_plan(client: &Client, identity: &Identity, applied: Option<&PlanSpec>) -> Check {
        let reconciler = PlanReconciler::new(client, true);
        check(&reconciler, identity, applied, |o: &ObservedPlan| {
            (&o.record, o.status.map(|s| s.to_string()))
        })
    }

    #[test]
    fn test_in_sync() {
        let (_mock, client, identity) = setup();

        let check = check_plan(&client, &identity, Some(&gold()));

        assert!(matches!(check.drift, Drift::InSync));
        assert_eq!(check.status.as_deref(), Some("STAGING"));
    }

    #[test]
    fn test_changed_fields() {
        let (_mock, client, identity) = setup();
        let applied = PlanSpec {
            name: "Platinum".to_string(),
            ..gold()
        };

        let check = check_plan(&client, &identity, Some(&applied));

        let Drift::Changed(changes) = check.drift else {
            panic!("expected drift");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "name");
        assert_eq!(changes[0].to.as_deref(), Some("Gold"));
    }

    #[test]
    fn test_incomplete_and_gone() {
        let (mock, client, identity) = setup();

        let check = check_plan(&client, &identity, None);
        assert!(matches!(check.drift, Drift::Incomplete));

        mock.remove_plan(&identity.id);
        let check = check_plan(&client, &identity, Some(&gold()));
        assert!(matches!(check.drift, Drift::Gone));
    }

    #[test]
    fn test_unreadable() {
        let (mock, client, identity) = setup();
        mock.fail_once(gravitee::Method::Get, &identity.id, 500);

        let check = check_plan(&client, &identity, Some(&gold()));

        let mut tally = Tally::default();
        tally.add(&check.drift);
        assert!(matches!(check.drift, Drift::Unreadable(_)));
        assert_eq!(tally.errors, 1);
    }
}
