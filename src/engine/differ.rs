//! Diff computation and display

use super::planner::{Entry, PlanEntry, SubscriptionEntry, resolve_plan_id};
use crate::reconcile::{PlanReconciler, SubscriptionReconciler};
use crate::schema::Manifest;
use crate::state::GraviteeState;
use colored::{ColoredString, Colorize};
use declarative::{
    Declared, Diff, DiffSummary, ExecutionPlan, FieldChange, Operation, Resource, ResourceDiff,
    group_by_type, plan_operation,
};
use gravitee::Client;

/// Stand-in for the id of a plan created in the same run
pub const UNKNOWN_PLAN_ID: &str = "(known after apply)";

/// Compute the pending change of every entry that needs one
pub fn compute_diffs(
    plan: &ExecutionPlan<Entry>,
    manifest: &Manifest,
    state: &GraviteeState,
    client: &Client,
) -> Vec<ResourceDiff> {
    plan.entries()
        .filter_map(|entry| match entry {
            Entry::Plan(e) => plan_diff(e, client),
            Entry::Subscription(e) => subscription_diff(e, manifest, state, client),
        })
        .collect()
}

fn plan_diff(entry: &PlanEntry, client: &Client) -> Option<ResourceDiff> {
    let reconciler = PlanReconciler::new(client, entry.auto_publish());
    let identity = entry.identity();
    let previous = entry.previous();
    let desired = entry.desired();
    let declared = entry
        .declared
        .as_ref()
        .zip(desired.as_ref())
        .map(|(d, spec)| Declared::new(d.api_id.as_str(), spec));

    let operation = plan_operation(&reconciler, identity.as_ref(), previous, declared);
    if !operation.is_change() {
        return None;
    }

    let description = match (&entry.declared, &entry.state) {
        (Some(d), _) => format!("{} on API {}", d.name, d.api_id),
        (None, Some(s)) => format!("{} on API {}", s.id, s.api_id),
        (None, None) => entry.key.clone(),
    };
    let steps = reconciler.planned_steps(operation, previous, desired.as_ref());

    Some(ResourceDiff {
        resource_id: entry.key.clone(),
        resource_type: "plan".to_string(),
        description,
        operation,
        changes: changes(previous, desired.as_ref(), operation),
        steps: steps.iter().map(ToString::to_string).collect(),
    })
}

fn subscription_diff(
    entry: &SubscriptionEntry,
    manifest: &Manifest,
    state: &GraviteeState,
    client: &Client,
) -> Option<ResourceDiff> {
    let reconciler = SubscriptionReconciler::new(client, entry.auto_validate());
    let identity = entry.identity();
    let previous = entry.previous();
    let desired = entry.declared.as_ref().and_then(|d| {
        let plan_id = resolve_plan_id(manifest, state, &d.plan)
            .unwrap_or_else(|| UNKNOWN_PLAN_ID.to_string());
        entry.desired(&plan_id)
    });
    let declared = entry
        .declared
        .as_ref()
        .zip(desired.as_ref())
        .map(|(d, spec)| Declared::new(d.api_id.as_str(), spec));

    let operation = plan_operation(&reconciler, identity.as_ref(), previous, declared);
    if !operation.is_change() {
        return None;
    }

    let description = match (&entry.declared, &entry.state) {
        (Some(d), _) => format!("application {} on plan {}", d.application_id, d.plan),
        (None, Some(s)) => format!("{} on plan {}", s.id, s.plan),
        (None, None) => entry.key.clone(),
    };
    let steps = reconciler.planned_steps(operation, previous, desired.as_ref());

    Some(ResourceDiff {
        resource_id: entry.key.clone(),
        resource_type: "subscription".to_string(),
        description,
        operation,
        changes: changes(previous, desired.as_ref(), operation),
        steps: steps.iter().map(ToString::to_string).collect(),
    })
}

fn changes<D: Diff>(
    previous: Option<&D>,
    desired: Option<&D>,
    operation: Operation,
) -> Vec<FieldChange> {
    match (operation, previous, desired) {
        (Operation::Update | Operation::Replace, Some(previous), Some(desired)) => {
            previous.diff(desired)
        }
        _ => Vec::new(),
    }
}

fn symbol(operation: Operation) -> ColoredString {
    match operation {
        Operation::Create => "+".green(),
        Operation::Delete => "-".red(),
        Operation::Update => "~".yellow(),
        Operation::Replace => "±".magenta(),
        Operation::Refresh | Operation::Noop => "○".dimmed(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        let type_name = match resource_type.as_str() {
            "plan" => "Plans",
            "subscription" => "Subscriptions",
            other => other,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            let note = match diff.operation {
                Operation::Update if diff.changes.is_empty() => "(resume incomplete apply)",
                Operation::Replace => "(must be replaced)",
                Operation::Delete => "(will remove)",
                _ => "",
            };
            println!(
                "│   {} {:<24} {} {}",
                symbol(diff.operation),
                diff.resource_id,
                diff.description.dimmed(),
                note.dimmed()
            );

            for change in &diff.changes {
                println!(
                    "│       {}: {} → {}",
                    change.field,
                    change.from.as_deref().unwrap_or("(unset)").red(),
                    change.to.as_deref().unwrap_or("(unset)").green()
                );
            }
            if !diff.steps.is_empty() {
                println!("│       {}", format!("calls: {}", diff.steps.join(", ")).dimmed());
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to change, {} to replace, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
