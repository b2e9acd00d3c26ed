//! Execution engine - runs the passes of a plan with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, Declared, ExecuteOptions, ExecuteSummary, ExecutionPlan,
    Identity, Operation, ProgressCallback, converge,
};
use gravitee::Client;
use indicatif::ProgressBar;

use super::differ::{compute_diffs, display_diff};
use super::planner::{Entry, PlanEntry, SubscriptionEntry, resolve_plan_id};
use crate::progress;
use crate::reconcile::{PlanReconciler, StepError, SubscriptionReconciler};
use crate::schema::Manifest;
use crate::state::{GraviteeState, PlanState, SubscriptionState};

/// A pass that failed, kept for the final report
#[derive(Debug)]
pub struct Failure {
    pub address: String,
    pub error: StepError,
}

/// Run every pass of `plan`, saving the state after each one
pub fn execute(
    client: &Client,
    manifest: &Manifest,
    state: &mut GraviteeState,
    plan: &ExecutionPlan<Entry>,
    opts: &ExecuteOptions,
    progress: &mut dyn ProgressCallback,
    confirm: &mut dyn ConfirmCallback,
) -> Result<ExecuteSummary> {
    // 1. Display what will change
    let diffs = compute_diffs(plan, manifest, state, client);
    display_diff(&diffs);

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    // 2. Confirm (unless --yes); unchanged resources are still refreshed
    if !diffs.is_empty() && !opts.yes && !confirm.confirm("Continue?")? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    // 3. Run phases in order
    let mut summary = ExecuteSummary::default();
    let mut failures = Vec::new();

    for phase in &plan.phases {
        if phase.entries.is_empty() {
            continue;
        }
        progress.on_phase_start(phase.name, phase.entries.len());

        for entry in &phase.entries {
            let address = entry.address();
            progress.on_resource_start(&address, phase.name);

            let (result, error) = match entry {
                Entry::Plan(e) => apply_plan(client, state, e),
                Entry::Subscription(e) => apply_subscription(client, manifest, state, e),
            };
            state.touch()?;

            if let Some(error) = error {
                log::debug!("{} failed: {:?}", address, error);
                failures.push(Failure {
                    address: address.clone(),
                    error,
                });
            }
            summary.add_result(&result);
            progress.on_resource_complete(&address, &result);
        }

        progress.on_phase_complete();
    }

    // 4. Report
    print_failures(&failures);
    print_summary(&summary);

    Ok(summary)
}

fn apply_plan(
    client: &Client,
    state: &mut GraviteeState,
    entry: &PlanEntry,
) -> (ApplyResult, Option<StepError>) {
    let current = state.plans.get(&entry.key).cloned();
    let identity = current.as_ref().map(PlanState::identity);
    let previous = current.as_ref().and_then(|s| s.applied.clone());
    let desired = entry.desired();
    let declared = entry
        .declared
        .as_ref()
        .zip(desired.as_ref())
        .map(|(d, spec)| Declared::new(d.api_id.as_str(), spec));

    let reconciler = PlanReconciler::new(client, entry.auto_publish());
    let pass = converge(&reconciler, identity.as_ref(), previous.as_ref(), declared);
    let result = pass.apply_result();

    let Some(after) = pass.identity else {
        state.plans.remove(&entry.key);
        return (result, pass.outcome.err());
    };

    let (status, applied, error) = match pass.outcome {
        Ok(observed) => (observed.and_then(|o| o.status), desired, None),
        Err(e) => (
            current
                .filter(|_| identity.as_ref() == Some(&after))
                .and_then(|c| c.status),
            applied_after_failure(pass.operation, identity.as_ref(), &after, previous),
            Some(e),
        ),
    };
    state.plans.insert(
        entry.key.clone(),
        PlanState {
            api_id: after.parent,
            id: after.id,
            status,
            applied,
        },
    );
    (result, error)
}

fn apply_subscription(
    client: &Client,
    manifest: &Manifest,
    state: &mut GraviteeState,
    entry: &SubscriptionEntry,
) -> (ApplyResult, Option<StepError>) {
    let plan_id = match &entry.declared {
        Some(declared) => match resolve_plan_id(manifest, state, &declared.plan) {
            Some(id) => Some(id),
            None => {
                let reason = format!("plan '{}' has not been created", declared.plan);
                log::warn!("Skipping subscriptions.{}: {}", entry.key, reason);
                return (ApplyResult::Skipped { reason }, None);
            }
        },
        None => None,
    };

    let current = state.subscriptions.get(&entry.key).cloned();
    let identity = current.as_ref().map(SubscriptionState::identity);
    let previous = current.as_ref().and_then(|s| s.applied.clone());
    let desired = plan_id.and_then(|id| entry.desired(&id));
    let declared = entry
        .declared
        .as_ref()
        .zip(desired.as_ref())
        .map(|(d, spec)| Declared::new(d.api_id.as_str(), spec));

    let reconciler = SubscriptionReconciler::new(client, entry.auto_validate());
    let pass = converge(&reconciler, identity.as_ref(), previous.as_ref(), declared);
    let result = pass.apply_result();

    let Some(after) = pass.identity else {
        state.subscriptions.remove(&entry.key);
        return (result, pass.outcome.err());
    };

    let plan = entry
        .declared
        .as_ref()
        .map(|d| d.plan.clone())
        .or_else(|| current.as_ref().map(|c| c.plan.clone()))
        .unwrap_or_default();
    let (status, applied, error) = match pass.outcome {
        Ok(observed) => (observed.and_then(|o| o.status), desired, None),
        Err(e) => (
            current
                .filter(|_| identity.as_ref() == Some(&after))
                .and_then(|c| c.status),
            applied_after_failure(pass.operation, identity.as_ref(), &after, previous),
            Some(e),
        ),
    };
    state.subscriptions.insert(
        entry.key.clone(),
        SubscriptionState {
            api_id: after.parent,
            id: after.id,
            plan,
            status,
            applied,
        },
    );
    (result, error)
}

/// Applied record to remember after a failed pass.
///
/// A resource created by the failed pass, or updated part-way, has no known
/// applied record; the next pass resumes it. Otherwise the remote resource
/// was left untouched and the previous record still holds.
fn applied_after_failure<D>(
    operation: Operation,
    before: Option<&Identity>,
    after: &Identity,
    previous: Option<D>,
) -> Option<D> {
    if before != Some(after) || operation == Operation::Update {
        None
    } else {
        previous
    }
}

// ============================================================================
// Terminal integration
// ============================================================================

/// Progress bar per phase, with a line per changed or failed resource
pub struct TerminalProgress {
    verbose: bool,
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, bar: None }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_phase_start(&mut self, name: &str, count: usize) {
        println!();
        println!("  {} Applying {} {}...", "→".cyan(), count, name);
        self.bar = Some(progress::bar(count as u64, name));
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let line = match result {
            ApplyResult::NoChange if !self.verbose => None,
            ApplyResult::NoChange => Some(format!("    {} {}", "○".dimmed(), id)),
            ApplyResult::Created => Some(format!("    {} {} created", "✓".green(), id)),
            ApplyResult::Modified => Some(format!("    {} {} updated", "✓".green(), id)),
            ApplyResult::Replaced => Some(format!("    {} {} replaced", "✓".green(), id)),
            ApplyResult::Removed => Some(format!("    {} {} removed", "✓".green(), id)),
            ApplyResult::Failed { error } => Some(format!("    {} {} {}", "✗".red(), id, error)),
            ApplyResult::Skipped { reason } => {
                Some(format!("    {} {} skipped: {}", "⊘".yellow(), id, reason))
            }
        };
        if let Some(pb) = &self.bar {
            if let Some(line) = line {
                pb.println(line);
            }
            pb.inc(1);
        }
    }

    fn on_phase_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Confirm with user
pub struct DialoguerConfirm;

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

fn print_failures(failures: &[Failure]) {
    if failures.is_empty() {
        return;
    }

    println!();
    println!("  {} Failed resources:", "✗".red().bold());
    for failure in failures {
        let error = &failure.error;
        println!("    • {}: {}", failure.address.bold(), error);
        if let Some(id) = &error.created_id {
            println!(
                "      {}",
                format!("created as {}, the next apply resumes it", id).dimmed()
            );
        } else if error.step.is_transition() {
            println!(
                "      {}",
                format!("{} did not complete, the next apply retries it", error.step).dimmed()
            );
        }
        println!("      {}", error.source.category().advice().dimmed());
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
