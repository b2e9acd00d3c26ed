//! `plan` and `apply`

use anyhow::{Context as AnyhowContext, Result};
use declarative::ExecuteOptions;

use super::Session;
use crate::Context;
use crate::engine::differ::{compute_diffs, display_diff};
use crate::engine::{self, DialoguerConfirm, TerminalProgress};
use crate::ui;

/// Preview what apply would change
pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx, true)?;
    let plan = engine::build(&session.manifest, &session.state).filter_by_target(target);

    if plan.is_empty() {
        ui::info("Nothing matches the target");
        return Ok(());
    }

    let diffs = compute_diffs(&plan, &session.manifest, &session.state, &session.client);
    display_diff(&diffs);
    Ok(())
}

/// Converge every selected resource, failing if any pass failed
pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let mut session = Session::open(ctx, true)?;
    let plan = engine::build(&session.manifest, &session.state).filter_by_target(target);

    if plan.is_empty() {
        ui::info("Nothing matches the target");
        return Ok(());
    }

    if !dry_run {
        session
            .client
            .check_connection()
            .context("Could not reach the management API")?;
    }

    if !ctx.quiet {
        ui::header("Applying manifest");
        ui::kv("State", &session.state.path().display().to_string());
    }

    let opts = ExecuteOptions {
        dry_run,
        yes,
        verbose: ctx.verbose > 0,
    };
    let summary = engine::execute(
        &session.client,
        &session.manifest,
        &mut session.state,
        &plan,
        &opts,
        &mut TerminalProgress::new(opts.verbose),
        &mut DialoguerConfirm,
    )?;

    if !summary.is_success() {
        anyhow::bail!("{} resource(s) failed to apply", summary.failed);
    }
    Ok(())
}
