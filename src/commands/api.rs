//! `api` - show a remote API definition

use anyhow::{Context as AnyhowContext, Result};

use super::Session;
use crate::Context;
use crate::progress;
use crate::ui;

pub fn show(ctx: &Context, api_id: &str) -> Result<()> {
    let session = Session::open(ctx, false)?;
    let pb = progress::spinner(&format!("Reading API {}...", api_id));
    let api = session.client.get_api(api_id);
    pb.finish_and_clear();
    let api = api
        .with_context(|| format!("Could not read API {}", api_id))?
        .with_context(|| format!("API {} not found", api_id))?;

    ui::header(api.name.as_deref().unwrap_or(&api.id));
    ui::kv("Id", &api.id);
    let fields = [
        ("Description", &api.description),
        ("Version", &api.api_version),
        ("Definition", &api.definition_version),
        ("Type", &api.api_type),
        ("State", &api.state),
        ("Created", &api.created_at),
        ("Updated", &api.updated_at),
        ("Deployed", &api.deployed_at),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            ui::kv(label, value);
        }
    }

    let managed = session
        .state
        .plans
        .iter()
        .filter(|(_, p)| p.api_id == api.id)
        .count();
    if managed > 0 {
        ui::dim(&format!("{} managed plan(s)", managed));
    }
    Ok(())
}
