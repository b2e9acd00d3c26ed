//! Command implementations

pub mod api;
pub mod apply;
pub mod import;
pub mod status;

use anyhow::Result;
use gravitee::Client;
use std::path::Path;

use crate::Context;
use crate::config::{self, Settings};
use crate::schema::Manifest;
use crate::state::GraviteeState;

/// Manifest, state and client a command works with
pub struct Session {
    pub manifest: Manifest,
    pub state: GraviteeState,
    pub client: Client,
}

impl Session {
    /// Load everything a command needs.
    ///
    /// Without `manifest_required` a missing manifest counts as empty, so
    /// commands that only read the remote still pick up `[provider]` when
    /// there is one.
    pub fn open(ctx: &Context, manifest_required: bool) -> Result<Self> {
        let manifest_path = config::manifest_path(ctx.manifest.as_deref())?;
        let manifest = load_manifest(&manifest_path, manifest_required)?;

        let state_path = ctx
            .state
            .as_deref()
            .map(config::expand_path)
            .transpose()?;
        let state = GraviteeState::load(&GraviteeState::state_file(state_path.as_deref())?)?;

        let settings = Settings::resolve(&ctx.connection, &manifest.provider)?;

        Ok(Self {
            manifest,
            state,
            client: settings.client(),
        })
    }
}

fn load_manifest(path: &Path, required: bool) -> Result<Manifest> {
    if !required && !path.exists() {
        log::debug!("No manifest at {}, using provider settings only", path.display());
        return Ok(Manifest::default());
    }
    Manifest::load(path)
}
