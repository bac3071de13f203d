//! One-shot build command.

use anyhow::{Context, Result};
use lumen_core::{Config, SiteBuilder, Trigger};
use std::path::Path;

/// Load the configuration, run a single full build, and return. Any build
/// error propagates to the process boundary.
pub fn build_once(site: &Path, run_hooks: bool) -> Result<()> {
    let config = Config::load(site).context("failed to load configuration")?;
    tracing::info!("source directory: {:?}", config.source_dir());
    tracing::info!("dest directory: {:?}", config.dest_dir());

    let mut builder = SiteBuilder::new(config).with_hooks(run_hooks);
    builder.run_build(Trigger::Full).context("build failed")?;

    // without this the process could exit out from under a running hook
    builder.wait_for_hook();
    Ok(())
}
