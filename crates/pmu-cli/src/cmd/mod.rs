pub mod board;
pub mod branch;
pub mod config;

use anyhow::Context;
use pmu_core::config::Config;
use pmu_core::gh::GhGateway;
use std::path::Path;

/// Config first, so an uninitialized repo fails before `gh` is looked up.
pub(crate) fn connect(root: &Path) -> anyhow::Result<(Config, GhGateway)> {
    let config = Config::load(root).context("failed to load config")?;
    let gw = GhGateway::new(root).context("failed to connect to GitHub")?;
    Ok((config, gw))
}
