use std::io::Write;

use anyhow::Context;
use perky::engine;
use tracing::instrument;

use super::Workspace;

#[instrument(skip_all)]
pub fn split(workspace: &Workspace) -> anyhow::Result<()> {
    let lines = workspace.read_input()?;
    let mut factory = workspace.config.id_factory();
    let preprocessed = engine::preprocess(&lines, &mut factory);
    let store = workspace.store();

    let mut out = workspace.open_output()?;
    let summary = engine::split(&lines, &mut factory, &preprocessed, &store, &mut out)
        .with_context(|| format!("failed to split into {}", store.root().display()))?;
    out.flush().context("failed to flush output")?;

    if summary.unnamed > 0 {
        tracing::warn!(
            "{} requirement(s) left inline, try a wider identifier pattern",
            summary.unnamed
        );
    }
    Ok(())
}

#[instrument(skip_all)]
pub fn merge(workspace: &Workspace) -> anyhow::Result<()> {
    let lines = workspace.read_input()?;
    let config = &workspace.config;
    let preprocessed = engine::preprocess(&lines, &mut config.id_factory());
    let store = workspace.store();

    let mut out = workspace.open_output()?;
    engine::merge(
        &lines,
        &preprocessed,
        &store,
        config.syntax(),
        config.permissive,
        &mut out,
    )
    .with_context(|| format!("failed to merge from {}", store.root().display()))?;
    out.flush().context("failed to flush output")?;
    Ok(())
}

#[instrument(skip_all)]
pub fn publish(workspace: &Workspace) -> anyhow::Result<()> {
    let lines = workspace.read_input()?;
    let config = &workspace.config;
    let preprocessed = engine::preprocess(&lines, &mut config.id_factory());
    let store = workspace.store();

    let mut out = workspace.open_output()?;
    engine::publish(&lines, &preprocessed, &store, config, &mut out)
        .with_context(|| format!("failed to publish from {}", store.root().display()))?;
    out.flush().context("failed to flush output")?;
    Ok(())
}
