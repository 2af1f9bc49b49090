use crate::classify::write_unless_dry_run;
use crate::{output, report};
use anyhow::{Context, Result};
use organizer_core::config::NamingConfig;
use organizer_core::dates::Clock;
use organizer_core::models::{ClassifiedInventory, NamingDocument};
use organizer_core::pipeline;
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct NameOptions {
    pub input: PathBuf,
    pub config: PathBuf,
    pub output: PathBuf,
    pub fallback_dir: PathBuf,
    pub preview_only: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Turn classification results into rename mappings.
pub fn run(opts: &NameOptions, clock: &dyn Clock) -> Result<NamingDocument> {
    if !opts.input.exists() {
        anyhow::bail!(
            "Classification results file not found at '{}'",
            opts.input.display()
        );
    }
    if !opts.config.exists() {
        anyhow::bail!(
            "Naming convention config file not found at '{}'",
            opts.config.display()
        );
    }
    let classified = ClassifiedInventory::load(&opts.input)
        .with_context(|| format!("load classification results {}", opts.input.display()))?;
    info!("Loaded classification results");
    let config = NamingConfig::load(&opts.config)
        .with_context(|| format!("load naming config {}", opts.config.display()))?;
    info!("Loaded naming convention config");

    let outcome = pipeline::name_classifications(
        &config,
        &classified.classifications,
        clock,
        &opts.fallback_dir,
    );
    if !opts.quiet {
        let mut stdout = io::stdout().lock();
        report::rename_lines(&mut stdout, &outcome.mappings)?;
        report::conflicts(&mut stdout, &outcome.conflicts)?;
        report::naming_summary(&mut stdout, &outcome.summary)?;
    }

    let document = pipeline::naming_document(
        &outcome,
        Some(output::absolute_display(&opts.config)),
        opts.preview_only,
        clock,
    );
    write_unless_dry_run(opts.dry_run, &opts.output, &document, "Rename mappings")?;
    Ok(document)
}
