use crate::{output, report};
use anyhow::{Context, Result};
use organizer_core::dates::Clock;
use organizer_core::pipeline::generated_date;
use organizer_core::plan::{build_plan, MappingFile, PlanDocument};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Overrides the naming config's `BackupOriginals`.
    pub backup: Option<bool>,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Build the rename plan. Fails when no mapping has an existing source.
pub fn run(opts: &PlanOptions, clock: &dyn Clock) -> Result<PlanDocument> {
    let input = output::absolute(&opts.input);
    let file = MappingFile::load(&input)
        .with_context(|| format!("load rename mappings {}", input.display()))?;
    let default_backup = opts.backup.unwrap_or_else(|| file.default_backup());
    let plan = build_plan(&file.mappings, default_backup, Path::exists);
    if !plan.is_actionable() {
        anyhow::bail!("No valid rename operations found (all sources missing)");
    }

    if !opts.quiet {
        report::plan_summary(&mut io::stdout().lock(), &plan, opts.dry_run)?;
    }
    let document = PlanDocument {
        generated_at: generated_date(clock),
        source_mapping: input.to_string_lossy().into_owned(),
        plan,
    };
    if opts.dry_run {
        info!("Dry run requested: plan not written");
    } else {
        output::write_json(&opts.output, &document)?;
        info!("Rename plan written to: {}", opts.output.display());
    }
    Ok(document)
}
