use crate::{output, report};
use anyhow::{Context, Result};
use organizer_core::config::{ClassificationConfig, NamingConfig};
use organizer_core::dates::Clock;
use organizer_core::models::{ClassificationDocument, Inventory, NamingDocument};
use organizer_core::pipeline::{self, PipelineMode, PipelineSummary, Provenance};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub input: PathBuf,
    pub config: PathBuf,
    pub output: PathBuf,
    pub dry_run: bool,
    pub trace: bool,
    /// Suppress console reports; the caller prints a JSON status instead.
    pub quiet: bool,
}

/// Settings for the naming half of `run`.
#[derive(Debug, Clone)]
pub struct NamingStage {
    pub config: PathBuf,
    pub output: PathBuf,
    pub fallback_dir: PathBuf,
    pub preview_only: bool,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub classification: ClassificationDocument,
    pub naming: Option<NamingDocument>,
    pub summary: PipelineSummary,
}

fn load_configs(
    opts: &ClassifyOptions,
    naming: Option<&NamingStage>,
) -> Result<(ClassificationConfig, Option<NamingConfig>)> {
    if !opts.config.is_file() {
        anyhow::bail!("Config file not found: {}", opts.config.display());
    }
    let classification = ClassificationConfig::load(&opts.config)
        .with_context(|| format!("load classification config {}", opts.config.display()))?;
    info!(
        "Loaded {} categories from config ({} skipped triggers)",
        classification.categories.len(),
        classification.issues.len()
    );
    let naming = naming
        .map(|stage| {
            NamingConfig::load(&stage.config)
                .with_context(|| format!("load naming config {}", stage.config.display()))
        })
        .transpose()?;
    Ok((classification, naming))
}

/// Classify an inventory file and, when `naming` is given, name the result
/// in the same pass.
pub fn run(opts: &ClassifyOptions, naming: Option<&NamingStage>, clock: &dyn Clock) -> Result<RunResult> {
    let inventory = Inventory::load(&opts.input)
        .with_context(|| format!("load inventory {}", opts.input.display()))?;
    info!("Loaded {} files from parsed data", inventory.files.len());
    let (classification_cfg, naming_cfg) = load_configs(opts, naming)?;

    let provenance = Provenance {
        config_used: Some(output::absolute_display(&opts.config)),
        input_file: Some(output::absolute_display(&opts.input)),
    };
    let mode = if naming_cfg.is_some() {
        PipelineMode::All
    } else {
        PipelineMode::Classify
    };
    let fallback = naming
        .map(|stage| stage.fallback_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let out = pipeline::run_with_mode(
        &classification_cfg,
        naming_cfg.as_ref(),
        inventory,
        &provenance,
        mode,
        clock,
        &fallback,
    );

    if !opts.quiet {
        let mut stdout = io::stdout().lock();
        report::file_results(&mut stdout, &out.batch, opts.trace)?;
        report::classification_summary(&mut stdout, &out.batch)?;
    }
    write_unless_dry_run(opts.dry_run, &opts.output, &out.classification, "Classification results")?;

    let naming_doc = match (naming, &out.naming) {
        (Some(stage), Some(outcome)) => {
            if !opts.quiet {
                let mut stdout = io::stdout().lock();
                report::rename_lines(&mut stdout, &outcome.mappings)?;
                report::conflicts(&mut stdout, &outcome.conflicts)?;
                report::naming_summary(&mut stdout, &outcome.summary)?;
            }
            let doc = pipeline::naming_document(
                outcome,
                Some(output::absolute_display(&stage.config)),
                stage.preview_only,
                clock,
            );
            write_unless_dry_run(opts.dry_run, &stage.output, &doc, "Rename mappings")?;
            Some(doc)
        }
        _ => None,
    };

    Ok(RunResult {
        classification: out.classification,
        naming: naming_doc,
        summary: out.summary,
    })
}

pub(crate) fn write_unless_dry_run<T: serde::Serialize>(
    dry_run: bool,
    path: &Path,
    value: &T,
    label: &str,
) -> Result<()> {
    if dry_run {
        info!("Dry run requested: skipping write of {}", path.display());
        return Ok(());
    }
    output::write_json(path, value)?;
    info!("{} exported to: {}", label, path.display());
    Ok(())
}
