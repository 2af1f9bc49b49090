use crate::classifier::ClassificationBatch;
use crate::config::{ClassificationConfig, NamingConfig};
use crate::conflicts::{resolve_conflicts, ConflictReport};
use crate::dates::Clock;
use crate::error::ConfigIssue;
use crate::models::{
    ClassificationDocument, ClassificationSummary, FileRecord, Inventory, NamingDocument,
    NamingSummary, OrderedMap, RenameMapping, SourceData,
};
use crate::naming::NamingEngine;
use std::path::Path;
use tracing::info;

const GENERATED_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Classify,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub classified: usize,
    pub classification_errors: usize,
    pub naming: Option<NamingSummary>,
}

pub fn generated_date(clock: &dyn Clock) -> String {
    clock.now().format(GENERATED_DATE_FORMAT).to_string()
}

pub fn classify_inventory(config: &ClassificationConfig, files: Vec<FileRecord>) -> ClassificationBatch {
    info!("Starting classification phase...");
    let batch = config.classifier().classify(files);
    info!("Classification complete.");
    batch
}

/// Where the classification input came from, for the export.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub config_used: Option<String>,
    pub input_file: Option<String>,
}

pub fn classification_document(
    batch: &ClassificationBatch,
    config: &ClassificationConfig,
    inventory: &Inventory,
    provenance: &Provenance,
    clock: &dyn Clock,
) -> ClassificationDocument {
    ClassificationDocument {
        generated_date: generated_date(clock),
        summary: ClassificationSummary {
            total_classified: batch.total(),
            classification_errors: batch.errors,
        },
        classifications: batch.to_buckets(),
        naming_conventions: config.naming_conventions.clone(),
        config_used: provenance.config_used.clone(),
        source_data: provenance.input_file.as_ref().map(|input| SourceData {
            input_file: input.clone(),
            original_summary: inventory.summary.clone(),
            missing_files: inventory.missing_files.clone(),
        }),
    }
}

/// Rename mappings after conflict resolution, with the counters that go
/// into the naming summary.
#[derive(Debug, Clone)]
pub struct NamingOutcome {
    pub mappings: Vec<RenameMapping>,
    pub summary: NamingSummary,
    pub conflicts: ConflictReport,
    pub skipped: Vec<ConfigIssue>,
}

pub fn name_classifications(
    config: &NamingConfig,
    classifications: &OrderedMap<Vec<FileRecord>>,
    clock: &dyn Clock,
    fallback_dir: &Path,
) -> NamingOutcome {
    info!("Starting naming phase...");
    let engine = NamingEngine::new(config, clock, fallback_dir);
    let mut batch = engine.generate(classifications);

    info!("Checking for naming conflicts...");
    let conflicts = resolve_conflicts(&mut batch.mappings, &config.settings.duplicates);
    if conflicts.conflicts() == 0 {
        info!("No naming conflicts detected.");
    } else {
        info!(
            "Resolved {} naming conflicts ({} unresolved)",
            conflicts.conflicts() - conflicts.unresolved(),
            conflicts.unresolved()
        );
    }

    let summary = NamingSummary {
        total_files: batch.total_files,
        files_renamed: batch.renamed(),
        conflicts: conflicts.conflicts(),
        unresolved_conflicts: conflicts.unresolved(),
        errors: batch.errors,
    };
    NamingOutcome {
        mappings: batch.mappings,
        summary,
        conflicts,
        skipped: batch.skipped,
    }
}

pub fn naming_document(
    outcome: &NamingOutcome,
    config_used: Option<String>,
    preview_only: bool,
    clock: &dyn Clock,
) -> NamingDocument {
    NamingDocument {
        generated_date: generated_date(clock),
        summary: outcome.summary.clone(),
        rename_mappings: outcome.mappings.clone(),
        config_used,
        preview_only,
    }
}

/// Everything produced by one in-memory run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub batch: ClassificationBatch,
    pub classification: ClassificationDocument,
    pub naming: Option<NamingOutcome>,
    pub summary: PipelineSummary,
}

/// Classify an inventory and, in `All` mode, name the result.
pub fn run_with_mode(
    classification: &ClassificationConfig,
    naming: Option<&NamingConfig>,
    inventory: Inventory,
    provenance: &Provenance,
    mode: PipelineMode,
    clock: &dyn Clock,
    fallback_dir: &Path,
) -> PipelineOutput {
    let batch = classify_inventory(classification, inventory.files.clone());
    let document = classification_document(&batch, classification, &inventory, provenance, clock);
    let mut summary = PipelineSummary {
        classified: batch.total(),
        classification_errors: batch.errors,
        naming: None,
    };

    let naming = match (mode, naming) {
        (PipelineMode::All, Some(config)) => {
            let outcome =
                name_classifications(config, &batch.to_file_buckets(), clock, fallback_dir);
            summary.naming = Some(outcome.summary.clone());
            Some(outcome)
        }
        _ => None,
    };

    PipelineOutput {
        batch,
        classification: document,
        naming,
        summary,
    }
}
