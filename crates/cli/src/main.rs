use anyhow::Result;
use clap::{Parser, Subcommand};
use organizer_cli::classify::{self, ClassifyOptions, NamingStage};
use organizer_cli::name::{self, NameOptions};
use organizer_cli::output::print_status;
use organizer_cli::plan::{self, PlanOptions};
use organizer_core::config;
use organizer_core::config::AppConfig;
use organizer_core::dates::SystemClock;
use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify {
            input,
            rules,
            output,
            dry_run,
            trace,
            json,
        } => run_classify(&cfg, input, rules, output, dry_run, trace, json),
        Commands::Name {
            input,
            rules,
            output,
            fallback_dir,
            preview_only,
            dry_run,
            json,
        } => run_name(&cfg, input, rules, output, fallback_dir, preview_only, dry_run, json),
        Commands::Run {
            input,
            rules,
            naming_rules,
            output,
            mappings_output,
            fallback_dir,
            preview_only,
            dry_run,
            trace,
            json,
        } => {
            let opts = classify_options(&cfg, input, rules, output, dry_run, trace, json);
            let stage = naming_stage(&cfg, naming_rules, mappings_output, fallback_dir, preview_only);
            let result = classify::run(&opts, Some(&stage), &SystemClock)?;
            if json {
                let naming = result.summary.naming.unwrap_or_default();
                print_status(
                    "run",
                    serde_json::json!({
                        "classified": result.summary.classified,
                        "classification_errors": result.summary.classification_errors,
                        "files_renamed": naming.files_renamed,
                        "conflicts": naming.conflicts,
                        "unresolved_conflicts": naming.unresolved_conflicts,
                        "naming_errors": naming.errors,
                    }),
                )?;
            }
            Ok(())
        }
        Commands::Plan {
            input,
            output,
            include_backup,
            no_backup,
            dry_run,
            json,
        } => {
            let backup = if no_backup {
                Some(false)
            } else if include_backup {
                Some(true)
            } else {
                cfg.plan.include_backup
            };
            let opts = PlanOptions {
                input: input.unwrap_or_else(|| PathBuf::from(&cfg.plan.input)),
                output: output.unwrap_or_else(|| PathBuf::from(&cfg.plan.output)),
                backup,
                dry_run,
                quiet: json,
            };
            let document = plan::run(&opts, &SystemClock)?;
            if json {
                print_status(
                    "plan",
                    serde_json::json!({
                        "total": document.plan.summary.total,
                        "included": document.plan.summary.included,
                        "missing": document.plan.summary.missing,
                        "default_backup": document.plan.default_backup,
                    }),
                )?;
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "organizer")]
#[command(about = "Rule-based file classification and naming", long_about = None)]
struct Cli {
    /// Path to settings TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an inventory of files into content categories
    Classify {
        /// Parsed inventory JSON
        #[arg(long)]
        input: Option<PathBuf>,
        /// Classification rules JSON
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Destination for classification results
        #[arg(long)]
        output: Option<PathBuf>,
        /// Run without writing output JSON
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Display trigger matches per file
        #[arg(long, default_value_t = false)]
        trace: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Generate rename mappings from classification results
    Name {
        /// Classification results JSON
        #[arg(long)]
        input: Option<PathBuf>,
        /// Naming rules JSON
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Destination for rename mappings
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory used when a file has no known location
        #[arg(long)]
        fallback_dir: Option<PathBuf>,
        /// Mark the mappings as a preview
        #[arg(long, default_value_t = false)]
        preview_only: bool,
        /// Run without writing output JSON
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Classify and name in one pass
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        naming_rules: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        mappings_output: Option<PathBuf>,
        #[arg(long)]
        fallback_dir: Option<PathBuf>,
        /// Mark the mappings as a preview
        #[arg(long, default_value_t = false)]
        preview_only: bool,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = false)]
        trace: bool,
        #[arg(long)]
        json: bool,
    },
    /// Build a rename plan from rename mappings
    Plan {
        /// Rename mappings JSON
        #[arg(long)]
        input: Option<PathBuf>,
        /// Destination for the plan
        #[arg(long)]
        output: Option<PathBuf>,
        /// Force backups on in the plan
        #[arg(long, default_value_t = false, conflicts_with = "no_backup")]
        include_backup: bool,
        /// Force backups off in the plan
        #[arg(long, default_value_t = false)]
        no_backup: bool,
        /// Preview the plan without writing it
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
}

fn classify_options(
    cfg: &AppConfig,
    input: Option<PathBuf>,
    rules: Option<PathBuf>,
    output: Option<PathBuf>,
    dry_run: bool,
    trace: bool,
    json: bool,
) -> ClassifyOptions {
    ClassifyOptions {
        input: input.unwrap_or_else(|| PathBuf::from(&cfg.classification.input)),
        config: rules.unwrap_or_else(|| PathBuf::from(&cfg.classification.config)),
        output: output.unwrap_or_else(|| PathBuf::from(&cfg.classification.output)),
        dry_run,
        trace,
        quiet: json,
    }
}

fn naming_stage(
    cfg: &AppConfig,
    naming_rules: Option<PathBuf>,
    mappings_output: Option<PathBuf>,
    fallback_dir: Option<PathBuf>,
    preview_only: bool,
) -> NamingStage {
    NamingStage {
        config: naming_rules.unwrap_or_else(|| PathBuf::from(&cfg.naming.config)),
        output: mappings_output.unwrap_or_else(|| PathBuf::from(&cfg.naming.output)),
        fallback_dir: fallback_dir.unwrap_or_else(|| PathBuf::from(&cfg.naming.fallback_dir)),
        preview_only: preview_only || cfg.naming.preview_only,
    }
}

fn run_classify(
    cfg: &AppConfig,
    input: Option<PathBuf>,
    rules: Option<PathBuf>,
    output: Option<PathBuf>,
    dry_run: bool,
    trace: bool,
    json: bool,
) -> Result<()> {
    let opts = classify_options(cfg, input, rules, output, dry_run, trace, json);
    let result = classify::run(&opts, None, &SystemClock)?;
    if json {
        print_status(
            "classify",
            serde_json::json!({
                "classified": result.summary.classified,
                "classification_errors": result.summary.classification_errors,
                "output": if dry_run { None } else { Some(opts.output.display().to_string()) },
            }),
        )?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_name(
    cfg: &AppConfig,
    input: Option<PathBuf>,
    rules: Option<PathBuf>,
    output: Option<PathBuf>,
    fallback_dir: Option<PathBuf>,
    preview_only: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let opts = NameOptions {
        input: input.unwrap_or_else(|| PathBuf::from(&cfg.naming.input)),
        config: rules.unwrap_or_else(|| PathBuf::from(&cfg.naming.config)),
        output: output.unwrap_or_else(|| PathBuf::from(&cfg.naming.output)),
        fallback_dir: fallback_dir.unwrap_or_else(|| PathBuf::from(&cfg.naming.fallback_dir)),
        preview_only: preview_only || cfg.naming.preview_only,
        dry_run,
        quiet: json,
    };
    let document = name::run(&opts, &SystemClock)?;
    if json {
        let summary = &document.summary;
        print_status(
            "name",
            serde_json::json!({
                "total_files": summary.total_files,
                "files_renamed": summary.files_renamed,
                "conflicts": summary.conflicts,
                "unresolved_conflicts": summary.unresolved_conflicts,
                "errors": summary.errors,
            }),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_preview_only() {
        let cli = Cli::try_parse_from(["organizer", "run", "--preview-only", "--dry-run"]).unwrap();
        let Commands::Run {
            preview_only,
            dry_run,
            fallback_dir,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert!(preview_only);
        assert!(dry_run);

        let stage = naming_stage(&AppConfig::default(), None, None, fallback_dir, preview_only);
        assert!(stage.preview_only);
        assert!(!naming_stage(&AppConfig::default(), None, None, None, false).preview_only);
    }
}
