//! Console reports for the classify, name and plan commands.

use organizer_core::classifier::ClassificationBatch;
use organizer_core::conflicts::ConflictReport;
use organizer_core::models::{ClassifiedRecord, NamingSummary, RenameMapping, UNKNOWN_CATEGORY};
use organizer_core::plan::RenamePlan;
use std::cmp::Ordering;
use std::io::{self, Write};

const RULE: &str = "========================================";
const TOP_FILES: usize = 3;
const PLAN_PREVIEW: usize = 10;

fn join_tags<'a>(tags: impl Iterator<Item = &'a str>) -> String {
    tags.collect::<Vec<_>>().join(",")
}

pub fn file_results(out: &mut impl Write, batch: &ClassificationBatch, trace: bool) -> io::Result<()> {
    for item in &batch.records {
        let record = &item.record;
        let classification = &item.classification;
        writeln!(out, "Rank {}: {}", record.rank_text(), record.display_name())?;

        if let Some(insights) = &classification.insights {
            let mut hints = Vec::new();
            if !insights.persons.is_empty() {
                hints.push(format!("Persons={}", join_tags(insights.persons.iter().map(String::as_str))));
            }
            if !insights.festivals.is_empty() {
                hints.push(format!("Festivals={}", join_tags(insights.festivals.iter().map(String::as_str))));
            }
            if !insights.context_flags.is_empty() {
                hints.push(format!("Flags={}", join_tags(insights.context_flags.iter().map(|f| f.as_str()))));
            }
            if !hints.is_empty() {
                writeln!(out, "   Insights: {}", hints.join(" | "))?;
            }
        }
        writeln!(
            out,
            "   Category: {} (Score {})",
            classification.category, classification.score
        )?;
        if trace {
            for (category, matches) in classification.matched_triggers.iter() {
                for hit in matches {
                    let detail = hit.detail();
                    let suffix = if detail.is_empty() {
                        String::new()
                    } else {
                        format!(" [{detail}]")
                    };
                    writeln!(out, "      + {}: {}{} +{}", category, hit.kind(), suffix, hit.score())?;
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Descending by inventory score, then by name; unscored records last.
fn by_inventory_score(a: &&ClassifiedRecord, b: &&ClassifiedRecord) -> Ordering {
    let key = |r: &ClassifiedRecord| r.record.score.as_ref().and_then(|n| n.as_f64());
    match (key(*b), key(*a)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.record.display_name().cmp(a.record.display_name()))
}

pub fn classification_summary(out: &mut impl Write, batch: &ClassificationBatch) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "CLASSIFICATION SUMMARY")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Total files classified: {}", batch.total())?;
    writeln!(out, "Classification errors: {}", batch.errors)?;
    writeln!(out)?;

    let mut ordered: Vec<(&str, Vec<&ClassifiedRecord>)> = batch
        .bucket_names()
        .filter(|name| *name != UNKNOWN_CATEGORY)
        .map(|name| (name, batch.bucket(name)))
        .collect();
    ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    for (name, mut items) in ordered {
        if items.is_empty() {
            continue;
        }
        writeln!(out, "   {}: {} files", name, items.len())?;
        items.sort_by(by_inventory_score);
        for item in items.iter().take(TOP_FILES) {
            let score = item
                .record
                .score
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(out, "      - {} (Score: {})", item.record.display_name(), score)?;
        }
        writeln!(out)?;
    }

    let unknown = batch.bucket(UNKNOWN_CATEGORY);
    if !unknown.is_empty() {
        writeln!(out, "   {}: {} files", UNKNOWN_CATEGORY, unknown.len())?;
        for item in unknown.iter().take(TOP_FILES) {
            writeln!(out, "      - {}", item.record.display_name())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn rename_lines(out: &mut impl Write, mappings: &[RenameMapping]) -> io::Result<()> {
    let mut current: Option<&str> = None;
    for mapping in mappings {
        if current != Some(mapping.category.as_str()) {
            if current.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "Processing {}:", mapping.category)?;
            current = Some(mapping.category.as_str());
        }
        writeln!(out, "   {} -> {}", mapping.old_file_name, mapping.new_file_name)?;
    }
    if current.is_some() {
        writeln!(out)?;
    }
    Ok(())
}

pub fn conflicts(out: &mut impl Write, report: &ConflictReport) -> io::Result<()> {
    if report.groups.is_empty() {
        writeln!(out, "No naming conflicts detected.")?;
        return Ok(());
    }
    for group in &report.groups {
        let state = if group.resolved { "resolved" } else { "unresolved" };
        writeln!(out, "Conflict: {} files -> {} ({})", group.members, group.path, state)?;
    }
    Ok(())
}

pub fn naming_summary(out: &mut impl Write, summary: &NamingSummary) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "NAMING CONVENTION SUMMARY")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Total files processed: {}", summary.total_files)?;
    writeln!(out, "Files with new names: {}", summary.files_renamed)?;
    writeln!(out, "Naming conflicts: {}", summary.conflicts)?;
    writeln!(out, "Unresolved conflicts: {}", summary.unresolved_conflicts)?;
    writeln!(out, "Processing errors: {}", summary.errors)?;
    Ok(())
}

pub fn plan_summary(out: &mut impl Write, plan: &RenamePlan, preview: bool) -> io::Result<()> {
    writeln!(
        out,
        "Loaded {} mappings. Valid: {}, Missing: {}",
        plan.summary.total, plan.summary.included, plan.summary.missing
    )?;
    writeln!(
        out,
        "Default backup behaviour for executor: {}",
        if plan.default_backup { "Enabled" } else { "Disabled" }
    )?;
    if preview {
        for item in plan.items.iter().take(PLAN_PREVIEW) {
            writeln!(out, " - [{}] {} -> {}", item.category, item.old_file_name, item.new_file_name)?;
        }
        if plan.items.len() > PLAN_PREVIEW {
            writeln!(out, "   ... and {} more", plan.items.len() - PLAN_PREVIEW)?;
        }
        if !plan.missing_items.is_empty() {
            writeln!(
                out,
                "(!) {} source files are missing and would be skipped",
                plan.missing_items.len()
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_core::config::ClassificationConfig;
    use organizer_core::models::FileRecord;
    use serde_json::json;

    fn batch() -> ClassificationBatch {
        let config = ClassificationConfig::from_json(
            &json!({
                "Categories": {
                    "Docs": {"Triggers": [{"Type": "Extension", "Values": [".md"], "Score": 1}]},
                    "Audio": {"Triggers": [{"Type": "Extension", "Values": [".wav"], "Score": 1}]}
                }
            })
            .to_string(),
            "inline",
        )
        .unwrap();
        let files: Vec<FileRecord> = serde_json::from_value(json!([
            {"Rank": 1, "FileName": "a.md", "Extension": ".md", "Score": 5},
            {"Rank": 2, "FileName": "b.md", "Extension": ".md"},
            {"Rank": 3, "FileName": "c.md", "Extension": ".md", "Score": 9},
            {"Rank": 4, "FileName": "d.wav", "Extension": ".wav", "Score": 1},
            {"Rank": 5, "FileName": "e.bin", "Extension": ".bin"}
        ]))
        .unwrap();
        config.classifier().classify(files)
    }

    #[test]
    fn summary_orders_buckets_and_top_files() {
        let mut out = Vec::new();
        classification_summary(&mut out, &batch()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let docs = text.find("Docs: 3 files").unwrap();
        let audio = text.find("Audio: 1 files").unwrap();
        assert!(docs < audio);
        let c = text.find("c.md (Score: 9)").unwrap();
        let a = text.find("a.md (Score: 5)").unwrap();
        let b = text.find("b.md (Score: n/a)").unwrap();
        assert!(c < a && a < b);
        assert!(text.contains("Unknown: 1 files\n      - e.bin"));
    }

    #[test]
    fn trace_lists_matched_triggers() {
        let mut out = Vec::new();
        file_results(&mut out, &batch(), true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Rank 1: a.md\n   Category: Docs (Score 1)\n      + Docs: Extension [.md] +1"));
    }
}
