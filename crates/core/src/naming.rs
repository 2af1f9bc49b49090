//! Pattern-based file naming: rule selection, placeholder substitution and
//! destination paths.

use crate::config::{GlobalSettings, NamingConfig};
use crate::dates::{resolve_date, Clock};
use crate::error::{ConfigError, ConfigIssue, RecordError};
use crate::models::{FileRecord, OrderedMap, RenameMapping};
use crate::rules::{Condition, RuleContext};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const UNKNOWN_TOKEN_VALUE: &str = "Unknown";

static LEFTOVER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}").expect("Invalid regex"));

/// Conditions that must all hold for `mapping` to be used.
#[derive(Debug, Clone)]
pub struct NamingRule {
    pub conditions: Vec<Condition>,
    pub mapping: OrderedMap<String>,
}

impl NamingRule {
    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        self.conditions.iter().all(|c| c.matches(ctx))
    }
}

/// Naming setup for one category.
#[derive(Debug, Clone, Default)]
pub struct CategoryNaming {
    pub pattern: Option<String>,
    pub rules: Vec<NamingRule>,
    pub default_mapping: OrderedMap<String>,
}

impl CategoryNaming {
    /// First fully matching rule's mapping, else the default mapping.
    pub fn select_mapping(&self, ctx: &RuleContext<'_>) -> OrderedMap<String> {
        self.rules
            .iter()
            .find(|rule| rule.matches(ctx))
            .map(|rule| rule.mapping.clone())
            .unwrap_or_else(|| self.default_mapping.clone())
    }
}

/// Substitute mapped tokens in mapping order, then blank out the rest.
pub fn replace_placeholders(pattern: &str, mapping: &OrderedMap<String>) -> String {
    let mut name = pattern.to_string();
    for (token, value) in mapping.iter() {
        let value = if value.is_empty() {
            UNKNOWN_TOKEN_VALUE
        } else {
            value.as_str()
        };
        name = name.replace(&format!("{{{token}}}"), value);
    }
    LEFTOVER_TOKEN
        .replace_all(&name, UNKNOWN_TOKEN_VALUE)
        .into_owned()
}

/// Output of one naming pass, before conflict resolution.
#[derive(Debug, Clone, Default)]
pub struct NamingBatch {
    pub mappings: Vec<RenameMapping>,
    /// Files in categories that had a usable rule set.
    pub total_files: usize,
    pub errors: usize,
    /// Categories skipped for configuration problems.
    pub skipped: Vec<ConfigIssue>,
}

impl NamingBatch {
    pub fn renamed(&self) -> usize {
        self.mappings.len()
    }
}

pub struct NamingEngine<'a> {
    config: &'a NamingConfig,
    clock: &'a dyn Clock,
    fallback_dir: PathBuf,
}

impl<'a> NamingEngine<'a> {
    pub fn new(config: &'a NamingConfig, clock: &'a dyn Clock, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            clock,
            fallback_dir: fallback_dir.into(),
        }
    }

    fn settings(&self) -> &GlobalSettings {
        &self.config.settings
    }

    /// Directory the renamed file lands in.
    pub fn destination_dir(&self, record: &FileRecord) -> PathBuf {
        if !self.settings().preserve_paths {
            return self.fallback_dir.clone();
        }
        let from_full_path = record
            .full_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .and_then(|p| Path::new(p).parent())
            .filter(|parent| !parent.as_os_str().is_empty());
        if let Some(parent) = from_full_path {
            return parent.to_path_buf();
        }
        match record.directory.as_deref().filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => self.fallback_dir.clone(),
        }
    }

    pub fn name_record(
        &self,
        category: &str,
        naming: &CategoryNaming,
        pattern: &str,
        record: &FileRecord,
    ) -> Result<RenameMapping, RecordError> {
        let old_file_name = record.file_name.clone().unwrap_or_default();
        let ctx = RuleContext::new(record);
        let mut mapping = naming.select_mapping(&ctx);

        if pattern.contains("{Date}") && !mapping.contains_key("Date") {
            let date = resolve_date(&old_file_name, record.modified.as_deref(), self.clock);
            mapping.insert("Date", self.settings().date_format.render(&date)?);
        }
        if pattern.contains("{ext}") && !mapping.contains_key("ext") {
            mapping.insert("ext", ctx.extension.trim_start_matches('.').to_string());
        }
        if pattern.contains("{Rank}") && !mapping.contains_key("Rank") {
            mapping.insert("Rank", record.rank_text());
        }

        let new_file_name = replace_placeholders(pattern, &mapping);
        if new_file_name.trim().is_empty() {
            return Err(RecordError::EmptyFileName(pattern.to_string()));
        }
        let new_path = self
            .destination_dir(record)
            .join(&new_file_name)
            .to_string_lossy()
            .into_owned();

        Ok(RenameMapping {
            original: record.clone(),
            category: category.to_string(),
            old_file_name,
            new_file_name,
            old_path: record.full_path.clone(),
            new_path,
            mapping,
            pattern_used: pattern.to_string(),
        })
    }

    /// Name every file of every non-empty bucket, in bucket order.
    pub fn generate(&self, classifications: &OrderedMap<Vec<FileRecord>>) -> NamingBatch {
        let mut batch = NamingBatch::default();
        for (category, files) in classifications.iter() {
            if files.is_empty() {
                continue;
            }
            let Some(naming) = self.config.categories.get(category) else {
                let issue = ConfigIssue::new(category, ConfigError::MissingRuleSet(category.to_string()));
                warn!("{}; skipping {} files", issue, files.len());
                batch.errors += files.len();
                batch.skipped.push(issue);
                continue;
            };
            let Some(pattern) = naming.pattern.as_deref().filter(|p| !p.is_empty()) else {
                let issue = ConfigIssue::new(
                    category,
                    ConfigError::MissingNamingPattern(category.to_string()),
                );
                warn!("{}; skipping {} files", issue, files.len());
                batch.errors += files.len();
                batch.skipped.push(issue);
                continue;
            };

            batch.total_files += files.len();
            for record in files {
                match self.name_record(category, naming, pattern, record) {
                    Ok(mapping) => {
                        debug!(
                            category,
                            old = %mapping.old_file_name,
                            new = %mapping.new_file_name,
                            "named"
                        );
                        batch.mappings.push(mapping);
                    }
                    Err(err) => {
                        batch.errors += 1;
                        warn!("Naming error for {}: {}", record.display_name(), err);
                    }
                }
            }
        }
        info!(
            "Generated {} rename mappings from {} files ({} errors)",
            batch.renamed(),
            batch.total_files,
            batch.errors
        );
        batch
    }
}
