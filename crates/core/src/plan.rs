//! Rename plan: the hand-off from naming to whatever performs the renames.

use crate::error::{read_text, InputError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// The subset of a rename mapping the plan needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanMapping {
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "OldPath", default)]
    pub old_path: Option<String>,
    #[serde(rename = "NewPath")]
    pub new_path: String,
    #[serde(rename = "OldFileName", default)]
    pub old_file_name: Option<String>,
    #[serde(rename = "NewFileName")]
    pub new_file_name: String,
}

/// A naming output document as read back for planning.
#[derive(Debug, Clone, Default)]
pub struct MappingFile {
    pub mappings: Vec<PlanMapping>,
    pub config_used: Option<String>,
}

#[derive(Deserialize)]
struct RawMappingFile {
    #[serde(rename = "RenameMappings", default)]
    mappings: Option<Vec<PlanMapping>>,
    #[serde(rename = "ConfigUsed", default)]
    config_used: Option<String>,
}

impl MappingFile {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        let raw: RawMappingFile =
            serde_json::from_str(text).map_err(|e| InputError::json(origin, e))?;
        Ok(MappingFile {
            mappings: raw
                .mappings
                .ok_or(InputError::Missing("input JSON missing 'RenameMappings' array"))?,
            config_used: raw.config_used.filter(|c| !c.is_empty()),
        })
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = read_text(path)?;
        Self::from_json(&text, &path.display().to_string())
    }

    /// `GlobalSettings.BackupOriginals` of the naming config that produced
    /// this file. Anything unreadable means `true`.
    pub fn default_backup(&self) -> bool {
        let Some(path) = self.config_used.as_deref() else {
            return true;
        };
        let setting = read_text(Path::new(path))
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .and_then(|cfg| cfg.get("GlobalSettings")?.get("BackupOriginals")?.as_bool());
        debug!(config = path, ?setting, "backup default");
        setting.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanItem {
    pub category: String,
    pub old_path: String,
    pub new_path: String,
    pub old_file_name: String,
    pub new_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingItem {
    pub category: String,
    pub old_path: Option<String>,
    pub old_file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total: usize,
    pub included: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub default_backup: bool,
    pub summary: PlanSummary,
    pub items: Vec<PlanItem>,
    pub missing_items: Vec<MissingItem>,
}

impl RenamePlan {
    pub fn is_actionable(&self) -> bool {
        !self.items.is_empty()
    }
}

/// Plan document as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDocument {
    pub generated_at: String,
    pub source_mapping: String,
    #[serde(flatten)]
    pub plan: RenamePlan,
}

/// Split mappings by whether their source file exists. A mapping with no
/// source path is always missing.
pub fn build_plan(
    mappings: &[PlanMapping],
    default_backup: bool,
    source_exists: impl Fn(&Path) -> bool,
) -> RenamePlan {
    let mut items = Vec::new();
    let mut missing_items = Vec::new();
    for mapping in mappings {
        let old_file_name = mapping.old_file_name.clone().unwrap_or_default();
        match mapping.old_path.as_deref().filter(|p| !p.is_empty()) {
            Some(old_path) if source_exists(Path::new(old_path)) => items.push(PlanItem {
                category: mapping.category.clone(),
                old_path: old_path.to_string(),
                new_path: mapping.new_path.clone(),
                old_file_name,
                new_file_name: mapping.new_file_name.clone(),
            }),
            _ => missing_items.push(MissingItem {
                category: mapping.category.clone(),
                old_path: mapping.old_path.clone(),
                old_file_name,
            }),
        }
    }
    info!(
        "Rename plan: {} included, {} missing",
        items.len(),
        missing_items.len()
    );
    RenamePlan {
        default_backup,
        summary: PlanSummary {
            total: items.len() + missing_items.len(),
            included: items.len(),
            missing: missing_items.len(),
        },
        items,
        missing_items,
    }
}
