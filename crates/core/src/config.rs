use crate::classifier::{CategoryConfig, Classifier};
use crate::conflicts::DuplicateStrategy;
use crate::dates::{DateFormat, DEFAULT_DATE_FORMAT};
use crate::error::{read_text, ConfigError, ConfigIssue, InputError};
use crate::models::{value_text, OrderedMap};
use crate::naming::{CategoryNaming, NamingRule};
use crate::rules::{Condition, Trigger};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// Application settings: where inputs and outputs live by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub classification: ClassificationPaths,
    pub naming: NamingPaths,
    pub plan: PlanPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPaths {
    pub config: String,
    pub input: String,
    pub output: String,
}

impl Default for ClassificationPaths {
    fn default() -> Self {
        Self {
            config: "config/content_classification_config.json".into(),
            input: "parsed_file_data.json".into(),
            output: "content_classification_results.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingPaths {
    pub config: String,
    pub input: String,
    pub output: String,
    /// Destination directory when a record carries no usable location.
    pub fallback_dir: String,
    pub preview_only: bool,
}

impl Default for NamingPaths {
    fn default() -> Self {
        Self {
            config: "config/naming_convention_config.json".into(),
            input: "content_classification_results.json".into(),
            output: "rename_mappings.json".into(),
            fallback_dir: ".".into(),
            preview_only: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanPaths {
    pub input: String,
    pub output: String,
    pub include_backup: Option<bool>,
}

impl Default for PlanPaths {
    fn default() -> Self {
        Self {
            input: "rename_mappings.json".into(),
            output: "rename_plan.json".into(),
            include_backup: None,
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

// ---------------------------------------------------------------------------
// Classification rules
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawClassificationConfig {
    #[serde(rename = "CategoryPriority", default)]
    priority: Option<Vec<String>>,
    #[serde(rename = "Categories", default)]
    categories: Option<OrderedMap<RawCategory>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCategory {
    #[serde(rename = "Triggers")]
    triggers: Option<Vec<Value>>,
    #[serde(rename = "NamingConvention")]
    naming_convention: Option<String>,
}

/// Loaded classification rules. Triggers that failed validation are left out
/// and listed in `issues`.
#[derive(Debug, Clone, Default)]
pub struct ClassificationConfig {
    pub categories: Vec<CategoryConfig>,
    pub priority: Vec<String>,
    pub naming_conventions: OrderedMap<String>,
    pub issues: Vec<ConfigIssue>,
}

impl ClassificationConfig {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        let raw: RawClassificationConfig =
            serde_json::from_str(text).map_err(|e| InputError::json(origin, e))?;
        let categories_node = raw
            .categories
            .filter(|c| !c.is_empty())
            .ok_or(InputError::Missing("config missing 'Categories' section"))?;

        let mut config = ClassificationConfig {
            priority: raw.priority.unwrap_or_default(),
            ..Self::default()
        };
        for (name, body) in categories_node {
            let mut triggers = Vec::new();
            for (idx, payload) in body.triggers.unwrap_or_default().iter().enumerate() {
                match Trigger::from_value(payload) {
                    Ok(trigger) => triggers.push(trigger),
                    Err(err) => {
                        let issue = ConfigIssue::new(format!("{name} trigger #{}", idx + 1), err);
                        warn!("Skipping trigger: {}", issue);
                        config.issues.push(issue);
                    }
                }
            }
            let naming_convention = body.naming_convention.filter(|n| !n.is_empty());
            if let Some(convention) = &naming_convention {
                config.naming_conventions.insert(name.clone(), convention.clone());
            }
            config.categories.push(CategoryConfig {
                name,
                triggers,
                naming_convention,
            });
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = read_text(path)?;
        Self::from_json(&text, &path.display().to_string())
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.categories.clone(), &self.priority)
    }
}

// ---------------------------------------------------------------------------
// Naming rules
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawNamingConfig {
    #[serde(rename = "NamingRules", default)]
    rules: Option<OrderedMap<RawCategoryNaming>>,
    #[serde(rename = "GlobalSettings", default)]
    settings: Option<RawGlobalSettings>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCategoryNaming {
    #[serde(rename = "Pattern")]
    pattern: Option<String>,
    #[serde(rename = "Rules")]
    rules: Option<Vec<RawNamingRule>>,
    #[serde(rename = "DefaultMapping")]
    default_mapping: Option<OrderedMap<Value>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawNamingRule {
    #[serde(rename = "Condition")]
    condition: Option<OrderedMap<Value>>,
    #[serde(rename = "Mapping")]
    mapping: Option<OrderedMap<Value>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawGlobalSettings {
    #[serde(rename = "DateFormat")]
    date_format: Option<String>,
    #[serde(rename = "HandleDuplicates")]
    duplicates: Option<DuplicateStrategy>,
    #[serde(rename = "PreservePaths")]
    preserve_paths: Option<bool>,
    #[serde(rename = "BackupOriginals")]
    backup_originals: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSettings {
    pub date_format: DateFormat,
    pub duplicates: DuplicateStrategy,
    pub preserve_paths: bool,
    pub backup_originals: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            date_format: DateFormat::default(),
            duplicates: DuplicateStrategy::default(),
            preserve_paths: true,
            backup_originals: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamingConfig {
    pub categories: OrderedMap<CategoryNaming>,
    pub settings: GlobalSettings,
    pub issues: Vec<ConfigIssue>,
}

fn text_mapping(raw: Option<OrderedMap<Value>>) -> OrderedMap<String> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(token, value)| (token, value_text(&value)))
        .collect()
}

fn build_rule(raw: RawNamingRule) -> Result<NamingRule, ConfigError> {
    let conditions = raw
        .condition
        .unwrap_or_default()
        .iter()
        .map(|(key, expected)| Condition::parse(key, expected))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NamingRule {
        conditions,
        mapping: text_mapping(raw.mapping),
    })
}

impl NamingConfig {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        let raw: RawNamingConfig =
            serde_json::from_str(text).map_err(|e| InputError::json(origin, e))?;
        let rules_node = raw
            .rules
            .ok_or(InputError::Missing("config missing 'NamingRules' object"))?;

        let mut config = NamingConfig::default();
        let settings = raw.settings.unwrap_or_default();
        let neutral = settings
            .date_format
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        config.settings.date_format = match DateFormat::parse(&neutral) {
            Ok(format) => format,
            Err(err) => {
                let issue = ConfigIssue::new("GlobalSettings.DateFormat", err);
                warn!("{}; using {}", issue, DEFAULT_DATE_FORMAT);
                config.issues.push(issue);
                DateFormat::default()
            }
        };
        if let Some(strategy) = settings.duplicates {
            config.settings.duplicates = strategy;
        }
        config.settings.preserve_paths = settings.preserve_paths.unwrap_or(true);
        config.settings.backup_originals = settings.backup_originals.unwrap_or(true);

        for (category, body) in rules_node {
            let mut rules = Vec::new();
            for (idx, raw_rule) in body.rules.unwrap_or_default().into_iter().enumerate() {
                match build_rule(raw_rule) {
                    Ok(rule) => rules.push(rule),
                    Err(err) => {
                        let issue = ConfigIssue::new(format!("{category} rule #{}", idx + 1), err);
                        warn!("Dropping naming rule: {}", issue);
                        config.issues.push(issue);
                    }
                }
            }
            config.categories.insert(
                category,
                CategoryNaming {
                    pattern: body.pattern,
                    rules,
                    default_mapping: text_mapping(body.default_mapping),
                },
            );
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = read_text(path)?;
        Self::from_json(&text, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_config_falls_back_to_defaults() {
        assert!(load(Some("does/not/exist/settings")).is_err());
        let cfg = load(None).unwrap();
        assert_eq!(cfg.naming.fallback_dir, ".");
        assert_eq!(cfg.plan.output, "rename_plan.json");
        assert_eq!(cfg.classification.config, "config/content_classification_config.json");
    }

    #[test]
    fn skips_bad_triggers_and_keeps_category() {
        let text = json!({
            "CategoryPriority": ["Docs"],
            "Categories": {
                "Docs": {
                    "Triggers": [
                        {"Type": "Regex", "Pattern": "doc", "Score": 2},
                        {"Type": "Regex", "Pattern": "x", "Score": -1},
                        {"Type": "Fuzzy", "Score": 1}
                    ],
                    "NamingConvention": "GW_Doc_{Date}.{ext}"
                },
                "Other": {"NamingConvention": ""}
            }
        })
        .to_string();
        let cfg = ClassificationConfig::from_json(&text, "inline").unwrap();
        assert_eq!(cfg.categories.len(), 2);
        assert_eq!(cfg.categories[0].triggers.len(), 1);
        assert_eq!(cfg.issues.len(), 2);
        assert_eq!(cfg.issues[0].error, ConfigError::NonPositiveScore(-1));
        assert_eq!(cfg.naming_conventions.keys().collect::<Vec<_>>(), vec!["Docs"]);
        assert_eq!(cfg.classifier().priority().collect::<Vec<_>>(), vec!["Docs", "Other"]);
    }

    #[test]
    fn empty_categories_is_an_input_error() {
        for text in [r#"{}"#, r#"{"Categories": {}}"#] {
            assert!(matches!(
                ClassificationConfig::from_json(text, "inline"),
                Err(InputError::Missing(_))
            ));
        }
        assert!(matches!(
            ClassificationConfig::from_json("{not json", "inline"),
            Err(InputError::Json { .. })
        ));
    }

    #[test]
    fn naming_settings_have_defaults() {
        let cfg = NamingConfig::from_json(r#"{"NamingRules": {}}"#, "inline").unwrap();
        assert_eq!(cfg.settings, GlobalSettings::default());
        assert!(cfg.issues.is_empty());
        assert!(matches!(
            NamingConfig::from_json(r#"{"GlobalSettings": {}}"#, "inline"),
            Err(InputError::Missing(_))
        ));
    }

    #[test]
    fn invalid_date_format_falls_back_and_is_reported() {
        let cfg = NamingConfig::from_json(
            r#"{"NamingRules": {}, "GlobalSettings": {"DateFormat": "yyyy%", "HandleDuplicates": "AppendRank", "BackupOriginals": false}}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(cfg.settings.date_format, DateFormat::default());
        assert_eq!(cfg.settings.duplicates, DuplicateStrategy::AppendRank);
        assert!(!cfg.settings.backup_originals);
        assert_eq!(
            cfg.issues[0].error,
            ConfigError::InvalidDateFormat("yyyy%".into())
        );
    }

    #[test]
    fn rule_with_bad_regex_is_dropped() {
        let cfg = NamingConfig::from_json(
            &json!({
                "NamingRules": {
                    "Docs": {
                        "Pattern": "{Type}.{ext}",
                        "Rules": [
                            {"Condition": {"FileName": "("}, "Mapping": {"Type": "Broken"}},
                            {"Condition": {"FileName": "guide"}, "Mapping": {"Type": "Guide", "Version": 2, "Draft": null}}
                        ]
                    }
                }
            })
            .to_string(),
            "inline",
        )
        .unwrap();
        let docs = cfg.categories.get("Docs").unwrap();
        assert_eq!(docs.rules.len(), 1);
        assert_eq!(docs.rules[0].mapping.get("Version").map(String::as_str), Some("2"));
        assert_eq!(docs.rules[0].mapping.get("Draft").map(String::as_str), Some(""));
        assert_eq!(cfg.issues.len(), 1);
    }
}
