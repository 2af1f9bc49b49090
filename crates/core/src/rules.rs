//! Triggers and naming-rule conditions, and the record view they are evaluated against.

use crate::error::ConfigError;
use crate::models::{value_text, FileRecord, TriggerMatch};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::warn;

/// Record field a regex is searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    FileName,
    FullPath,
    Directory,
    Keywords,
}

impl FieldTarget {
    /// Resolve a case-insensitive field alias.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "filename" | "name" => Some(FieldTarget::FileName),
            "fullpath" | "path" => Some(FieldTarget::FullPath),
            "directory" | "folder" => Some(FieldTarget::Directory),
            "keywords" => Some(FieldTarget::Keywords),
            _ => None,
        }
    }
}

/// Pre-normalized view of a record: lower-cased keyword set and dotted,
/// lower-cased extension.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub record: &'a FileRecord,
    pub file_name: &'a str,
    pub keywords: HashSet<String>,
    pub extension: String,
}

impl<'a> RuleContext<'a> {
    pub fn new(record: &'a FileRecord) -> Self {
        Self {
            record,
            file_name: record.file_name.as_deref().unwrap_or(""),
            keywords: record.keywords.iter().map(|k| k.to_lowercase()).collect(),
            extension: normalize_extension(&record.extension),
        }
    }

    pub fn text(&self, target: FieldTarget) -> Cow<'a, str> {
        match target {
            FieldTarget::FileName => Cow::Borrowed(self.file_name),
            FieldTarget::FullPath => Cow::Borrowed(self.record.full_path.as_deref().unwrap_or("")),
            FieldTarget::Directory => Cow::Borrowed(self.record.directory.as_deref().unwrap_or("")),
            FieldTarget::Keywords => Cow::Owned(self.record.keywords.join(" ")),
        }
    }

    /// Name, path, directory and keywords joined for insight scanning.
    pub fn searchable_text(&self) -> String {
        let keywords = self.record.keywords.join(" ");
        [
            self.file_name,
            self.record.full_path.as_deref().unwrap_or(""),
            self.record.directory.as_deref().unwrap_or(""),
            keywords.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Lower-case and dot-prefix an extension; empty stays empty.
pub fn normalize_extension(value: &str) -> String {
    let clean = value.trim().to_lowercase();
    if clean.is_empty() || clean.starts_with('.') {
        clean
    } else {
        format!(".{clean}")
    }
}

/// Compile a user pattern for case-insensitive substring search.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Trigger as written in the classification config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerSpec {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Target", default)]
    pub target: Option<String>,
    #[serde(rename = "Pattern", default)]
    pub pattern: Option<String>,
    #[serde(rename = "Values", default)]
    pub values: Option<Vec<Value>>,
    #[serde(rename = "Score", default)]
    pub score: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum Trigger {
    Regex {
        target: String,
        field: FieldTarget,
        pattern: Regex,
        score: u32,
    },
    Keyword {
        values: Vec<String>,
        score: u32,
    },
    Extension {
        values: Vec<String>,
        score: u32,
    },
}

impl Trigger {
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let spec = TriggerSpec::deserialize(value).map_err(|e| ConfigError::Malformed {
            what: "trigger",
            message: e.to_string(),
        })?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &TriggerSpec) -> Result<Self, ConfigError> {
        let score = parse_score(spec.score.as_ref())?;
        let kind = spec.kind.as_deref().unwrap_or("").trim().to_lowercase();
        match kind.as_str() {
            "regex" => {
                let text = spec
                    .pattern
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or(ConfigError::MissingPattern)?;
                let target = spec
                    .target
                    .clone()
                    .unwrap_or_else(|| "FileName".to_string());
                let field = FieldTarget::parse(&target).unwrap_or(FieldTarget::FileName);
                Ok(Trigger::Regex {
                    target,
                    field,
                    pattern: compile_pattern(text)?,
                    score,
                })
            }
            "keyword" => {
                let values: Vec<String> = spec_values(spec)
                    .map(|v| v.to_lowercase())
                    .collect();
                if values.is_empty() {
                    return Err(ConfigError::MissingValues("Keyword"));
                }
                Ok(Trigger::Keyword { values, score })
            }
            "extension" => {
                let values: Vec<String> = spec_values(spec)
                    .map(|v| normalize_extension(&v))
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    return Err(ConfigError::MissingValues("Extension"));
                }
                Ok(Trigger::Extension { values, score })
            }
            _ => Err(ConfigError::UnsupportedTrigger(
                spec.kind.clone().unwrap_or_default(),
            )),
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            Trigger::Regex { score, .. }
            | Trigger::Keyword { score, .. }
            | Trigger::Extension { score, .. } => *score,
        }
    }

    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        match self {
            Trigger::Regex { field, pattern, .. } => {
                let text = ctx.text(*field);
                !text.is_empty() && pattern.is_match(&text)
            }
            Trigger::Keyword { values, .. } => values.iter().any(|v| ctx.keywords.contains(v)),
            Trigger::Extension { values, .. } => values.iter().any(|v| *v == ctx.extension),
        }
    }

    pub fn describe(&self) -> TriggerMatch {
        match self {
            Trigger::Regex {
                target,
                pattern,
                score,
                ..
            } => TriggerMatch::Regex {
                target: target.clone(),
                pattern: pattern.as_str().to_string(),
                score: *score,
            },
            Trigger::Keyword { values, score } => TriggerMatch::Keyword {
                values: values.clone(),
                score: *score,
            },
            Trigger::Extension { values, score } => TriggerMatch::Extension {
                values: values.clone(),
                score: *score,
            },
        }
    }
}

fn spec_values(spec: &TriggerSpec) -> impl Iterator<Item = String> + '_ {
    spec.values
        .iter()
        .flatten()
        .filter(|v| !v.is_null())
        .map(value_text)
}

fn parse_score(value: Option<&Value>) -> Result<u32, ConfigError> {
    let raw = match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ConfigError::InvalidScore(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidScore(s.clone()))?,
        Some(other) => return Err(ConfigError::InvalidScore(other.to_string())),
    };
    if raw <= 0 {
        return Err(ConfigError::NonPositiveScore(raw));
    }
    u32::try_from(raw).map_err(|_| ConfigError::InvalidScore(raw.to_string()))
}

/// One `field → expected value` pair of a naming rule.
#[derive(Debug, Clone)]
pub enum Condition {
    Field { field: FieldTarget, pattern: Regex },
    /// Every listed keyword must be present.
    Keywords(Vec<String>),
    Extension(String),
    Unsupported(String),
}

impl Condition {
    pub fn parse(key: &str, expected: &Value) -> Result<Self, ConfigError> {
        if key.trim().eq_ignore_ascii_case("extension") {
            return Ok(Condition::Extension(normalize_extension(&value_text(expected))));
        }
        match FieldTarget::parse(key) {
            Some(FieldTarget::Keywords) => {
                let required = match expected {
                    Value::Array(items) => items
                        .iter()
                        .filter(|v| !v.is_null())
                        .map(|v| value_text(v).to_lowercase())
                        .collect(),
                    Value::Null => Vec::new(),
                    other => vec![value_text(other).to_lowercase()],
                };
                Ok(Condition::Keywords(required))
            }
            Some(field) => Ok(Condition::Field {
                field,
                pattern: compile_pattern(&value_text(expected))?,
            }),
            None => {
                warn!("unsupported naming condition '{}'", key);
                Ok(Condition::Unsupported(key.to_string()))
            }
        }
    }

    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        match self {
            Condition::Field { field, pattern } => {
                let text = ctx.text(*field);
                if text.is_empty() && *field != FieldTarget::FileName {
                    return false;
                }
                pattern.is_match(&text)
            }
            Condition::Keywords(required) => required.iter().all(|k| ctx.keywords.contains(k)),
            Condition::Extension(ext) => ctx.extension == *ext,
            Condition::Unsupported(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> FileRecord {
        serde_json::from_value(json!({
            "FileName": "Caleb_Interview_Final.TXT",
            "FullPath": "D:/transcripts/Caleb_Interview_Final.TXT",
            "Directory": "D:/transcripts",
            "Extension": "TXT",
            "Keywords": ["Caleb", "Festival"],
        }))
        .unwrap()
    }

    #[test]
    fn regex_trigger_is_case_insensitive_substring_search() {
        let trigger =
            Trigger::from_value(&json!({"Type": "Regex", "Pattern": "INTERVIEW", "Score": 3}))
                .unwrap();
        let rec = record();
        assert!(trigger.matches(&RuleContext::new(&rec)));
        assert_eq!(trigger.score(), 3);
    }

    #[test]
    fn regex_trigger_targets_aliases_and_falls_back_to_file_name() {
        let rec = record();
        let ctx = RuleContext::new(&rec);
        let folder = Trigger::from_value(
            &json!({"Type": "regex", "Target": "Folder", "Pattern": "^d:/trans", "Score": 1}),
        )
        .unwrap();
        assert!(folder.matches(&ctx));
        let odd = Trigger::from_value(
            &json!({"Type": "Regex", "Target": "Whatever", "Pattern": "final", "Score": 1}),
        )
        .unwrap();
        assert!(odd.matches(&ctx));
        let keywords = Trigger::from_value(
            &json!({"Type": "Regex", "Target": "keywords", "Pattern": "caleb festival", "Score": 1}),
        )
        .unwrap();
        assert!(keywords.matches(&ctx));
    }

    #[test]
    fn keyword_and_extension_triggers_use_normalized_fields() {
        let rec = record();
        let ctx = RuleContext::new(&rec);
        let kw = Trigger::from_value(&json!({"Type": "Keyword", "Values": ["FESTIVAL"], "Score": 2}))
            .unwrap();
        assert!(kw.matches(&ctx));
        let bare = Trigger::from_value(&json!({"Type": "Extension", "Values": ["txt"], "Score": 1}))
            .unwrap();
        assert!(bare.matches(&ctx));
        let other = Trigger::from_value(&json!({"Type": "Extension", "Values": [".md"], "Score": 1}))
            .unwrap();
        assert!(!other.matches(&ctx));
    }

    #[test]
    fn factory_rejects_bad_triggers() {
        assert_eq!(
            Trigger::from_value(&json!({"Type": "Regex", "Pattern": "x", "Score": 0})).unwrap_err(),
            ConfigError::NonPositiveScore(0)
        );
        assert_eq!(
            Trigger::from_value(&json!({"Type": "Regex", "Score": 2})).unwrap_err(),
            ConfigError::MissingPattern
        );
        assert_eq!(
            Trigger::from_value(&json!({"Type": "Keyword", "Values": [], "Score": 2})).unwrap_err(),
            ConfigError::MissingValues("Keyword")
        );
        assert_eq!(
            Trigger::from_value(&json!({"Type": "Glob", "Score": 2})).unwrap_err(),
            ConfigError::UnsupportedTrigger("Glob".into())
        );
        assert!(matches!(
            Trigger::from_value(&json!({"Type": "Regex", "Pattern": "(", "Score": 2})),
            Err(ConfigError::InvalidRegex { .. })
        ));
        assert!(matches!(
            Trigger::from_value(&json!("not an object")),
            Err(ConfigError::Malformed { .. })
        ));
        assert_eq!(
            Trigger::from_value(&json!({"Type": "Keyword", "Values": ["a"], "Score": "4"}))
                .unwrap()
                .score(),
            4
        );
    }

    #[test]
    fn conditions_follow_naming_semantics() {
        let rec = record();
        let ctx = RuleContext::new(&rec);
        assert!(Condition::parse("FileName", &json!("(?i)interview"))
            .unwrap()
            .matches(&ctx));
        assert!(Condition::parse("keywords", &json!(["caleb", "festival"]))
            .unwrap()
            .matches(&ctx));
        assert!(!Condition::parse("Keywords", &json!(["caleb", "missing"]))
            .unwrap()
            .matches(&ctx));
        assert!(Condition::parse("Extension", &json!("txt"))
            .unwrap()
            .matches(&ctx));
        assert!(!Condition::parse("Size", &json!("10"))
            .unwrap()
            .matches(&ctx));

        let bare: FileRecord = serde_json::from_value(json!({"FileName": "a.txt"})).unwrap();
        let bare_ctx = RuleContext::new(&bare);
        assert!(!Condition::parse("FullPath", &json!(".*"))
            .unwrap()
            .matches(&bare_ctx));
    }

    #[test]
    fn searchable_text_skips_empty_parts() {
        let rec: FileRecord =
            serde_json::from_value(json!({"FileName": "a.txt", "Keywords": ["x", "y"]})).unwrap();
        assert_eq!(RuleContext::new(&rec).searchable_text(), "a.txt x y");
    }
}
