use crate::error::{read_text, InputError};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// String-keyed map that keeps insertion order, both in memory and on the wire.
/// Re-inserting an existing key replaces the value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &V) -> bool) {
        self.entries.retain(|(k, v)| keep(k, v));
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// One file from the upstream inventory.
///
/// Deserialization accepts PascalCase and snake_case keys. After loading, a
/// missing file name is taken from the full path and the extension carries a
/// leading dot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFileRecord")]
pub struct FileRecord {
    #[serde(rename = "Rank")]
    pub rank: Option<i64>,
    #[serde(rename = "FileName")]
    pub file_name: Option<String>,
    #[serde(rename = "Score")]
    pub score: Option<serde_json::Number>,
    #[serde(rename = "FullPath")]
    pub full_path: Option<String>,
    #[serde(rename = "Directory")]
    pub directory: Option<String>,
    #[serde(rename = "Size")]
    pub size: Option<Value>,
    #[serde(rename = "SizeBytes")]
    pub size_bytes: Option<u64>,
    #[serde(rename = "Modified")]
    pub modified: Option<String>,
    #[serde(rename = "Keywords")]
    pub keywords: Vec<String>,
    #[serde(rename = "Extension")]
    pub extension: String,
    #[serde(rename = "Drive")]
    pub drive: Option<String>,
    #[serde(rename = "Exists")]
    pub exists: bool,
}

impl FileRecord {
    /// Inventory relevance score; absent scores count as zero.
    pub fn inventory_score(&self) -> f64 {
        self.score.as_ref().and_then(|n| n.as_f64()).unwrap_or(0.0)
    }

    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("unknown file")
    }

    pub fn rank_text(&self) -> String {
        self.rank.map(|r| r.to_string()).unwrap_or_default()
    }

    fn normalize(mut self) -> Self {
        if self.file_name.as_deref().map_or(true, str::is_empty) {
            if let Some(full) = self.full_path.as_deref().filter(|p| !p.is_empty()) {
                self.file_name = Path::new(full)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
            }
        }
        if !self.extension.is_empty() && !self.extension.starts_with('.') {
            self.extension = format!(".{}", self.extension);
        }
        self
    }
}

#[derive(Deserialize)]
struct RawFileRecord {
    #[serde(rename = "Rank", alias = "rank", default)]
    rank: Option<i64>,
    #[serde(rename = "FileName", alias = "filename", alias = "file_name", default)]
    file_name: Option<String>,
    #[serde(rename = "Score", alias = "score", default)]
    score: Option<serde_json::Number>,
    #[serde(rename = "FullPath", alias = "full_path", default)]
    full_path: Option<String>,
    #[serde(rename = "Directory", alias = "directory", default)]
    directory: Option<String>,
    #[serde(rename = "Size", alias = "size", default)]
    size: Option<Value>,
    #[serde(rename = "SizeBytes", alias = "size_bytes", default)]
    size_bytes: Option<u64>,
    #[serde(rename = "Modified", alias = "modified", default)]
    modified: Option<String>,
    #[serde(rename = "Keywords", alias = "keywords", default, deserialize_with = "keyword_list")]
    keywords: Vec<String>,
    #[serde(rename = "Extension", alias = "extension", default, deserialize_with = "null_as_default")]
    extension: String,
    #[serde(rename = "Drive", alias = "drive", default)]
    drive: Option<String>,
    #[serde(rename = "Exists", alias = "exists", default, deserialize_with = "null_as_default")]
    exists: bool,
}

impl From<RawFileRecord> for FileRecord {
    fn from(raw: RawFileRecord) -> Self {
        FileRecord {
            rank: raw.rank,
            file_name: raw.file_name,
            score: raw.score,
            full_path: raw.full_path,
            directory: raw.directory,
            size: raw.size,
            size_bytes: raw.size_bytes,
            modified: raw.modified,
            keywords: raw.keywords,
            extension: raw.extension,
            drive: raw.drive,
            exists: raw.exists,
        }
        .normalize()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn keyword_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect())
}

/// Render a JSON scalar the way it should appear inside a file name.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextFlag {
    ProductionMeta,
    SubjectResearch,
    TechnicalInterview,
}

impl ContextFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextFlag::ProductionMeta => "production_meta",
            ContextFlag::SubjectResearch => "subject_research",
            ContextFlag::TechnicalInterview => "technical_interview",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Insights {
    #[serde(rename = "Persons")]
    pub persons: BTreeSet<String>,
    #[serde(rename = "Festivals")]
    pub festivals: BTreeSet<String>,
    #[serde(rename = "ContextFlags")]
    pub context_flags: BTreeSet<ContextFlag>,
}

/// One entry of a record's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TriggerMatch {
    Regex {
        target: String,
        pattern: String,
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
    Heuristic {
        reason: String,
        score: u32,
    },
}

impl TriggerMatch {
    pub fn score(&self) -> u32 {
        match self {
            TriggerMatch::Regex { score, .. }
            | TriggerMatch::Keyword { score, .. }
            | TriggerMatch::Extension { score, .. }
            | TriggerMatch::Heuristic { score, .. } => *score,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TriggerMatch::Regex { .. } => "Regex",
            TriggerMatch::Keyword { .. } => "Keyword",
            TriggerMatch::Extension { .. } => "Extension",
            TriggerMatch::Heuristic { .. } => "Heuristic",
        }
    }

    /// The pattern, values or reason that fired.
    pub fn detail(&self) -> String {
        match self {
            TriggerMatch::Regex { pattern, .. } => pattern.clone(),
            TriggerMatch::Keyword { values, .. } | TriggerMatch::Extension { values, .. } => {
                values.join(",")
            }
            TriggerMatch::Heuristic { reason, .. } => reason.clone(),
        }
    }
}

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "CategoryScore")]
    pub score: u32,
    #[serde(rename = "CategoryScores", skip_serializing_if = "OrderedMap::is_empty")]
    pub category_scores: OrderedMap<u32>,
    #[serde(rename = "Insights", skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
    #[serde(rename = "MatchedTriggers", skip_serializing_if = "OrderedMap::is_empty")]
    pub matched_triggers: OrderedMap<Vec<TriggerMatch>>,
}

impl Classification {
    pub fn unknown() -> Self {
        Classification {
            category: UNKNOWN_CATEGORY.to_string(),
            score: 0,
            category_scores: OrderedMap::new(),
            insights: None,
            matched_triggers: OrderedMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: FileRecord,
    #[serde(flatten)]
    pub classification: Classification,
}

/// Parsed inventory input: `{"files": [...]}`.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub files: Vec<FileRecord>,
    pub summary: Option<Value>,
    pub missing_files: Option<Value>,
}

#[derive(Deserialize)]
struct RawInventory {
    #[serde(alias = "Files", default)]
    files: Option<Vec<FileRecord>>,
    #[serde(alias = "Summary", default)]
    summary: Option<Value>,
    #[serde(alias = "MissingFiles", default)]
    missing_files: Option<Value>,
}

impl Inventory {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        let raw: RawInventory =
            serde_json::from_str(text).map_err(|e| InputError::json(origin, e))?;
        let files = raw
            .files
            .ok_or(InputError::Missing("parsed JSON missing 'files' array"))?;
        Ok(Inventory {
            files,
            summary: raw.summary.filter(|v| !v.is_null()),
            missing_files: raw.missing_files.filter(|v| !v.is_null()),
        })
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = read_text(path)?;
        Self::from_json(&text, &path.display().to_string())
    }
}

/// Classification results as consumed by the naming stage. Only the
/// `Classifications` object is read; records keep their bucket order.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedInventory {
    pub classifications: OrderedMap<Vec<FileRecord>>,
}

#[derive(Deserialize)]
struct RawClassifiedInventory {
    #[serde(rename = "Classifications", default)]
    classifications: Option<OrderedMap<Vec<FileRecord>>>,
}

impl ClassifiedInventory {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        let raw: RawClassifiedInventory =
            serde_json::from_str(text).map_err(|e| InputError::json(origin, e))?;
        Ok(ClassifiedInventory {
            classifications: raw.classifications.unwrap_or_default(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = read_text(path)?;
        Self::from_json(&text, &path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationSummary {
    #[serde(rename = "TotalClassified")]
    pub total_classified: usize,
    #[serde(rename = "ClassificationErrors")]
    pub classification_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceData {
    #[serde(rename = "InputFile")]
    pub input_file: String,
    #[serde(rename = "OriginalSummary", skip_serializing_if = "Option::is_none")]
    pub original_summary: Option<Value>,
    #[serde(rename = "MissingFiles", skip_serializing_if = "Option::is_none")]
    pub missing_files: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationDocument {
    #[serde(rename = "GeneratedDate")]
    pub generated_date: String,
    #[serde(rename = "Summary")]
    pub summary: ClassificationSummary,
    #[serde(rename = "Classifications")]
    pub classifications: OrderedMap<Vec<ClassifiedRecord>>,
    #[serde(rename = "NamingConventions")]
    pub naming_conventions: OrderedMap<String>,
    #[serde(rename = "ConfigUsed", skip_serializing_if = "Option::is_none")]
    pub config_used: Option<String>,
    #[serde(rename = "SourceData", skip_serializing_if = "Option::is_none")]
    pub source_data: Option<SourceData>,
}

/// One planned rename: original record to new file name and path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameMapping {
    #[serde(rename = "OriginalFile")]
    pub original: FileRecord,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "OldFileName")]
    pub old_file_name: String,
    #[serde(rename = "NewFileName")]
    pub new_file_name: String,
    #[serde(rename = "OldPath")]
    pub old_path: Option<String>,
    #[serde(rename = "NewPath")]
    pub new_path: String,
    #[serde(rename = "Mapping")]
    pub mapping: OrderedMap<String>,
    #[serde(rename = "PatternUsed")]
    pub pattern_used: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamingSummary {
    #[serde(rename = "TotalFiles")]
    pub total_files: usize,
    #[serde(rename = "FilesRenamed")]
    pub files_renamed: usize,
    #[serde(rename = "Conflicts")]
    pub conflicts: usize,
    #[serde(rename = "UnresolvedConflicts")]
    pub unresolved_conflicts: usize,
    #[serde(rename = "Errors")]
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamingDocument {
    #[serde(rename = "GeneratedDate")]
    pub generated_date: String,
    #[serde(rename = "Summary")]
    pub summary: NamingSummary,
    #[serde(rename = "RenameMappings")]
    pub rename_mappings: Vec<RenameMapping>,
    #[serde(rename = "ConfigUsed", skip_serializing_if = "Option::is_none")]
    pub config_used: Option<String>,
    #[serde(rename = "PreviewOnly")]
    pub preview_only: bool,
}
