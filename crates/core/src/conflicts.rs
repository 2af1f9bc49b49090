use crate::models::RenameMapping;
use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// How colliding target paths are told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DuplicateStrategy {
    #[default]
    AddVersion,
    AppendRank,
    /// Anything else: collisions are reported but left in place.
    Other(String),
}

impl DuplicateStrategy {
    pub fn parse(name: &str) -> Self {
        match name {
            "AddVersion" => DuplicateStrategy::AddVersion,
            "AppendRank" => DuplicateStrategy::AppendRank,
            other => DuplicateStrategy::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DuplicateStrategy::AddVersion => "AddVersion",
            DuplicateStrategy::AppendRank => "AppendRank",
            DuplicateStrategy::Other(name) => name,
        }
    }

    /// Suffix for the member at `position` in its group. `attempt` counts
    /// earlier candidates that were already taken.
    fn suffix(&self, position: usize, attempt: usize, mapping: &RenameMapping) -> Option<String> {
        match self {
            DuplicateStrategy::AddVersion => Some(format!("_v{}", position + 1 + attempt)),
            DuplicateStrategy::AppendRank => {
                let rank = mapping
                    .original
                    .rank
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "?".to_string());
                Some(match attempt {
                    0 => format!("_rank{rank}"),
                    n => format!("_rank{rank}_v{}", n + 1),
                })
            }
            DuplicateStrategy::Other(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for DuplicateStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(DuplicateStrategy::parse(&name))
    }
}

/// One group of mappings that shared a target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictGroup {
    pub path: String,
    pub members: usize,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub groups: Vec<ConflictGroup>,
}

impl ConflictReport {
    /// Number of colliding groups found.
    pub fn conflicts(&self) -> usize {
        self.groups.len()
    }

    pub fn unresolved(&self) -> usize {
        self.groups.iter().filter(|g| !g.resolved).count()
    }
}

/// Split at the last dot. A leading or trailing dot is not an extension
/// separator.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Disambiguate mappings that target the same path.
///
/// Groups are formed in first-appearance order of `NewPath`; within a group
/// mappings are ordered by inventory score, highest first. The leader keeps
/// its name, the rest are suffixed by position (`AddVersion`) or by rank
/// (`AppendRank`). A suffixed path never lands on a path already in use;
/// the next free version is taken instead.
pub fn resolve_conflicts(
    mappings: &mut [RenameMapping],
    strategy: &DuplicateStrategy,
) -> ConflictReport {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (idx, mapping) in mappings.iter().enumerate() {
        match index.get(mapping.new_path.as_str()) {
            Some(&group) => groups[group].1.push(idx),
            None => {
                index.insert(&mapping.new_path, groups.len());
                groups.push((mapping.new_path.clone(), vec![idx]));
            }
        }
    }
    drop(index);

    let mut taken: HashSet<PathBuf> = groups.iter().map(|(path, _)| PathBuf::from(path)).collect();
    let mut report = ConflictReport::default();
    for (path, mut members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
        members.sort_by(|&a, &b| {
            mappings[b]
                .original
                .inventory_score()
                .partial_cmp(&mappings[a].original.inventory_score())
                .unwrap_or(Ordering::Equal)
        });

        let resolved = !matches!(strategy, DuplicateStrategy::Other(_));
        if resolved {
            for (position, &idx) in members.iter().enumerate().skip(1) {
                let mapping = &mut mappings[idx];
                let mut attempt = 0;
                while let Some(suffix) = strategy.suffix(position, attempt, mapping) {
                    let (name, candidate) = suffixed(mapping, &suffix);
                    if taken.insert(PathBuf::from(&candidate)) {
                        mapping.new_file_name = name;
                        mapping.new_path = candidate;
                        break;
                    }
                    attempt += 1;
                }
            }
        } else {
            warn!(
                "{} files share target {} and strategy '{}' does not resolve them",
                members.len(),
                path,
                strategy.as_str()
            );
        }
        report.groups.push(ConflictGroup {
            path,
            members: members.len(),
            resolved,
        });
    }
    report
}

/// New file name and path with `suffix` placed before the extension.
fn suffixed(mapping: &RenameMapping, suffix: &str) -> (String, String) {
    let (stem, ext) = split_file_name(&mapping.new_file_name);
    let new_name = format!("{stem}{suffix}{ext}");
    let parent = Path::new(&mapping.new_path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let new_path = parent.join(&new_name).to_string_lossy().into_owned();
    (new_name, new_path)
}
