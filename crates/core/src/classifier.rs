use crate::error::RecordError;
use crate::insights;
use crate::models::{
    Classification, ClassifiedRecord, ContextFlag, FileRecord, Insights, OrderedMap, TriggerMatch,
    UNKNOWN_CATEGORY,
};
use crate::rules::{RuleContext, Trigger};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CategoryConfig {
    pub name: String,
    pub triggers: Vec<Trigger>,
    /// Carried through to the export only.
    pub naming_convention: Option<String>,
}

/// Insight-driven bonuses: (condition, category, reason). Each is worth 1.
enum Bonus {
    AnyFestival,
    Flag(ContextFlag),
}

const BONUSES: &[(Bonus, &str, &str)] = &[
    (Bonus::AnyFestival, "Interview_Transcripts", "Festival context bonus"),
    (Bonus::AnyFestival, "Strategy_Documents", "Festival context bonus"),
    (
        Bonus::Flag(ContextFlag::ProductionMeta),
        "Production_Documents",
        "Production meta context",
    ),
    (
        Bonus::Flag(ContextFlag::SubjectResearch),
        "Data_Reports",
        "Subject research context",
    ),
    (
        Bonus::Flag(ContextFlag::TechnicalInterview),
        "Interview_Transcripts",
        "Technical interview context",
    ),
];

const BONUS_SCORE: u32 = 1;

impl Bonus {
    fn applies(&self, insights: &Insights) -> bool {
        match self {
            Bonus::AnyFestival => !insights.festivals.is_empty(),
            Bonus::Flag(flag) => insights.context_flags.contains(flag),
        }
    }
}

/// Per-category accumulator for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTally {
    pub score: u32,
    pub matches: Vec<TriggerMatch>,
}

impl CategoryTally {
    fn add(&mut self, category: &str, hit: TriggerMatch) -> Result<(), RecordError> {
        self.score = self
            .score
            .checked_add(hit.score())
            .ok_or_else(|| RecordError::ScoreOverflow(category.to_string()))?;
        self.matches.push(hit);
        Ok(())
    }
}

/// Score board keyed by every category in priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBoard {
    tallies: OrderedMap<CategoryTally>,
}

impl ScoreBoard {
    pub fn get(&self, category: &str) -> Option<&CategoryTally> {
        self.tallies.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryTally)> {
        self.tallies.iter()
    }

    /// Highest score in priority order; ties keep the earlier category.
    /// Zero never wins.
    pub fn resolve(&self) -> (String, u32) {
        let mut best: Option<(&str, u32)> = None;
        for (name, tally) in self.tallies.iter() {
            if best.map_or(true, |(_, score)| tally.score > score) {
                best = Some((name, tally.score));
            }
        }
        match best {
            Some((name, score)) if score > 0 => (name.to_string(), score),
            _ => (UNKNOWN_CATEGORY.to_string(), 0),
        }
    }
}

pub struct Classifier {
    categories: Vec<CategoryConfig>,
}

impl Classifier {
    /// Orders categories by `priority`; unknown names are dropped, duplicates
    /// ignored, and unlisted categories appended in declaration order.
    pub fn new(categories: Vec<CategoryConfig>, priority: &[String]) -> Self {
        let mut pending: Vec<Option<CategoryConfig>> = categories.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(pending.len());
        for name in priority {
            if let Some(slot) = pending
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|c| &c.name == name))
            {
                ordered.extend(slot.take());
            }
        }
        ordered.extend(pending.into_iter().flatten());
        Self { categories: ordered }
    }

    pub fn priority(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn categories(&self) -> &[CategoryConfig] {
        &self.categories
    }

    /// Trigger scores plus insight bonuses for one record.
    pub fn score(
        &self,
        ctx: &RuleContext<'_>,
        insights: &Insights,
    ) -> Result<ScoreBoard, RecordError> {
        let mut board = ScoreBoard::default();
        for category in &self.categories {
            let mut tally = CategoryTally::default();
            for trigger in &category.triggers {
                if trigger.matches(ctx) {
                    tally.add(&category.name, trigger.describe())?;
                }
            }
            board.tallies.insert(category.name.clone(), tally);
        }

        for (bonus, category, reason) in BONUSES {
            if !bonus.applies(insights) {
                continue;
            }
            if let Some(tally) = board.tallies.get_mut(category) {
                tally.add(
                    category,
                    TriggerMatch::Heuristic {
                        reason: (*reason).to_string(),
                        score: BONUS_SCORE,
                    },
                )?;
            }
        }
        Ok(board)
    }

    pub fn classify_record(&self, record: &FileRecord) -> Result<Classification, RecordError> {
        let ctx = RuleContext::new(record);
        let insights = insights::extract(&ctx);
        let board = self.score(&ctx, &insights)?;
        let (category, score) = board.resolve();

        let category_scores = board
            .iter()
            .filter(|(_, t)| t.score > 0)
            .map(|(name, t)| (name.to_string(), t.score))
            .collect();
        let matched_triggers = board
            .iter()
            .filter(|(_, t)| !t.matches.is_empty())
            .map(|(name, t)| (name.to_string(), t.matches.clone()))
            .collect();

        Ok(Classification {
            category,
            score,
            category_scores,
            insights: Some(insights),
            matched_triggers,
        })
    }

    /// Classify every record. A failing record lands in `Unknown` and is
    /// counted; the batch always completes.
    pub fn classify(&self, records: Vec<FileRecord>) -> ClassificationBatch {
        let mut buckets: OrderedMap<Vec<usize>> = self
            .priority()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        if !buckets.contains_key(UNKNOWN_CATEGORY) {
            buckets.insert(UNKNOWN_CATEGORY, Vec::new());
        }

        let mut classified = Vec::with_capacity(records.len());
        let mut errors = 0;
        for record in records {
            let classification = match self.classify_record(&record) {
                Ok(c) => c,
                Err(err) => {
                    errors += 1;
                    warn!(
                        "Classification error for {}: {}",
                        record.display_name(),
                        err
                    );
                    Classification::unknown()
                }
            };
            debug!(
                file = record.display_name(),
                category = %classification.category,
                score = classification.score,
                "classified"
            );
            let index = classified.len();
            match buckets.get_mut(&classification.category) {
                Some(bucket) => bucket.push(index),
                None => {
                    buckets.insert(classification.category.clone(), vec![index]);
                }
            }
            classified.push(ClassifiedRecord {
                record,
                classification,
            });
        }

        info!(
            "Classified {} files into {} categories ({} errors)",
            classified.len(),
            buckets.iter().filter(|(_, b)| !b.is_empty()).count(),
            errors
        );
        ClassificationBatch {
            records: classified,
            buckets,
            errors,
        }
    }
}

/// Classified records in input order, plus bucket membership by index.
#[derive(Debug, Clone)]
pub struct ClassificationBatch {
    pub records: Vec<ClassifiedRecord>,
    buckets: OrderedMap<Vec<usize>>,
    pub errors: usize,
}

impl ClassificationBatch {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn bucket_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys()
    }

    pub fn bucket(&self, category: &str) -> Vec<&ClassifiedRecord> {
        self.buckets
            .get(category)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Bucket name → records, every bucket present.
    pub fn to_buckets(&self) -> OrderedMap<Vec<ClassifiedRecord>> {
        self.buckets
            .iter()
            .map(|(name, ids)| {
                let records = ids.iter().map(|&i| self.records[i].clone()).collect();
                (name.to_string(), records)
            })
            .collect()
    }

    /// Bucket name → raw records, as the naming stage reads them.
    pub fn to_file_buckets(&self) -> OrderedMap<Vec<FileRecord>> {
        self.buckets
            .iter()
            .map(|(name, ids)| {
                let records = ids.iter().map(|&i| self.records[i].record.clone()).collect();
                (name.to_string(), records)
            })
            .collect()
    }
}
