//! Secondary tags (people, festivals, context) derived from a record's text.
//! They only feed score bonuses; they never gate a category.

use crate::models::{ContextFlag, Insights};
use crate::rules::RuleContext;
use regex::Regex;
use std::sync::LazyLock;

/// Generic tag used when the keywords mention a festival we don't know by name.
pub const GENERIC_FESTIVAL: &str = "Festival";

fn compile(table: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(pattern, label)| {
            let re = Regex::new(&format!("(?i){pattern}")).expect("Invalid insight regex");
            (re, *label)
        })
        .collect()
}

static PERSON_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r"\bcaleb\b", "Caleb_Stewart"),
        (r"\brobyn\b", "Robyn_Stewart"),
        (r"\bhenry\b", "Henry_Stewart"),
        (r"\bjay\b", "Jay_Ricks"),
        (r"\bjock\b", "Jock_Bethune"),
        (r"\bbethune\b", "Jock_Bethune"),
        (r"\bstewart\b", "Stewart_Family"),
    ])
});

static FESTIVAL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r"all[ _-]*around", "All_Around_Film_Festival"),
        (r"sundance", "Sundance_Film_Festival"),
        (r"tribeca", "Tribeca_Film_Festival"),
        (r"outfest", "Outfest"),
        (r"slamdance", "Slamdance"),
    ])
});

static CONTEXT_PATTERNS: LazyLock<Vec<(ContextFlag, Vec<Regex>)>> = LazyLock::new(|| {
    let group = |patterns: &[&str]| -> Vec<Regex> {
        patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("Invalid context regex"))
            .collect()
    };
    vec![
        (
            ContextFlag::ProductionMeta,
            group(&[
                r"behind[ _-]*the[ _-]*scenes",
                r"\bproduction\b",
                r"\bworkflow\b",
                r"film[ _-]*journey",
            ]),
        ),
        (
            ContextFlag::SubjectResearch,
            group(&[r"\bhistory\b", r"\bresearch\b", r"\bbackground\b"]),
        ),
        (
            ContextFlag::TechnicalInterview,
            group(&[r"\bmixdown\b", r"\baudio\b"]),
        ),
    ]
});

/// Scan the record's searchable text against the fixed tables.
pub fn extract(ctx: &RuleContext<'_>) -> Insights {
    let text = ctx.searchable_text();
    let mut insights = Insights::default();

    for (pattern, label) in PERSON_PATTERNS.iter() {
        if pattern.is_match(&text) {
            insights.persons.insert((*label).to_string());
        }
    }
    for (pattern, label) in FESTIVAL_PATTERNS.iter() {
        if pattern.is_match(&text) {
            insights.festivals.insert((*label).to_string());
        }
    }
    if insights.festivals.is_empty() && ctx.keywords.contains("festival") {
        insights.festivals.insert(GENERIC_FESTIVAL.to_string());
    }
    for (flag, patterns) in CONTEXT_PATTERNS.iter() {
        if patterns.iter().any(|p| p.is_match(&text)) {
            insights.context_flags.insert(*flag);
        }
    }
    insights
}
