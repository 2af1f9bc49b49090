use chrono::NaiveDate;
use organizer_cli::classify::{self, ClassifyOptions, NamingStage};
use organizer_cli::name::{self, NameOptions};
use organizer_cli::plan::{self, PlanOptions};
use organizer_core::dates::FixedClock;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn sample_config(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
    )
}

/// Inventory over real files in `src`, plus one missing file and one
/// record without a path.
fn write_inventory(root: &Path) -> PathBuf {
    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();
    for name in [
        "Caleb_Festival_Interview.txt",
        "stats_report_20240101.csv",
        "page.html",
        "photo.jpg",
    ] {
        fs::write(src.join(name), "x").unwrap();
    }
    let path_of = |name: &str| src.join(name).to_string_lossy().into_owned();
    let inventory = json!({
        "files": [
            {"rank": 1, "filename": "Caleb_Festival_Interview.txt", "full_path": path_of("Caleb_Festival_Interview.txt"),
             "extension": ".txt", "keywords": ["caleb", "festival"], "modified": "2024-03-02T10:00:00", "score": 40},
            {"rank": 2, "filename": "stats_report_20240101.csv", "full_path": path_of("stats_report_20240101.csv"),
             "extension": "csv", "keywords": ["stats"], "score": 30},
            {"rank": 3, "filename": "page.html", "full_path": path_of("page.html"), "extension": ".html", "score": 90},
            {"rank": 4, "filename": "ghost.html", "full_path": path_of("ghost.html"), "extension": ".html", "score": 10},
            {"rank": 5, "filename": "README.md", "extension": ".md"},
            {"rank": 6, "filename": "photo.jpg", "full_path": path_of("photo.jpg"), "extension": ".jpg", "score": 1}
        ],
        "summary": {"total_files": 6}
    });
    let path = root.join("parsed_file_data.json");
    fs::write(&path, serde_json::to_string_pretty(&inventory).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn classify_options(root: &Path, input: PathBuf) -> ClassifyOptions {
    ClassifyOptions {
        input,
        config: sample_config("content_classification_config.json"),
        output: root.join("out").join("content_classification_results.json"),
        dry_run: false,
        trace: false,
        quiet: true,
    }
}

#[test]
fn classify_name_and_plan() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let input = write_inventory(root);

    // Classification
    let opts = classify_options(root, input);
    let result = classify::run(&opts, None, &clock()).unwrap();
    assert_eq!(result.summary.classified, 6);
    assert_eq!(result.summary.classification_errors, 0);
    assert!(result.naming.is_none());

    let exported = read_json(&opts.output);
    assert_eq!(exported["GeneratedDate"], "2025-01-02T08:00:00");
    assert_eq!(exported["Summary"]["TotalClassified"], 6);
    let buckets: Vec<&String> = exported["Classifications"].as_object().unwrap().keys().collect();
    assert_eq!(
        buckets,
        vec![
            "Interview_Transcripts",
            "Production_Documents",
            "Strategy_Documents",
            "Data_Reports",
            "Web_Content",
            "System_Files",
            "Unknown"
        ]
    );
    let interview = &exported["Classifications"]["Interview_Transcripts"][0];
    assert_eq!(interview["FileName"], "Caleb_Festival_Interview.txt");
    assert_eq!(interview["Insights"]["Festivals"][0], "Festival");
    assert_eq!(exported["Classifications"]["Web_Content"].as_array().unwrap().len(), 2);
    assert_eq!(exported["SourceData"]["OriginalSummary"]["total_files"], 6);
    assert!(exported["NamingConventions"].get("System_Files").is_none());

    // Naming
    let name_opts = NameOptions {
        input: opts.output.clone(),
        config: sample_config("naming_convention_config.json"),
        output: root.join("out").join("rename_mappings.json"),
        fallback_dir: root.join("renamed"),
        preview_only: true,
        dry_run: false,
        quiet: true,
    };
    let document = name::run(&name_opts, &clock()).unwrap();
    assert_eq!(document.summary.total_files, 6);
    assert_eq!(document.summary.files_renamed, 6);
    assert_eq!(document.summary.conflicts, 1);
    assert_eq!(document.summary.errors, 0);
    assert!(document.preview_only);

    let names: Vec<&str> = document
        .rename_mappings
        .iter()
        .map(|m| m.new_file_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "GW_Interview_Caleb_Stewart_2024-03-02.txt",
            "GW_Report_Statistics_2024-01-01.csv",
            "GW_Web_Page.html",
            "GW_Web_Page_v2.html",
            "GW_System_5_2025-01-02.md",
            "GW_Unknown_File.jpg",
        ]
    );
    let readme = &document.rename_mappings[4];
    assert_eq!(
        Path::new(&readme.new_path),
        root.join("renamed").join("GW_System_5_2025-01-02.md")
    );

    let written = read_json(&name_opts.output);
    assert_eq!(written["PreviewOnly"], true);
    assert_eq!(written["Summary"]["UnresolvedConflicts"], 0);
    assert_eq!(written["RenameMappings"][2]["OriginalFile"]["FileName"], "page.html");

    // Plan
    let plan_opts = PlanOptions {
        input: name_opts.output.clone(),
        output: root.join("out").join("rename_plan.json"),
        backup: None,
        dry_run: false,
        quiet: true,
    };
    let plan_doc = plan::run(&plan_opts, &clock()).unwrap();
    assert_eq!(plan_doc.plan.summary.total, 6);
    assert_eq!(plan_doc.plan.summary.included, 4);
    assert_eq!(plan_doc.plan.summary.missing, 2);
    assert!(plan_doc.plan.default_backup);

    let plan_json = read_json(&plan_opts.output);
    assert_eq!(plan_json["items"][0]["new_file_name"], "GW_Interview_Caleb_Stewart_2024-03-02.txt");
    assert_eq!(plan_json["missing_items"][0]["old_file_name"], "ghost.html");
    assert!(plan_json["missing_items"][1]["old_path"].is_null());
}

#[test]
fn run_writes_both_documents() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let input = write_inventory(root);
    let opts = classify_options(root, input);
    let stage = NamingStage {
        config: sample_config("naming_convention_config.json"),
        output: root.join("out").join("rename_mappings.json"),
        fallback_dir: root.join("renamed"),
        preview_only: false,
    };

    let result = classify::run(&opts, Some(&stage), &clock()).unwrap();
    let naming = result.summary.naming.unwrap();
    assert_eq!(naming.files_renamed, 6);
    assert_eq!(naming.conflicts, 1);
    assert!(opts.output.exists());
    let mappings = read_json(&stage.output);
    assert_eq!(mappings["RenameMappings"].as_array().unwrap().len(), 6);
    assert_eq!(mappings["PreviewOnly"], false);
}

#[test]
fn dry_run_writes_nothing() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let input = write_inventory(root);
    let opts = ClassifyOptions {
        dry_run: true,
        ..classify_options(root, input)
    };
    let result = classify::run(&opts, None, &clock()).unwrap();
    assert_eq!(result.summary.classified, 6);
    assert!(!opts.output.exists());
}

#[test]
fn plan_fails_when_every_source_is_missing() {
    let temp = tempdir().unwrap();
    let mappings = temp.path().join("rename_mappings.json");
    fs::write(
        &mappings,
        json!({
            "RenameMappings": [
                {"Category": "Docs", "OldPath": temp.path().join("gone.txt"), "NewPath": "x/Doc.txt",
                 "OldFileName": "gone.txt", "NewFileName": "Doc.txt"}
            ]
        })
        .to_string(),
    )
    .unwrap();
    let opts = PlanOptions {
        input: mappings,
        output: temp.path().join("rename_plan.json"),
        backup: Some(false),
        dry_run: false,
        quiet: true,
    };
    let err = plan::run(&opts, &clock()).unwrap_err();
    assert!(err.to_string().contains("No valid rename operations"));
    assert!(!opts.output.exists());
}

#[test]
fn plan_backup_override_wins_over_config() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("a.txt");
    fs::write(&source, "x").unwrap();
    let mappings = temp.path().join("rename_mappings.json");
    fs::write(
        &mappings,
        json!({
            "RenameMappings": [
                {"Category": "Docs", "OldPath": source, "NewPath": temp.path().join("A.txt"),
                 "OldFileName": "a.txt", "NewFileName": "A.txt"}
            ],
            "ConfigUsed": sample_config("naming_convention_config.json")
        })
        .to_string(),
    )
    .unwrap();
    let opts = PlanOptions {
        input: mappings,
        output: temp.path().join("rename_plan.json"),
        backup: Some(false),
        dry_run: true,
        quiet: true,
    };
    let doc = plan::run(&opts, &clock()).unwrap();
    assert!(!doc.plan.default_backup);
    assert_eq!(doc.plan.summary.included, 1);
    assert!(!opts.output.exists());
}

#[test]
fn missing_rules_file_is_reported() {
    let temp = tempdir().unwrap();
    let input = write_inventory(temp.path());
    let opts = ClassifyOptions {
        config: temp.path().join("nope.json"),
        ..classify_options(temp.path(), input)
    };
    let err = classify::run(&opts, None, &clock()).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}
