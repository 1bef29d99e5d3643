use std::fs;
use std::io::Write;
use tempfile::TempDir;
use wwhash_search::app::config::{BruteForceOptions, SearchConfig, SearchMode};
use wwhash_search::app::coordinator::WorkerContext;
use wwhash_search::app::searcher::{SearchInputs, run_search};
use wwhash_search::domain::ngram::{NgramMode, NgramPosition};
use wwhash_search::infra::ngram_io::load_ngram_filter;
use wwhash_search::infra::report_io::append_report;
use wwhash_search::infra::targets_io::{load_existing_matches, load_targets};
use wwhash_search::infra::wordlist_io::load_wordlist;
use wwhash_search::{LoadReport, SearchError, TargetSet, fnv1_hash};

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn events_json(entries: &[(&str, &str)]) -> String {
    let body: Vec<String> = entries
        .iter()
        .map(|(name, bank)| format!("\"{}\": {{\"bank\": \"{}\"}}", fnv1_hash(name).unwrap(), bank))
        .collect();
    format!("{{\"events\": {{{}}}}}", body.join(", "))
}

#[test]
fn test_id_table_targets_and_known_names() {
    let dir = TempDir::new().unwrap();
    let json = r#"{
        "events": [{"key": "0x0000BEEF", "val": 3}, {"key": "Play_Music", "val": 1}, {"val": 2}],
        "banks": [["header", [{"key": "0x00000010", "val": 7}]]],
        "extra": ["0x00000020", "NONE"]
    }"#;
    let path = write_file(&dir, "ids.json", json);

    let file = load_targets(&path).unwrap();
    let mut hashes: Vec<(u32, String)> = file
        .targets
        .iter()
        .map(|t| (t.hash, t.label.to_string()))
        .collect();
    hashes.sort();
    assert_eq!(
        hashes,
        vec![
            (0x10, "val:7".to_string()),
            (0x20, "val:0".to_string()),
            (0xBEEF, "val:3".to_string()),
        ]
    );
    assert_eq!(file.known_names, vec!["play_music".to_string()]);
    assert_eq!(file.report, LoadReport { loaded: 3, skipped: 1 });
}

#[test]
fn test_unreadable_targets_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = load_targets(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, SearchError::Config(_)));

    let path = write_file(&dir, "broken.json", "{ not json");
    assert!(matches!(load_targets(&path), Err(SearchError::Json(_))));
}

#[test]
fn test_existing_matches_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "existing.txt",
        "# header\n0x0000BEEF,Door_Open,bank\n0xZZZ,bad\n0x00000001\nplain line\n",
    );

    let (known, report) = load_existing_matches(&path).unwrap();
    assert_eq!(report, LoadReport { loaded: 1, skipped: 2 });
    assert!(known.is_resolved(0xBEEF));
    assert!(known.contains_name("door_open"));

    let (empty, _) = load_existing_matches(dir.path().join("none.txt")).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_ngram_oklist_threshold_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "ok.txt", "^abc: 10\nbcd: 3\ncde: 50\n");

    let (filter, report) = load_ngram_filter(&path, NgramMode::Oklist, 5).unwrap();
    assert_eq!(filter.mode(), NgramMode::Oklist);
    assert!(report.loaded >= 2);
    assert!(filter.allows(NgramPosition::Start, b"abc"));
    assert!(!filter.allows(NgramPosition::Middle, b"bcd"));
    assert!(filter.allows(NgramPosition::Middle, b"cde"));
    assert!(!filter.allows(NgramPosition::Middle, b"zzz"));

    let empty = write_file(&dir, "empty.txt", "# nothing here\n");
    assert!(matches!(
        load_ngram_filter(&empty, NgramMode::Banlist, 0),
        Err(SearchError::Config(_))
    ));
}

#[test]
fn test_report_appends_blocks() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("out").join("new_matches.txt");
    let targets = TargetSet::from_hashes(
        ["ab", "zz"].iter().map(|n| fnv1_hash(n).unwrap()),
        "bank",
    );
    let config = SearchConfig::new(SearchMode::BruteForce)
        .with_brute(BruteForceOptions::default().with_length_range(1, 2))
        .with_workers(2);

    let outcome = run_search(
        &config,
        SearchInputs::new(&targets),
        &Default::default(),
        WorkerContext::default(),
        |_| {},
    )
    .unwrap();
    assert_eq!(outcome.new_matches.len(), 2);

    let summary = &outcome.summary;
    let written = append_report(&results, summary.mode, &summary.parameters, &outcome.new_matches).unwrap();
    assert_eq!(written, 2);
    // empty runs leave the file untouched
    assert_eq!(append_report(&results, "brute", "x", &[]).unwrap(), 0);
    append_report(&results, summary.mode, &summary.parameters, &outcome.new_matches).unwrap();

    let text = fs::read_to_string(&results).unwrap();
    assert_eq!(text.matches("# brute run: ").count(), 2);
    let records: Vec<&str> = text.lines().filter(|l| l.starts_with("0x")).collect();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0], format!("0x{:08X},ab,bank", fnv1_hash("ab").unwrap()));
    assert_eq!(records[1], format!("0x{:08X},zz,bank", fnv1_hash("zz").unwrap()));
}

#[test]
fn test_end_to_end_dictionary_run() {
    let dir = TempDir::new().unwrap();
    // one malformed record alongside the good ones
    let events = events_json(&[("door_open", "Doors"), ("door_close", "Doors"), ("gate_open", "Gates")])
        .replacen("{\"events\": {", "{\"events\": {\"17\": null, ", 1);
    let targets_path = write_file(&dir, "events.json", &events);
    let existing_path = write_file(&dir, "existing.txt", &format!(
        "0x{:08X},door_open,Doors\n",
        fnv1_hash("door_open").unwrap()
    ));
    let words_path = write_file(&dir, "words.txt", "# doors\ndoor\ngate\nopen\nclose\n");

    let file = load_targets(&targets_path).unwrap();
    assert_eq!(file.report, LoadReport { loaded: 3, skipped: 1 });
    let targets = TargetSet::from_targets(file.targets);
    let (known, existing_report) = load_existing_matches(&existing_path).unwrap();
    let words = load_wordlist(&words_path).unwrap();
    assert_eq!(words.len(), 4);

    let config = SearchConfig::new(SearchMode::Dictionary).with_workers(2);
    let outcome = run_search(
        &config,
        SearchInputs::new(&targets)
            .with_words(&words)
            .with_load_report(file.report.merge(existing_report)),
        &known,
        WorkerContext::default(),
        |_| {},
    )
    .unwrap();

    let all: Vec<&str> = outcome.summary.matches.iter().map(|m| m.name.as_str()).collect();
    assert!(all.contains(&"door_open"));
    let new: Vec<(&str, &str)> = outcome
        .new_matches
        .iter()
        .map(|m| (m.label.as_ref(), m.name.as_str()))
        .collect();
    assert_eq!(new, vec![("Doors", "door_close"), ("Gates", "gate_open")]);
    assert_eq!(outcome.summary.skipped_records, 1);
}
