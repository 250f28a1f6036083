use pretty_assertions::assert_eq;
use smash_analysis::aggregator::{DataTree, Histogram};
use smash_analysis::combine::{parse_merge_key, Combiner, Provenance};
use smash_analysis::commands::{execute_run, RunArgs};
use smash_analysis::output::read_results;
use smash_analysis::parser::{BinaryWriter, EndBlock, FieldRegistry, FieldValue, Header};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn tree_with_fills(count: usize) -> DataTree {
    let mut tree = DataTree::new();
    let root = tree.root();
    let mut histogram = Histogram::new(0.0, 10.0, 10).unwrap();
    for _ in 0..count {
        histogram.fill(0.5);
    }
    let node = tree.path(root, "spectra/x");
    tree.set_value(node, histogram);
    tree
}

fn provenance(path: &str) -> Provenance {
    Provenance {
        path: PathBuf::from(path),
        producer_version: "3.1".to_string(),
    }
}

#[test]
fn test_same_key_combines_and_other_key_stays_separate() {
    let mut combiner = Combiner::new();
    combiner
        .upsert(parse_merge_key("energy=7.7"), tree_with_fills(3), provenance("a.bin"))
        .unwrap();
    combiner
        .upsert(parse_merge_key("energy=11.5"), tree_with_fills(2), provenance("c.bin"))
        .unwrap();
    combiner
        .upsert(parse_merge_key("energy=7.7"), tree_with_fills(5), provenance("b.bin"))
        .unwrap();

    assert_eq!(combiner.len(), 2);

    let low = combiner.get(&parse_merge_key("energy=7.7")).unwrap();
    let node = low.tree.find(low.tree.root(), "spectra/x").unwrap();
    assert_eq!(low.tree.histogram(node).unwrap().bin_count(0), Some(8.0));
    assert_eq!(low.sources, vec![PathBuf::from("a.bin"), PathBuf::from("b.bin")]);
    assert_eq!(low.label(), "energy_7.700000");

    let high = combiner.get(&parse_merge_key("energy=11.5")).unwrap();
    let node = high.tree.find(high.tree.root(), "spectra/x").unwrap();
    assert_eq!(high.tree.histogram(node).unwrap().bin_count(0), Some(2.0));
}

fn header() -> Header {
    Header {
        magic: *b"SMSH",
        format_version: 7,
        format_variant: 0,
        producer_version: "SMASH-3.1".to_string(),
    }
}

/// Each event: a pion at rest in y and a forward proton
fn write_run(path: &Path, events: u32) {
    let mut writer = BinaryWriter::new(Vec::new(), &["p0", "pz", "pdg"], &FieldRegistry::standard()).unwrap();
    writer.write_header(&header()).unwrap();
    for event in 0..events {
        writer
            .write_particle_block(
                event as i32,
                0,
                &[
                    vec![FieldValue::Float(2.0), FieldValue::Float(0.0), FieldValue::Int(211)],
                    vec![FieldValue::Float(2.0), FieldValue::Float(1.5), FieldValue::Int(2212)],
                ],
            )
            .unwrap();
        writer
            .write_end_block(&EndBlock {
                event_number: event,
                ensemble_number: 0,
                impact_parameter: 1.0,
                reserved: 0,
            })
            .unwrap();
    }
    fs::write(path, writer.into_inner().unwrap()).unwrap();
}

fn write_truncated(path: &Path) {
    let mut writer = BinaryWriter::new(Vec::new(), &["p0", "pz", "pdg"], &FieldRegistry::standard()).unwrap();
    writer.write_header(&header()).unwrap();
    writer.write_raw(b"p").unwrap();
    writer.write_raw(&[0u8; 8]).unwrap();
    writer.write_raw(&3u32.to_ne_bytes()).unwrap();
    writer.write_raw(&[0u8; 10]).unwrap();
    fs::write(path, writer.into_inner().unwrap()).unwrap();
}

fn run_args(dir: &Path, inputs: Vec<String>) -> RunArgs {
    RunArgs {
        inputs,
        fields: Some(vec!["p0".to_string(), "pz".to_string(), "pdg".to_string()]),
        analyses: vec!["simple".to_string(), "midrapidity_counts".to_string()],
        output: Some(dir.join("out").join("results.json")),
        ..RunArgs::default()
    }
}

#[test]
fn test_run_writes_one_result_per_configuration() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let c = dir.path().join("c.bin");
    let broken = dir.path().join("broken.bin");
    write_run(&a, 1);
    write_run(&b, 2);
    write_run(&c, 4);
    write_truncated(&broken);

    let args = run_args(
        dir.path(),
        vec![
            format!("{}:energy=7.7", a.display()),
            format!("{}:energy=11.5", c.display()),
            format!("{}:energy=7.7", broken.display()),
            format!("{}:energy=7.7", b.display()),
        ],
    );
    let report = execute_run(args).unwrap();

    assert_eq!(report.configurations, 2);
    assert_eq!(report.files_merged, 3);
    assert_eq!(report.failed_files.len(), 1);

    let document = read_results(dir.path().join("out").join("results.json")).unwrap();
    assert_eq!(document.analyses, vec!["simple", "midrapidity_counts"]);
    assert_eq!(document.failed_files.len(), 1);
    assert!(document.failed_files[0].path.ends_with("broken.bin"));

    let labels: Vec<&str> = document.results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["energy_7.700000", "energy_11.500000"]);

    let low = document.result("energy_7.700000").unwrap();
    assert_eq!(low.sources.len(), 2);
    assert_eq!(low.producer_versions, vec!["SMASH-3.1"]);
    assert_eq!(low.pointer("meta/files"), Some(&serde_json::json!(2)));
    assert_eq!(low.pointer("meta/end_blocks"), Some(&serde_json::json!(3)));
    assert_eq!(low.pointer("simple/n_events"), Some(&serde_json::json!(3)));
    assert_eq!(low.pointer("midrapidity_counts/counts/211"), Some(&serde_json::json!(3)));
    assert!(low.pointer("midrapidity_counts/counts/2212").is_none());

    let entries: f64 = low
        .pointer("simple/rapidity/values")
        .and_then(|v| v.as_array())
        .unwrap()
        .iter()
        .filter_map(|v| v.as_f64())
        .sum();
    assert_eq!(entries, 6.0);
    assert!(low.pointer("simple/dndy").is_some());
    assert!(low.pointer("simple/dndy_error").is_some());

    let high = document.result("energy_11.500000").unwrap();
    assert_eq!(high.pointer("simple/n_events"), Some(&serde_json::json!(4)));
}

#[test]
fn test_run_fail_fast_stops_at_broken_input() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("broken.bin");
    write_truncated(&broken);

    let mut args = run_args(dir.path(), vec![broken.display().to_string()]);
    args.fail_fast = true;

    assert!(execute_run(args).is_err());
    assert!(!dir.path().join("out").join("results.json").exists());
}

#[test]
fn test_run_rejects_unknown_analysis_before_reading() {
    let dir = tempdir().unwrap();
    let mut args = run_args(dir.path(), vec!["/nonexistent/a.bin".to_string()]);
    args.analyses = vec!["no_such_analysis".to_string()];

    assert!(execute_run(args).is_err());
}
