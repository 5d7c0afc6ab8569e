// Label filtering and merge-mapping tests

use pagexml_prep::labels::merge::{MergeMapping, MergeRule};
use pagexml_prep::labels::{LabelRules, LabelSet};
use pagexml_prep::segmentation::DetectedRegion;

fn regions(labels: &[&str]) -> Vec<DetectedRegion> {
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| DetectedRegion {
            id: format!("d{i}"),
            label: l.to_string(),
            boundary: Vec::new(),
        })
        .collect()
}

fn labels_of(items: &[DetectedRegion]) -> Vec<&str> {
    items.iter().map(|r| r.label.as_str()).collect()
}

// ============================================================
// 1. Merge chains resolve to the terminal label
// ============================================================

#[test]
fn test_chained_merge_resolves_transitively() {
    let mapping = MergeMapping::from_rule_strings(&["a,b:c", "c:d"]).unwrap();
    assert_eq!(mapping.resolve("a"), "d");
    assert_eq!(mapping.resolve("b"), "d");
    assert_eq!(mapping.resolve("c"), "d");
    assert_eq!(mapping.resolve("d"), "d");
    assert_eq!(mapping.resolve("unrelated"), "unrelated");
}

#[test]
fn test_rule_order_does_not_matter() {
    let forward = MergeMapping::from_rule_strings(&["a,b:c", "c:d"]).unwrap();
    let backward = MergeMapping::from_rule_strings(&["c:d", "a,b:c"]).unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn test_merge_is_idempotent() {
    let mapping = MergeMapping::from_rule_strings(&["a,b:c", "c:d"]).unwrap();
    let mut items = regions(&["a", "x", "c"]);
    mapping.apply(&mut items);
    let once: Vec<String> = items.iter().map(|r| r.label.clone()).collect();
    mapping.apply(&mut items);
    assert_eq!(labels_of(&items), once);
    assert_eq!(once, vec!["d", "x", "d"]);
}

#[test]
fn test_duplicate_identical_rule_is_accepted() {
    let mapping = MergeMapping::from_rule_strings(&["a:b", "a:b"]).unwrap();
    assert_eq!(mapping.len(), 1);
}

// ============================================================
// 2. Configuration errors
// ============================================================

#[test]
fn test_two_label_cycle_is_rejected() {
    let err = MergeMapping::from_rule_strings(&["A:B", "B:A"]).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("Cyclic merge mapping"), "{err}");
}

#[test]
fn test_long_cycle_is_rejected() {
    let rules = [
        MergeRule::new(["a"], "b"),
        MergeRule::new(["b"], "c"),
        MergeRule::new(["c"], "a"),
    ];
    assert!(MergeMapping::resolve_rules(&rules).is_err());
}

#[test]
fn test_conflicting_targets_are_rejected() {
    let err = MergeMapping::from_rule_strings(&["a,b:c", "b:d"]).unwrap_err();
    assert!(err.to_string().contains("Ambiguous merge mapping"), "{err}");
}

// ============================================================
// 3. Filter then merge
// ============================================================

#[test]
fn test_label_set_accepts_comma_separated_entries() {
    let set = LabelSet::from_entries(&["text, heading", "marginalia"]);
    assert!(set.allows("heading"));
    assert!(set.allows("marginalia"));
    assert!(!set.allows("image"));
    assert!(LabelSet::default().allows("anything"));
}

#[test]
fn test_filter_runs_before_merge() {
    // "heading" is merged into "text" but only after the allow-list has
    // already removed everything that is not listed.
    let rules = LabelRules {
        valid_regions: LabelSet::from_entries(&["text,heading"]),
        merge_regions: MergeMapping::from_rule_strings(&["heading:text", "image:text"]).unwrap(),
        ..LabelRules::default()
    };
    let kept = rules.apply_regions(regions(&["heading", "image", "text", "table"]));
    assert_eq!(labels_of(&kept), vec!["text", "text"]);
    assert_eq!(kept[0].id, "d0");
    assert_eq!(kept[1].id, "d2");
}

#[test]
fn test_baseline_rules_do_not_touch_regions() {
    let rules = LabelRules {
        merge_baselines: MergeMapping::from_rule_strings(&["text:default"]).unwrap(),
        ..LabelRules::default()
    };
    let kept = rules.apply_regions(regions(&["text"]));
    assert_eq!(labels_of(&kept), vec!["text"]);
}
