// Document assembly and PAGE XML round-trip tests

use pagexml_prep::geometry::Point;
use pagexml_prep::geometry::fallback::FallbackPolicy;
use pagexml_prep::labels::LabelRules;
use pagexml_prep::labels::merge::MergeMapping;
use pagexml_prep::page::assembler::{AssemblyOptions, DocumentAssembler};
use pagexml_prep::page::reader::{parse_page, read_page};
use pagexml_prep::page::writer::{to_xml_bytes, write_page};
use pagexml_prep::page::{DUMMY_REGION_ID, PageDocument, RegionElement, TextDirection};
use pagexml_prep::segmentation::SegmentationResult;

const TWO_REGIONS: &str = r#"{
  "regions": [
    {"id": "a", "label": "text",    "boundary": [[0,0],[400,0],[400,200],[0,200]]},
    {"id": "b", "label": "heading", "boundary": [[0,200],[400,200],[400,300],[0,300]]}
  ],
  "lines": [
    {"baseline": [[10,50],[390,52]],   "boundary": [[10,40],[390,40],[390,60],[10,60]],   "regions": ["a"]},
    {"baseline": [[10,150],[390,150]], "boundary": [[10,140],[390,140],[390,160],[10,160]], "regions": ["a"], "label": "rubric"},
    {"baseline": [[20,250],[380,250]], "boundary": [[20,240],[380,240],[380,260],[20,260]], "regions": ["b"]}
  ]
}"#;

fn assemble(json: &str, options: &AssemblyOptions, rules: &LabelRules) -> PageDocument {
    let result = SegmentationResult::from_json(json).unwrap();
    let (doc, _) = DocumentAssembler::new(options, rules).assemble(
        result,
        "0001.png",
        400,
        300,
        "2026-03-01T12:00:00.000000",
    );
    doc
}

fn round_trip(doc: &PageDocument) -> PageDocument {
    let bytes = to_xml_bytes(doc).unwrap();
    parse_page(std::str::from_utf8(&bytes).unwrap()).unwrap()
}

// ============================================================
// 1. Round trip through the writer and reader
// ============================================================

#[test]
fn test_round_trip_preserves_labels_and_points() {
    let doc = assemble(TWO_REGIONS, &AssemblyOptions::default(), &LabelRules::default());
    let read = round_trip(&doc);

    assert_eq!(read.image_filename, "0001.png");
    assert_eq!((read.width, read.height), (400, 300));
    assert_eq!(read.metadata, doc.metadata);
    assert_eq!(read.text_direction, Some(TextDirection::Hlr));

    let region_labels: Vec<&str> = read.regions.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(region_labels, vec!["text", "heading"]);
    assert_eq!(read.regions[1].kind, doc.regions[1].kind);

    let lines: Vec<_> = read.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1].label, "rubric");
    assert_eq!(
        lines[0].baseline.as_deref(),
        Some(&[Point::new(10, 50), Point::new(390, 52)][..])
    );
    assert_eq!(lines[2].coords, doc.regions[1].lines[0].coords);
    assert_eq!(read.regions, doc.regions);
}

#[test]
fn test_written_file_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0001.xml");
    let doc = assemble(TWO_REGIONS, &AssemblyOptions::default(), &LabelRules::default());

    write_page(&doc, &path).unwrap();
    let read = read_page(&path).unwrap();
    assert_eq!(read.line_count(), 3);
    assert_eq!(read.reading_order().collect::<Vec<_>>(), vec!["r0001", "r0002"]);
}

#[test]
fn test_vertical_direction_attributes() {
    let options = AssemblyOptions {
        text_direction: TextDirection::Vrl,
        ..AssemblyOptions::default()
    };
    let doc = assemble(TWO_REGIONS, &options, &LabelRules::default());
    let xml = String::from_utf8(to_xml_bytes(&doc).unwrap()).unwrap();
    assert!(xml.contains(r#"readingDirection="top-to-bottom""#));
    assert!(xml.contains(r#"textLineOrder="right-to-left""#));
    assert_eq!(round_trip(&doc).text_direction, Some(TextDirection::Vrl));
}

// ============================================================
// 2. Suppression flags
// ============================================================

#[test]
fn test_suppress_regions_collects_all_lines_in_one_region() {
    let options = AssemblyOptions {
        suppress_regions: true,
        ..AssemblyOptions::default()
    };
    let doc = round_trip(&assemble(TWO_REGIONS, &options, &LabelRules::default()));

    assert_eq!(doc.regions.len(), 1);
    let region = &doc.regions[0];
    assert_eq!(region.id, DUMMY_REGION_ID);
    assert_eq!(region.kind.element, RegionElement::TextRegion);
    assert_eq!(region.lines.len(), 3);
    assert_eq!(region.coords.points().len(), 4);
}

#[test]
fn test_suppress_baselines_omits_line_geometry() {
    let options = AssemblyOptions {
        suppress_baselines: true,
        ..AssemblyOptions::default()
    };
    let doc = assemble(TWO_REGIONS, &options, &LabelRules::default());
    let xml = String::from_utf8(to_xml_bytes(&doc).unwrap()).unwrap();
    assert!(!xml.contains("<Baseline"));
    assert!(!xml.contains("<TextLine"));

    let read = round_trip(&doc);
    assert_eq!(read.line_count(), 0);
    let labels: Vec<&str> = read.regions.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["text", "heading"]);
    assert_eq!(read.regions[0].coords, doc.regions[0].coords);
}

#[test]
fn test_suppress_lines_keeps_regions_only() {
    let options = AssemblyOptions {
        suppress_lines: true,
        ..AssemblyOptions::default()
    };
    let doc = assemble(TWO_REGIONS, &options, &LabelRules::default());
    assert_eq!(doc.regions.len(), 2);
    assert_eq!(doc.line_count(), 0);
}

// ============================================================
// 3. Label rules and fallback during assembly
// ============================================================

#[test]
fn test_merge_rules_apply_before_writing() {
    let rules = LabelRules {
        merge_regions: MergeMapping::from_rule_strings(&["heading:text"]).unwrap(),
        merge_baselines: MergeMapping::from_rule_strings(&["rubric:default"]).unwrap(),
        ..LabelRules::default()
    };
    let doc = round_trip(&assemble(TWO_REGIONS, &AssemblyOptions::default(), &rules));
    assert!(doc.regions.iter().all(|r| r.label == "text"));
    assert!(doc.lines().all(|l| l.label == "default"));
}

#[test]
fn test_fallback_polygon_written_for_failed_line() {
    let json = r#"{
      "regions": [{"id": "a", "label": "text", "boundary": [[0,0],[400,0],[400,300],[0,300]]}],
      "lines": [{"baseline": [[30,100],[300,100]], "polygonized": false, "regions": ["a"]}]
    }"#;
    let options = AssemblyOptions {
        fallback: Some(FallbackPolicy::Offsets {
            left: 5,
            top: 15,
            right: 5,
            bottom: 5,
        }),
        ..AssemblyOptions::default()
    };
    let result = SegmentationResult::from_json(json).unwrap();
    let rules = LabelRules::default();
    let (doc, report) =
        DocumentAssembler::new(&options, &rules).assemble(result, "p.png", 400, 300, "t");

    assert_eq!(report.fallback_polygons, 1);
    assert!(report.dropped_lines.is_empty());
    let line = doc.lines().next().unwrap();
    assert_eq!(
        line.coords.as_ref().unwrap().points(),
        &[
            Point::new(25, 85),
            Point::new(305, 85),
            Point::new(305, 105),
            Point::new(25, 105)
        ]
    );
}

#[test]
fn test_line_ids_are_sequential_across_regions() {
    let doc = assemble(TWO_REGIONS, &AssemblyOptions::default(), &LabelRules::default());
    let ids: Vec<&str> = doc.lines().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["l0001", "l0002", "l0003"]);
}
