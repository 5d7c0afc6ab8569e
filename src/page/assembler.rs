// Document assembly: label rules, fallback geometry, ids, suppression and metadata.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::geometry::fallback::{FallbackPolicy, padded_bbox, synthesize};
use crate::geometry::{Point, Polygon, clip_points};
use crate::labels::LabelRules;
use crate::page::{
    DUMMY_REGION_ID, DUMMY_REGION_LABEL, PageDocument, PageMetadata, Region, RegionElement,
    RegionKind, TextDirection, TextLine,
};
use crate::segmentation::{DetectedLine, SegmentationResult};

/// Options controlling how a segmentation result becomes a PAGE document.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub creator: String,
    pub text_direction: TextDirection,
    /// Replace all regions with one full-page region holding every line.
    pub suppress_regions: bool,
    /// Omit line geometry, keeping region polygons.
    pub suppress_baselines: bool,
    /// Emit regions only. Same output as `suppress_baselines`.
    pub suppress_lines: bool,
    pub fallback: Option<FallbackPolicy>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            creator: env!("CARGO_PKG_NAME").to_string(),
            text_direction: TextDirection::default(),
            suppress_regions: false,
            suppress_baselines: false,
            suppress_lines: false,
            fallback: None,
        }
    }
}

/// A baseline that did not make it into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLine {
    pub label: String,
    pub baseline_start: Option<Point>,
    pub reason: String,
}

/// What the assembler left out or synthesized for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub dropped_lines: Vec<DroppedLine>,
    pub fallback_polygons: usize,
    /// Labels of regions that were skipped.
    pub skipped_regions: Vec<String>,
}

pub struct DocumentAssembler<'a> {
    options: &'a AssemblyOptions,
    rules: &'a LabelRules,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(options: &'a AssemblyOptions, rules: &'a LabelRules) -> Self {
        Self { options, rules }
    }

    /// Build a document from one segmentation result.
    ///
    /// `timestamp` is written as both the creation and last-change time.
    pub fn assemble(
        &self,
        result: SegmentationResult,
        image_filename: &str,
        width: u32,
        height: u32,
        timestamp: &str,
    ) -> (PageDocument, AssemblyReport) {
        let mut report = AssemblyReport::default();

        let (mut regions, region_index) = if self.options.suppress_regions {
            (Vec::new(), HashMap::new())
        } else {
            self.build_regions(result.regions, width, height, &mut report)
        };

        let mut orphans: Vec<TextLine> = Vec::new();
        if !(self.options.suppress_lines || self.options.suppress_baselines) {
            let lines = self.rules.apply_baselines(result.lines);
            let mut next_id = 1usize;
            for detected in lines {
                let owner = detected
                    .regions
                    .iter()
                    .find_map(|id| region_index.get(id.as_str()).copied());
                let Some(line) = self.build_line(detected, next_id, width, height, &mut report)
                else {
                    continue;
                };
                next_id += 1;
                match owner {
                    Some(idx) => regions[idx].lines.push(line),
                    None => orphans.push(line),
                }
            }
        }

        if self.options.suppress_regions {
            regions.push(dummy_region(orphans, width, height));
        } else if !orphans.is_empty() {
            debug!(count = orphans.len(), "lines without region collected in dummy region");
            regions.push(dummy_region(orphans, width, height));
        }

        let doc = PageDocument {
            metadata: PageMetadata {
                creator: self.options.creator.clone(),
                created: timestamp.to_string(),
                last_change: timestamp.to_string(),
            },
            image_filename: image_filename.to_string(),
            width,
            height,
            text_direction: Some(self.options.text_direction),
            regions,
        };
        (doc, report)
    }

    /// Returns the surviving regions and a map from detected id to the
    /// index of a text region that may own lines.
    fn build_regions(
        &self,
        detected: Vec<crate::segmentation::DetectedRegion>,
        width: u32,
        height: u32,
        report: &mut AssemblyReport,
    ) -> (Vec<Region>, HashMap<String, usize>) {
        let mut regions = Vec::new();
        let mut index = HashMap::new();

        for region in self.rules.apply_regions(detected) {
            let Some(kind) = RegionKind::for_label(&region.label) else {
                warn!(label = %region.label, "unknown region class, skipping region");
                report.skipped_regions.push(region.label);
                continue;
            };
            let coords = Polygon::new(region.boundary).clipped_to(width, height);
            if coords.len() < 3 {
                warn!(label = %region.label, "region lies outside the page, skipping");
                report.skipped_regions.push(region.label);
                continue;
            }

            let owns_lines = kind.element == RegionElement::TextRegion;
            if owns_lines && !index.contains_key(&region.id) {
                index.insert(region.id.clone(), regions.len());
            }
            regions.push(Region {
                id: format!("r{:04}", regions.len() + 1),
                label: region.label,
                kind,
                coords,
                lines: Vec::new(),
            });
        }
        (regions, index)
    }

    fn build_line(
        &self,
        detected: DetectedLine,
        id: usize,
        width: u32,
        height: u32,
        report: &mut AssemblyReport,
    ) -> Option<TextLine> {
        let failed = detected.polygonizer_failed();
        let DetectedLine {
            mut baseline,
            label,
            boundary,
            ..
        } = detected;

        let reject = |report: &mut AssemblyReport, baseline: &[Point], reason: String| {
            warn!(label = %label, start = ?baseline.first(), "dropping line: {reason}");
            report.dropped_lines.push(DroppedLine {
                label: label.clone(),
                baseline_start: baseline.first().copied(),
                reason,
            });
        };

        if baseline.len() < 2 {
            reject(report, &baseline, "baseline has fewer than two points".to_string());
            return None;
        }
        clip_points(&mut baseline, width, height);

        let coords = if failed {
            let Some(policy) = self.options.fallback.as_ref() else {
                reject(
                    report,
                    &baseline,
                    "polygonization failed and no fallback policy is configured".to_string(),
                );
                return None;
            };
            let polygon = match synthesize(&baseline, policy) {
                Ok(polygon) => polygon.clipped_to(width, height),
                Err(e) => {
                    reject(report, &baseline, e.to_string());
                    return None;
                }
            };
            // Rounding at the page edge can cut off baseline points.
            let polygon = if encloses(&polygon, &baseline) {
                polygon
            } else {
                debug!(start = ?baseline.first(), "clipped fallback polygon lost the baseline");
                padded_bbox(&baseline, 1).clipped_to(width, height)
            };
            if !encloses(&polygon, &baseline) {
                reject(report, &baseline, "no enclosing polygon inside the page".to_string());
                return None;
            }
            report.fallback_polygons += 1;
            polygon
        } else {
            let polygon = Polygon::new(boundary.unwrap_or_default()).clipped_to(width, height);
            if polygon.is_degenerate() {
                debug!(start = ?baseline.first(), "line boundary outside page, using baseline box");
                padded_bbox(&baseline, 1).clipped_to(width, height)
            } else {
                polygon
            }
        };

        Some(TextLine {
            id: format!("l{id:04}"),
            label,
            coords: Some(coords),
            baseline: Some(baseline),
        })
    }
}

fn encloses(polygon: &Polygon, baseline: &[Point]) -> bool {
    !polygon.is_degenerate() && baseline.iter().all(|p| polygon.contains(*p))
}

fn dummy_region(lines: Vec<TextLine>, width: u32, height: u32) -> Region {
    Region {
        id: DUMMY_REGION_ID.to_string(),
        label: DUMMY_REGION_LABEL.to_string(),
        kind: RegionKind::new(RegionElement::TextRegion, Some("paragraph")),
        coords: Polygon::page(width, height),
        lines,
    }
}
