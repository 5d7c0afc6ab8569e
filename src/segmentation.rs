// Per-image output of the external segmentation engine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PrepError;
use crate::geometry::Point;
use crate::heatmap::Heatmap;
use crate::labels::Labelled;
use crate::page::{DEFAULT_LINE_LABEL, file_stem_before_first_dot};

/// Minimum boundary length for a polygonized line.
const MIN_BOUNDARY_POINTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationResult {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub regions: Vec<DetectedRegion>,
    #[serde(default)]
    pub lines: Vec<DetectedLine>,
    #[serde(default)]
    pub heatmap: Option<Heatmap>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectedRegion {
    pub id: String,
    pub label: String,
    pub boundary: Vec<Point>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectedLine {
    pub baseline: Vec<Point>,
    #[serde(default = "default_line_label")]
    pub label: String,
    #[serde(default)]
    pub boundary: Option<Vec<Point>>,
    /// Set to false by the engine when polygonization failed.
    #[serde(default)]
    pub polygonized: Option<bool>,
    /// Ids of the detected regions containing this line, best match first.
    #[serde(default)]
    pub regions: Vec<String>,
}

fn default_line_label() -> String {
    DEFAULT_LINE_LABEL.to_string()
}

impl DetectedLine {
    pub fn polygonizer_failed(&self) -> bool {
        self.polygonized == Some(false)
            || self
                .boundary
                .as_ref()
                .is_none_or(|b| b.len() < MIN_BOUNDARY_POINTS)
    }
}

impl Labelled for DetectedRegion {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }
}

impl Labelled for DetectedLine {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }
}

impl SegmentationResult {
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PrepError::input(format!("invalid segmentation result: {e}")))
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            PrepError::input(format!(
                "cannot read segmentation result {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json).map_err(|e| match e {
            PrepError::InputError(msg) => PrepError::input(format!("{}: {msg}", path.display())),
            other => other,
        })
    }
}

/// `dir/0001.bin.png` + `.seg.json` -> `dir/0001.seg.json`
pub fn results_path_for(image: &Path, results_suffix: &str) -> PathBuf {
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_stem_before_first_dot(&name);
    image.with_file_name(format!("{stem}{results_suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_result() {
        let json = r#"{
            "regions": [{"id": "a", "label": "text", "boundary": [[0,0],[10,0],[10,10]]}],
            "lines": [
                {"baseline": [[0,5],[10,5]], "boundary": [[0,0],[10,0],[10,8],[0,8]], "regions": ["a"]},
                {"baseline": [[0,9],[10,9]], "label": "marginal", "polygonized": false}
            ]
        }"#;
        let result = SegmentationResult::from_json(json).unwrap();
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.lines[0].label, "default");
        assert!(!result.lines[0].polygonizer_failed());
        assert!(result.lines[1].polygonizer_failed());
        assert_eq!(result.lines[1].label, "marginal");
        assert!(result.width.is_none());
    }

    #[test]
    fn test_short_boundary_counts_as_failure() {
        let json = r#"{"lines": [{"baseline": [[0,5],[10,5]], "boundary": [[0,0],[10,0]]}]}"#;
        let result = SegmentationResult::from_json(json).unwrap();
        assert!(result.lines[0].polygonizer_failed());
    }

    #[test]
    fn test_invalid_json_is_input_error() {
        let err = SegmentationResult::from_json("{").unwrap_err();
        assert!(matches!(err, PrepError::InputError(_)));
    }

    #[test]
    fn test_results_path_for() {
        let p = results_path_for(Path::new("/data/0001.bin.png"), ".seg.json");
        assert_eq!(p, PathBuf::from("/data/0001.seg.json"));
    }
}
