use std::path::Path;

use serde::Deserialize;

use crate::corpus::matcher::DEFAULT_IMAGE_EXTENSIONS;
use crate::corpus::partition::DEFAULT_SEED;
use crate::geometry::fallback::FallbackPolicy;
use crate::page::TextDirection;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub creator: String,
    pub output_suffix: String,
    pub results_suffix: String,
    pub heatmap_suffix: Option<String>,
    pub text_direction: TextDirection,
    pub partition: f64,
    pub seed: u64,
    pub gt_glob: String,
    pub image_glob: String,
    pub image_extensions: Vec<String>,
    pub strict: bool,
    pub parallel_workers: usize,
    pub fallback: Option<FallbackPolicy>,
    pub valid_regions: Vec<String>,
    pub valid_baselines: Vec<String>,
    pub merge_regions: Vec<String>,
    pub merge_baselines: Vec<String>,
    pub suppress_regions: bool,
    pub suppress_baselines: bool,
    pub suppress_lines: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            creator: env!("CARGO_PKG_NAME").to_string(),
            output_suffix: ".xml".to_string(),
            results_suffix: ".seg.json".to_string(),
            heatmap_suffix: None,
            text_direction: TextDirection::Hlr,
            partition: 0.9,
            seed: DEFAULT_SEED,
            gt_glob: "*.xml".to_string(),
            image_glob: "*".to_string(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            strict: false,
            parallel_workers: 0,
            fallback: None,
            valid_regions: Vec::new(),
            valid_baselines: Vec::new(),
            merge_regions: Vec::new(),
            merge_baselines: Vec::new(),
            suppress_regions: false,
            suppress_baselines: false,
            suppress_lines: false,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::PrepError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::PrepError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }
}
