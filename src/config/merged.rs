use tracing::{debug, warn};

use super::job::{Job, normalize_suffix};
use super::settings::Settings;
use crate::corpus::matcher::MatchOptions;
use crate::corpus::partition::validate_ratio;
use crate::error::PrepError;
use crate::geometry::fallback::FallbackPolicy;
use crate::labels::merge::MergeMapping;
use crate::labels::{LabelRules, LabelSet};
use crate::page::TextDirection;
use crate::page::assembler::AssemblyOptions;

#[derive(Debug, Clone)]
pub struct MergedConfig {
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

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    /// サフィックスはこの時点で先頭ドット付きに正規化する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        let o = job.overrides();
        MergedConfig {
            creator: o.creator.clone().unwrap_or_else(|| settings.creator.clone()),
            output_suffix: normalize_suffix(
                o.output_suffix.as_deref().unwrap_or(&settings.output_suffix),
            ),
            results_suffix: normalize_suffix(
                o.results_suffix.as_deref().unwrap_or(&settings.results_suffix),
            ),
            heatmap_suffix: o
                .heatmap_suffix
                .as_deref()
                .or(settings.heatmap_suffix.as_deref())
                .map(normalize_suffix),
            text_direction: o.text_direction.unwrap_or(settings.text_direction),
            partition: o.partition.unwrap_or(settings.partition),
            seed: o.seed.unwrap_or(settings.seed),
            gt_glob: o.gt_glob.clone().unwrap_or_else(|| settings.gt_glob.clone()),
            image_glob: o
                .image_glob
                .clone()
                .unwrap_or_else(|| settings.image_glob.clone()),
            image_extensions: o
                .image_extensions
                .as_ref()
                .unwrap_or(&settings.image_extensions)
                .iter()
                .map(|e| normalize_suffix(e))
                .collect(),
            strict: o.strict.unwrap_or(settings.strict),
            parallel_workers: settings.parallel_workers,
            fallback: o.fallback.or(settings.fallback),
            valid_regions: o
                .valid_regions
                .clone()
                .unwrap_or_else(|| settings.valid_regions.clone()),
            valid_baselines: o
                .valid_baselines
                .clone()
                .unwrap_or_else(|| settings.valid_baselines.clone()),
            merge_regions: o
                .merge_regions
                .clone()
                .unwrap_or_else(|| settings.merge_regions.clone()),
            merge_baselines: o
                .merge_baselines
                .clone()
                .unwrap_or_else(|| settings.merge_baselines.clone()),
            suppress_regions: o.suppress_regions.unwrap_or(settings.suppress_regions),
            suppress_baselines: o.suppress_baselines.unwrap_or(settings.suppress_baselines),
            suppress_lines: o.suppress_lines.unwrap_or(settings.suppress_lines),
        }
    }

    /// ファイル I/O の前に設定値の整合性を検証する。
    pub fn validate(&self, job: &Job) -> crate::error::Result<()> {
        for (name, suffix) in [
            ("output_suffix", Some(&self.output_suffix)),
            ("results_suffix", Some(&self.results_suffix)),
            ("heatmap_suffix", self.heatmap_suffix.as_ref()),
        ] {
            if suffix.is_some_and(|s| s == ".") {
                return Err(PrepError::config(format!("{name} cannot be empty")));
            }
        }
        if !self.output_suffix.ends_with(".xml") {
            warn!(suffix = %self.output_suffix, "output suffix does not end with .xml");
        }
        if self.output_suffix == self.results_suffix {
            return Err(PrepError::config(
                "output_suffix and results_suffix must differ",
            ));
        }
        if let Some(policy) = &self.fallback {
            policy.validate()?;
        }
        if let Job::Segtrain(train) = job {
            let name = train.model_name.trim();
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(PrepError::config(format!(
                    "Invalid model_name '{}': must be a non-empty file name",
                    train.model_name
                )));
            }
            if train.evaluation.is_none() {
                validate_ratio(self.partition)?;
            }
        }
        self.label_rules().map(|_| ())
    }

    /// 許可リストと統合マッピングを構築する。
    pub fn label_rules(&self) -> crate::error::Result<LabelRules> {
        let merge_regions = MergeMapping::from_rule_strings(&self.merge_regions)?;
        let merge_baselines = MergeMapping::from_rule_strings(&self.merge_baselines)?;
        for (kind, mapping) in [("region", &merge_regions), ("baseline", &merge_baselines)] {
            if mapping.is_empty() {
                continue;
            }
            debug!(kind, count = mapping.len(), "resolved merge mapping");
            for (source, target) in mapping.iter() {
                debug!(kind, source, target, "merge");
            }
        }
        Ok(LabelRules {
            valid_regions: LabelSet::from_entries(&self.valid_regions),
            valid_baselines: LabelSet::from_entries(&self.valid_baselines),
            merge_regions,
            merge_baselines,
        })
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            creator: self.creator.clone(),
            text_direction: self.text_direction,
            suppress_regions: self.suppress_regions,
            suppress_baselines: self.suppress_baselines,
            suppress_lines: self.suppress_lines,
            fallback: self.fallback,
        }
    }

    pub fn match_options(&self, image_suffix: Option<&str>) -> MatchOptions {
        MatchOptions {
            image_extensions: self.image_extensions.clone(),
            image_suffix: image_suffix.map(normalize_suffix),
            strict: self.strict,
        }
    }
}
