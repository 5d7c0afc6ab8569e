pub mod filter;
pub mod merge;

use std::collections::BTreeSet;

use merge::MergeMapping;

/// Anything carrying a structural class label (regions and baselines).
pub trait Labelled {
    fn label(&self) -> &str;
    fn set_label(&mut self, label: String);
}

/// Allow-list of label names. Empty means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeSet<String>,
}

impl LabelSet {
    /// Build from config entries; each entry may itself be comma-separated.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        let labels = entries
            .iter()
            .flat_map(|e| e.as_ref().split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// True if the label passes the filter.
    pub fn allows(&self, label: &str) -> bool {
        self.is_empty() || self.contains(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Allow-lists and merge mappings for regions and baselines.
///
/// Read-only after construction and shared by reference between workers.
#[derive(Debug, Clone, Default)]
pub struct LabelRules {
    pub valid_regions: LabelSet,
    pub valid_baselines: LabelSet,
    pub merge_regions: MergeMapping,
    pub merge_baselines: MergeMapping,
}

impl LabelRules {
    /// Filter then merge region labels.
    pub fn apply_regions<T: Labelled>(&self, items: Vec<T>) -> Vec<T> {
        let mut kept = filter::filter_labels(items, &self.valid_regions);
        self.merge_regions.apply(&mut kept);
        kept
    }

    /// Filter then merge baseline labels.
    pub fn apply_baselines<T: Labelled>(&self, items: Vec<T>) -> Vec<T> {
        let mut kept = filter::filter_labels(items, &self.valid_baselines);
        self.merge_baselines.apply(&mut kept);
        kept
    }
}
