pub mod manifest;
pub mod matcher;
pub mod partition;
pub mod resolver;

use std::path::PathBuf;

use serde::Serialize;

/// A ground-truth annotation paired with its page image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Sample {
    pub image_path: PathBuf,
    pub annotation_path: PathBuf,
}

impl Sample {
    pub fn new(image_path: impl Into<PathBuf>, annotation_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            annotation_path: annotation_path.into(),
        }
    }
}

/// Disjoint training and evaluation subsets of one corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusSplit {
    pub training: Vec<Sample>,
    pub evaluation: Vec<Sample>,
}

impl CorpusSplit {
    pub fn len(&self) -> usize {
        self.training.len() + self.evaluation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
