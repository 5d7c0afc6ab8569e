// Pairing ground-truth annotations with their page images.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::corpus::Sample;
use crate::error::PrepError;
use crate::page::file_stem_before_first_dot;
use crate::page::reader::read_image_filename;

const ANNOTATION_EXTENSION: &str = ".xml";

pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".tif", ".tiff"];

#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Tried in place of the annotation's `.xml` extension.
    pub image_extensions: Vec<String>,
    /// Replaces everything after the first dot of the annotation name.
    pub image_suffix: Option<String>,
    /// Treat a missing image as fatal instead of skipping the sample.
    pub strict: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            image_suffix: None,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSample {
    pub annotation_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub skipped: Vec<SkippedSample>,
}

/// Match every annotation to exactly one existing image.
///
/// Annotations without an image are skipped and reported (fatal in strict
/// mode). More than one candidate image is an ambiguous configuration and
/// aborts the whole match.
pub fn match_samples(
    annotations: &[PathBuf],
    options: &MatchOptions,
) -> crate::error::Result<(Vec<Sample>, MatchReport)> {
    let mut samples = Vec::with_capacity(annotations.len());
    let mut report = MatchReport::default();

    for annotation in annotations {
        let candidates = image_candidates(annotation, options);
        match candidates.as_slice() {
            [image] => samples.push(Sample::new(image.clone(), annotation.clone())),
            [] => {
                let reason = "no matching image file found".to_string();
                if options.strict {
                    return Err(PrepError::input(format!(
                        "{}: {reason}",
                        annotation.display()
                    )));
                }
                warn!(annotation = %annotation.display(), "{reason}, skipping sample");
                report.skipped.push(SkippedSample {
                    annotation_path: annotation.clone(),
                    reason,
                });
            }
            many => {
                return Err(PrepError::config(format!(
                    "ambiguous image suffix for {}: {}",
                    annotation.display(),
                    many.iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
    }

    debug!(
        matched = samples.len(),
        skipped = report.skipped.len(),
        "matched annotations to images"
    );
    Ok((samples, report))
}

/// Existing image paths that could belong to `annotation`.
fn image_candidates(annotation: &Path, options: &MatchOptions) -> Vec<PathBuf> {
    let dir = annotation.parent().unwrap_or(Path::new(""));
    let name = annotation
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(suffix) = &options.image_suffix {
        let image = dir.join(format!("{}{suffix}", file_stem_before_first_dot(&name)));
        return if image.is_file() { vec![image] } else { Vec::new() };
    }

    let base = strip_annotation_extension(&name);
    let mut found: Vec<PathBuf> = Vec::new();
    for ext in &options.image_extensions {
        let image = dir.join(format!("{base}{ext}"));
        if image.is_file() && !found.contains(&image) {
            found.push(image);
        }
    }
    if !found.is_empty() {
        return found;
    }

    // The annotation may name its image explicitly.
    match read_image_filename(annotation) {
        Ok(Some(file)) => {
            let image = dir.join(file);
            if image.is_file() { vec![image] } else { Vec::new() }
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            debug!(annotation = %annotation.display(), "cannot read imageFilename: {e}");
            Vec::new()
        }
    }
}

fn strip_annotation_extension(name: &str) -> &str {
    let len = name.len();
    if len > ANNOTATION_EXTENSION.len()
        && name.is_char_boundary(len - ANNOTATION_EXTENSION.len())
        && name[len - ANNOTATION_EXTENSION.len()..].eq_ignore_ascii_case(ANNOTATION_EXTENSION)
    {
        &name[..len - ANNOTATION_EXTENSION.len()]
    } else {
        name
    }
}
