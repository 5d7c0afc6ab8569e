use tracing::debug;

use crate::labels::{LabelSet, Labelled};

/// Keep the entities whose label is in `allowed`, preserving order.
///
/// An empty allow-list keeps everything.
pub fn filter_labels<T: Labelled>(items: Vec<T>, allowed: &LabelSet) -> Vec<T> {
    if allowed.is_empty() {
        return items;
    }
    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| allowed.contains(item.label()))
        .collect();
    if kept.len() != before {
        debug!(removed = before - kept.len(), "label filter removed entities");
    }
    kept
}
