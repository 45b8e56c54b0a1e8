//! URL-keyed deduplication

use std::collections::HashSet;

use tracing::debug;

use newsdesk_core::NormalizedItem;

/// Collapse items sharing a canonical URL, keeping the first one seen.
///
/// Items arrive already canonicalized by the normalizer, so the URL is
/// compared as-is. Input order is preserved for the survivors.
pub fn dedup_by_url(items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let before = items.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);

    let unique: Vec<NormalizedItem> = items
        .into_iter()
        .filter(|item| seen.insert(item.url.clone()))
        .collect();

    if unique.len() < before {
        debug!("Dropped {} duplicate items", before - unique.len());
    }
    unique
}
