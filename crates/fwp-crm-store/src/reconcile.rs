//! Merge of the per-tier record lists into the caller-visible view.

use crate::model::CustomerRecord;
use std::collections::HashSet;

/// Merge both tiers into one deduplicated list, newest first.
///
/// When an id is present in both lists the primary copy is kept, since the
/// secondary copy may have lost its heavy payload. Records with equal
/// `created_at` are ordered by id so repeated calls agree.
pub fn reconcile(
    secondary: Vec<CustomerRecord>,
    primary: Vec<CustomerRecord>,
) -> Vec<CustomerRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(primary.len() + secondary.len());
    let mut merged = Vec::with_capacity(primary.len() + secondary.len());
    for record in primary.into_iter().chain(secondary) {
        if seen.insert(record.id.clone()) {
            merged.push(record);
        }
    }
    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged
}
