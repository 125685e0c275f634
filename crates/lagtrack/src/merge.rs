use std::collections::HashMap;

use crate::output::OutputRecord;

/// Fold newly reconciled records into the persisted set.
///
/// Records are keyed by exact feature title. When a title appears more than
/// once the later record replaces the earlier one in place, so new results
/// overwrite stored ones. The result is ordered newest announcement first;
/// records sharing a date keep no particular order.
pub fn merge(existing: Vec<OutputRecord>, new: Vec<OutputRecord>) -> Vec<OutputRecord> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(existing.len() + new.len());
    let mut merged: Vec<OutputRecord> = Vec::with_capacity(existing.len() + new.len());

    for record in existing.into_iter().chain(new) {
        match slots.get(&record.feature) {
            Some(&i) => merged[i] = record,
            None => {
                slots.insert(record.feature.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged.sort_by(|a, b| b.date.cmp(&a.date));
    merged
}
