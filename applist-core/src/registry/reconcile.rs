//! `reconcile.rs`
//!
//! Pure list transformations applied by the worker. Every function takes the
//! current canonical list by reference and returns a fresh one; the input is
//! never modified, which is what keeps published snapshots stable.
//!
//! Canonical form: sorted by [`AppRecord::cmp_by_name`], unique by package id.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::inventory::InventoryEntry;
use crate::model::app_record::{AppRecord, fold_case};

/// Outcome of building the initial list.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub records: Vec<AppRecord>,
    pub unresolvable: usize,
    pub duplicates: usize,
}

/// Convert enumerated entries into a canonical list.
///
/// Entries that fail metadata resolution are dropped. When a package id
/// appears twice, the first entry wins.
#[must_use]
pub fn build_sorted(entries: Vec<InventoryEntry>) -> BuildReport {
    let mut report = BuildReport {
        records: Vec::with_capacity(entries.len()),
        ..BuildReport::default()
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());

    for entry in entries {
        match AppRecord::try_from(entry) {
            Ok(record) => {
                if seen.insert(record.package_id().to_string()) {
                    report.records.push(record);
                } else {
                    debug!("Skipping duplicate entry for {}", record.package_id());
                    report.duplicates += 1;
                }
            }
            Err(e) => {
                debug!("Dropping unresolvable entry: {}", e);
                report.unresolvable += 1;
            }
        }
    }

    report.records.sort_by(AppRecord::cmp_by_name);
    report
}

/// Replace any record with the same package id by `record`, keeping order.
#[must_use]
pub fn upsert(current: &[AppRecord], record: AppRecord) -> Vec<AppRecord> {
    let mut next: Vec<AppRecord> = Vec::with_capacity(current.len() + 1);
    next.extend(
        current
            .iter()
            .filter(|r| r.package_id() != record.package_id())
            .cloned(),
    );

    // After equal names, so repeated upserts of same-named apps are stable.
    let at = next.partition_point(|r| r.cmp_by_name(&record) != Ordering::Greater);
    next.insert(at, record);
    next
}

/// Drop the record for `package_id`. The flag reports whether one existed.
#[must_use]
pub fn remove(current: &[AppRecord], package_id: &str) -> (Vec<AppRecord>, bool) {
    let next: Vec<AppRecord> = current
        .iter()
        .filter(|r| r.package_id() != package_id)
        .cloned()
        .collect();
    let removed = next.len() != current.len();
    (next, removed)
}

/// Records whose display name contains `query`, ignoring case.
/// An empty query returns everything.
#[must_use]
pub fn filter_by_name(current: &[AppRecord], query: &str) -> Vec<AppRecord> {
    if query.is_empty() {
        return current.to_vec();
    }

    let folded = fold_case(query);
    current
        .iter()
        .filter(|r| r.name_contains_folded(&folded))
        .cloned()
        .collect()
}

/// Sorted by name and unique by package id.
#[must_use]
pub fn is_canonical(records: &[AppRecord]) -> bool {
    let sorted = records
        .windows(2)
        .all(|w| w[0].cmp_by_name(&w[1]) != Ordering::Greater);

    let mut ids = HashSet::with_capacity(records.len());
    sorted && records.iter().all(|r| ids.insert(r.package_id()))
}
