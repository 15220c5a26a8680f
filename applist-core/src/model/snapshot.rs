//! `src/model/snapshot.rs`
//!
//! Immutable point-in-time view of the registry. Cloning is an `Arc` bump;
//! the records behind it are never mutated, so a held snapshot never
//! observes later registry changes.

use std::ops::Deref;
use std::sync::Arc;

use crate::model::app_record::AppRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSnapshot(Arc<[AppRecord]>);

impl AppSnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a record by package id.
    #[must_use]
    pub fn find(&self, package_id: &str) -> Option<&AppRecord> {
        self.0.iter().find(|r| r.package_id() == package_id)
    }

    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(AppRecord::display_name)
    }
}

impl Deref for AppSnapshot {
    type Target = [AppRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<AppRecord>> for AppSnapshot {
    fn from(records: Vec<AppRecord>) -> Self {
        Self(records.into())
    }
}

impl<'a> IntoIterator for &'a AppSnapshot {
    type Item = &'a AppRecord;
    type IntoIter = std::slice::Iter<'a, AppRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
