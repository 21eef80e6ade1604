//! Operator's in-progress choice of entries to reconcile

use bigdecimal::BigDecimal;
use std::collections::{BTreeMap, HashMap};

use super::catalog::EntryCatalog;
use crate::types::LedgerEntry;

/// Ordered set of selected entry ids
///
/// Order is time of selection, not display order: it drives line numbering
/// and the running balance. Each id maps to its insertion sequence number so
/// membership and order lookups never scan the set.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    sequence_by_id: HashMap<String, u64>,
    id_by_sequence: BTreeMap<u64, String>,
    next_sequence: u64,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id` if absent, deselect it if present; returns whether it is now selected
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.remove(id) {
            false
        } else {
            self.insert(id);
            true
        }
    }

    /// Append `id` at the end of the selection order; no-op if already selected
    pub fn insert(&mut self, id: &str) -> bool {
        if self.sequence_by_id.contains_key(id) {
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.sequence_by_id.insert(id.to_string(), sequence);
        self.id_by_sequence.insert(sequence, id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.sequence_by_id.remove(id) {
            Some(sequence) => {
                self.id_by_sequence.remove(&sequence);
                true
            }
            None => false,
        }
    }

    /// Replace the selection with exactly the entries of `view`, in view order
    pub fn select_all<'a>(&mut self, view: impl IntoIterator<Item = &'a LedgerEntry>) {
        self.clear();
        for entry in view {
            self.insert(&entry.id);
        }
    }

    pub fn clear(&mut self) {
        self.sequence_by_id.clear();
        self.id_by_sequence.clear();
        self.next_sequence = 0;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sequence_by_id.contains_key(id)
    }

    /// Insertion sequence number of a selected id
    pub fn sequence_of(&self, id: &str) -> Option<u64> {
        self.sequence_by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.sequence_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_by_id.is_empty()
    }

    /// Selected ids in selection order
    pub fn ordered_ids(&self) -> impl Iterator<Item = &str> {
        self.id_by_sequence.values().map(String::as_str)
    }

    /// Drop ids the catalog no longer holds; returns the evicted ids
    pub fn retain_existing(&mut self, catalog: &EntryCatalog) -> Vec<String> {
        let evicted: Vec<String> = self
            .ordered_ids()
            .filter(|id| !catalog.contains(id))
            .map(str::to_string)
            .collect();
        for id in &evicted {
            self.remove(id);
        }
        evicted
    }

    /// Sum of the selected entries' values
    pub fn selected_total(&self, catalog: &EntryCatalog) -> BigDecimal {
        self.ordered_ids()
            .filter_map(|id| catalog.get(id))
            .map(|entry| &entry.value)
            .sum()
    }
}

impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.ordered_ids().eq(other.ordered_ids())
    }
}

impl Eq for SelectionSet {}
