//! Snapshot of the unreconciled entries of one bank account

use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::types::*;
use crate::utils::validate_entry;

/// Immutable list of unreconciled entries, in the order the service returned them
///
/// The catalog is refreshed wholesale, never patched entry by entry.
#[derive(Debug, Clone, Default)]
pub struct EntryCatalog {
    entries: Vec<LedgerEntry>,
    index: HashMap<String, usize>,
}

impl EntryCatalog {
    /// Build a catalog, rejecting invalid or duplicate identifiers
    pub fn new(entries: Vec<LedgerEntry>) -> ReconcileResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            validate_entry(entry)?;
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(ReconcileError::Validation(format!(
                    "Entry '{}' appears more than once in the catalog",
                    entry.id
                )));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&LedgerEntry> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    /// Position of an entry in catalog order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every entry in the catalog
    pub fn total(&self) -> BigDecimal {
        self.entries.iter().map(|entry| &entry.value).sum()
    }

    /// Replace the snapshot and return the ids that disappeared
    pub fn replace(&mut self, entries: Vec<LedgerEntry>) -> ReconcileResult<Vec<String>> {
        let fresh = Self::new(entries)?;
        let evicted = self
            .entries
            .iter()
            .filter(|entry| !fresh.contains(&entry.id))
            .map(|entry| entry.id.clone())
            .collect();
        *self = fresh;
        Ok(evicted)
    }

    /// Drop entries that were committed in a batch
    pub(crate) fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let mut removed = false;
        for id in ids {
            removed |= self.index.remove(id).is_some();
        }
        if removed {
            let index = &self.index;
            self.entries.retain(|entry| index.contains_key(&entry.id));
            self.reindex();
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: &str, value: i64) -> LedgerEntry {
        LedgerEntry::new(
            id,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            BigDecimal::from(value),
        )
    }

    #[test]
    fn test_lookup_and_position() {
        let catalog = EntryCatalog::new(vec![entry("a", -50), entry("b", 120)]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position("b"), Some(1));
        assert_eq!(catalog.get("a").unwrap().value, BigDecimal::from(-50));
        assert!(catalog.get("zz").is_none());
        assert_eq!(catalog.total(), BigDecimal::from(70));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = EntryCatalog::new(vec![entry("a", 1), entry("a", 2)]);
        assert!(matches!(result, Err(ReconcileError::Validation(_))));
    }

    #[test]
    fn test_replace_reports_evicted_ids() {
        let mut catalog =
            EntryCatalog::new(vec![entry("a", 1), entry("b", 2), entry("c", 3)]).unwrap();
        let evicted = catalog
            .replace(vec![entry("c", 3), entry("d", 4)])
            .unwrap();
        assert_eq!(evicted, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(catalog.position("d"), Some(1));
    }

    #[test]
    fn test_remove_all_reindexes() {
        let mut catalog =
            EntryCatalog::new(vec![entry("a", 1), entry("b", 2), entry("c", 3)]).unwrap();
        catalog.remove_all(["a", "missing"]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position("c"), Some(1));
        assert!(!catalog.contains("a"));
    }
}
