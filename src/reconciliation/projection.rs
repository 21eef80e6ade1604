//! Filtered, sorted display view over an [`EntryCatalog`]

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::catalog::EntryCatalog;
use crate::types::LedgerEntry;

/// Column the view is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    Date,
    Amount,
    Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Display state passed explicitly into the projection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewOptions {
    pub filter_text: String,
    pub sort_field: SortField,
    pub direction: SortDirection,
}

impl ViewOptions {
    pub fn new(sort_field: SortField, direction: SortDirection) -> Self {
        Self {
            filter_text: String::new(),
            sort_field,
            direction,
        }
    }

    pub fn with_filter(mut self, filter_text: impl Into<String>) -> Self {
        self.filter_text = filter_text.into();
        self
    }
}

/// Project the catalog into display order
///
/// Pure and deterministic: entries that compare equal keep their catalog
/// order, in both directions.
pub fn project<'a>(catalog: &'a EntryCatalog, options: &ViewOptions) -> Vec<&'a LedgerEntry> {
    // whitespace-only means no filter; otherwise spaces are part of the needle
    let needle = if options.filter_text.trim().is_empty() {
        String::new()
    } else {
        options.filter_text.to_lowercase()
    };
    let mut view: Vec<&LedgerEntry> = catalog
        .entries()
        .iter()
        .filter(|entry| needle.is_empty() || matches_filter(entry, &needle))
        .collect();

    // slice::sort_by is stable
    view.sort_by(|a, b| {
        let ordering = compare(a, b, options.sort_field);
        match options.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    view
}

fn matches_filter(entry: &LedgerEntry, needle: &str) -> bool {
    [&entry.id, &entry.reference, &entry.comment]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn compare(a: &LedgerEntry, b: &LedgerEntry, field: SortField) -> Ordering {
    match field {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Amount => a.value.cmp(&b.value),
        SortField::Identifier => compare_identifiers(&a.id, &b.id),
    }
}

/// Numeric identifiers sort numerically, anything else lexically
fn compare_identifiers(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn catalog() -> EntryCatalog {
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        EntryCatalog::new(vec![
            LedgerEntry::new("10", day(3), BigDecimal::from(-50)).with_reference("CHQ 001"),
            LedgerEntry::new("2", day(1), BigDecimal::from(120)).with_comment("Customer receipt"),
            LedgerEntry::new("7", day(3), BigDecimal::from(120)).with_reference("Rent"),
            LedgerEntry::new("3", day(2), BigDecimal::from(-5)).with_comment("bank charges"),
        ])
        .unwrap()
    }

    fn ids(view: &[&LedgerEntry]) -> Vec<String> {
        view.iter().map(|entry| entry.id.clone()).collect()
    }

    #[test]
    fn test_sort_by_date_is_stable() {
        let catalog = catalog();
        let view = project(&catalog, &ViewOptions::default());
        assert_eq!(ids(&view), vec!["2", "3", "10", "7"]);

        let descending = ViewOptions::new(SortField::Date, SortDirection::Descending);
        let view = project(&catalog, &descending);
        assert_eq!(ids(&view), vec!["10", "7", "3", "2"]);
    }

    #[test]
    fn test_sort_by_amount_and_identifier() {
        let catalog = catalog();
        let view = project(
            &catalog,
            &ViewOptions::new(SortField::Amount, SortDirection::Ascending),
        );
        assert_eq!(ids(&view), vec!["10", "3", "2", "7"]);

        let view = project(
            &catalog,
            &ViewOptions::new(SortField::Identifier, SortDirection::Ascending),
        );
        assert_eq!(ids(&view), vec!["2", "3", "7", "10"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let catalog = catalog();
        let view = project(&catalog, &ViewOptions::default().with_filter("RECEIPT"));
        assert_eq!(ids(&view), vec!["2"]);

        let view = project(&catalog, &ViewOptions::default().with_filter("chq"));
        assert_eq!(ids(&view), vec!["10"]);

        let view = project(&catalog, &ViewOptions::default().with_filter("   "));
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_filter_keeps_surrounding_spaces() {
        let catalog = catalog();
        let view = project(&catalog, &ViewOptions::default().with_filter(" rent"));
        assert!(view.is_empty());

        let view = project(&catalog, &ViewOptions::default().with_filter("rent"));
        assert_eq!(ids(&view), vec!["7"]);

        let view = project(&catalog, &ViewOptions::default().with_filter("chq "));
        assert_eq!(ids(&view), vec!["10"]);

        let view = project(&catalog, &ViewOptions::default().with_filter("\t "));
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let catalog = catalog();
        let options = ViewOptions::new(SortField::Amount, SortDirection::Descending);
        assert_eq!(ids(&project(&catalog, &options)), ids(&project(&catalog, &options)));
        assert_eq!(catalog.position("10"), Some(0));
    }
}
