//! Key reconciliation between two tables.
//!
//! Reports the keys that appear in exactly one table, sorted lexicographically
//! (byte order), which is the row order of a sorted outer join on the key.

use std::collections::HashSet;

use tracing::info;

use crate::domain::{Reconciliation, Table};
use crate::error::AppError;
use crate::table::ops::key_values;

/// Compare the `key` column of two tables.
///
/// Fails with `ColumnNotFound` if either table lacks the column. Missing key
/// cells are ignored.
pub fn diff_entries(first: &Table, second: &Table, key: &str) -> Result<Reconciliation, AppError> {
    let a = key_values(first, key)?;
    let b = key_values(second, key)?;

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let common = set_a.intersection(&set_b).count();
    let total = set_a.union(&set_b).count();

    let mut mismatches: Vec<String> = a
        .iter()
        .filter(|k| !set_b.contains(k.as_str()))
        .chain(b.iter().filter(|k| !set_a.contains(k.as_str())))
        .cloned()
        .collect();
    mismatches.sort();

    info!(total, common, mismatching = mismatches.len(), "reconciled `{key}`");

    Ok(Reconciliation {
        mismatches,
        total,
        common,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;

    fn keyed(keys: &[&str]) -> Table {
        Table::new(vec![Column::text(
            "Country",
            keys.iter().map(|k| Some(k.to_string())).collect(),
        )])
        .unwrap()
    }

    #[test]
    fn symmetric_difference_of_key_sets() {
        let r = diff_entries(&keyed(&["A", "B", "C"]), &keyed(&["B", "C", "D"]), "Country").unwrap();
        assert_eq!(r.mismatches, vec!["A", "D"]);
        assert_eq!(r.total, 4);
        assert_eq!(r.common, 2);
    }

    #[test]
    fn mismatches_are_sorted_regardless_of_row_order() {
        let r = diff_entries(&keyed(&["Zambia", "Aruba"]), &keyed(&["Chad"]), "Country").unwrap();
        assert_eq!(r.mismatches, vec!["Aruba", "Chad", "Zambia"]);
        assert_eq!(r.total, 3);
        assert_eq!(r.common, 0);
    }

    #[test]
    fn table_against_itself_has_no_mismatches() {
        let t = keyed(&["X", "Y", "Z", "Y"]);
        let r = diff_entries(&t, &t, "Country").unwrap();
        assert!(r.mismatches.is_empty());
        assert_eq!(r.total, 3);
        assert_eq!(r.common, 3);
    }

    #[test]
    fn missing_key_column_is_named() {
        let err = diff_entries(&keyed(&["A"]), &keyed(&["A"]), "Country Name").unwrap_err();
        assert!(matches!(err, AppError::ColumnNotFound { column } if column == "Country Name"));
    }

    #[test]
    fn missing_key_cells_are_skipped() {
        let with_gap = Table::new(vec![Column::text("Country", vec![Some("A".into()), None])]).unwrap();
        let r = diff_entries(&with_gap, &keyed(&["A"]), "Country").unwrap();
        assert!(r.mismatches.is_empty());
    }
}
