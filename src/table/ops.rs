//! Column selection, renaming, joining and missing-value filling.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{Column, ColumnData, Table};
use crate::error::AppError;
use crate::math::finite_mean;

/// New table with only the named columns, in the given order.
pub fn select(table: &Table, names: &[&str]) -> Result<Table, AppError> {
    let columns = names
        .iter()
        .map(|n| table.column(n).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    Table::new(columns)
}

/// Rename a column in place.
pub fn rename(table: &mut Table, from: &str, to: &str) -> Result<(), AppError> {
    table.column_mut(from)?.name = to.to_string();
    Ok(())
}

/// Distinct, present key values of a column in row order.
pub fn key_values(table: &Table, key: &str) -> Result<Vec<String>, AppError> {
    let col = table.column(key)?;
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for row in 0..col.data.len() {
        if let Some(k) = col.data.key_at(row) {
            if seen.insert(k.clone()) {
                out.push(k);
            }
        }
    }
    Ok(out)
}

/// Inner join on `key`.
///
/// Output rows follow the left table's order; a left row matches the first
/// right row carrying the same key. Non-key columns that appear in both
/// tables are renamed with `suffixes.0` (left) and `suffixes.1` (right).
pub fn inner_join(left: &Table, right: &Table, key: &str, suffixes: (&str, &str)) -> Result<Table, AppError> {
    let left_key = left.column(key)?;
    let right_key = right.column(key)?;

    let mut right_index: HashMap<String, usize> = HashMap::new();
    for row in 0..right_key.data.len() {
        if let Some(k) = right_key.data.key_at(row) {
            right_index.entry(k).or_insert(row);
        }
    }

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for row in 0..left_key.data.len() {
        if let Some(r) = left_key.data.key_at(row).and_then(|k| right_index.get(&k)) {
            pairs.push((row, *r));
        }
    }

    let left_names: Vec<&str> = left.column_names();
    let right_names: Vec<&str> = right.column_names();
    let clashes = |name: &str, other: &[&str]| name != key && other.contains(&name);

    let mut columns = Vec::with_capacity(left.n_cols() + right.n_cols());
    for c in left.columns() {
        let name = if clashes(&c.name, &right_names) {
            format!("{}{}", c.name, suffixes.0)
        } else {
            c.name.clone()
        };
        columns.push(take_rows(c, name, pairs.iter().map(|p| p.0)));
    }
    for c in right.columns() {
        if c.name == key {
            continue;
        }
        let name = if clashes(&c.name, &left_names) {
            format!("{}{}", c.name, suffixes.1)
        } else {
            c.name.clone()
        };
        columns.push(take_rows(c, name, pairs.iter().map(|p| p.1)));
    }

    debug!(
        left = left.n_rows(),
        right = right.n_rows(),
        joined = pairs.len(),
        "inner join on `{key}`"
    );
    Table::new(columns)
}

fn take_rows(col: &Column, name: String, rows: impl Iterator<Item = usize>) -> Column {
    let data = match &col.data {
        ColumnData::Numeric(v) => ColumnData::Numeric(rows.map(|r| v[r]).collect()),
        ColumnData::Text(v) => ColumnData::Text(rows.map(|r| v[r].clone()).collect()),
    };
    Column { name, data }
}

/// Resolve missing numeric cells: `None` becomes `0.0`, then any non-finite
/// cell that remains becomes the mean of the column's finite cells.
///
/// Returns the number of cells that were filled.
pub fn fill_missing(table: &mut Table) -> usize {
    let mut filled = 0usize;
    for col in table.columns_mut() {
        let ColumnData::Numeric(values) = &mut col.data else {
            continue;
        };

        for v in values.iter_mut() {
            if v.is_none() {
                *v = Some(0.0);
                filled += 1;
            }
        }

        let mean = finite_mean(values.iter().flatten().copied()).unwrap_or(0.0);
        for x in values.iter_mut().flatten() {
            if !x.is_finite() {
                *x = mean;
                filled += 1;
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countries(keys: &[&str], values: &[Option<f64>]) -> Table {
        Table::new(vec![
            Column::text("Country", keys.iter().map(|k| Some(k.to_string())).collect()),
            Column::numeric("2018", values.to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn inner_join_keeps_left_order_and_suffixes_clashes() {
        let left = countries(&["A", "B", "C"], &[Some(1.0), Some(2.0), Some(3.0)]);
        let right = countries(&["C", "B", "D"], &[Some(30.0), Some(20.0), Some(40.0)]);
        let joined = inner_join(&left, &right, "Country", ("_renewable", "_access")).unwrap();

        assert_eq!(joined.column_names(), vec!["Country", "2018_renewable", "2018_access"]);
        assert_eq!(joined.n_rows(), 2);
        assert_eq!(joined.dense("2018_renewable").unwrap(), vec![2.0, 3.0]);
        assert_eq!(joined.dense("2018_access").unwrap(), vec![20.0, 30.0]);
    }

    #[test]
    fn join_on_missing_key_fails() {
        let t = countries(&["A"], &[Some(1.0)]);
        let err = inner_join(&t, &t, "Country Name", ("_l", "_r")).unwrap_err();
        assert!(matches!(err, AppError::ColumnNotFound { .. }));
    }

    #[test]
    fn fill_missing_zero_fills_then_mean_fills() {
        let mut t = countries(
            &["A", "B", "C", "D"],
            &[Some(2.0), None, Some(f64::NAN), Some(4.0)],
        );
        let filled = fill_missing(&mut t);
        assert_eq!(filled, 2);
        let v = t.dense("2018").unwrap();
        assert_eq!(v[1], 0.0);
        // mean of finite cells after zero-fill: (2 + 0 + 4) / 3
        assert!((v[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn select_and_rename() {
        let mut t = countries(&["A"], &[Some(1.0)]);
        rename(&mut t, "Country", "Nation").unwrap();
        let s = select(&t, &["2018", "Nation"]).unwrap();
        assert_eq!(s.column_names(), vec!["2018", "Nation"]);
        assert!(select(&t, &["Country"]).is_err());
    }

    #[test]
    fn key_values_are_distinct_in_row_order() {
        let t = countries(&["B", "A", "B"], &[None, None, None]);
        assert_eq!(key_values(&t, "Country").unwrap(), vec!["B", "A"]);
    }
}
