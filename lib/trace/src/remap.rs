// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Invocation-count rescaling.
//!
//! Raw trace magnitudes vary by orders of magnitude between functions, so the
//! replay engine remaps every count into a configured `[min, max]` range
//! before driving load. The remap is affine over the global min/max of all
//! count cells across all loaded days, not per-column, so relative intensity
//! between functions and between days is preserved.

use std::collections::{HashMap, HashSet};

use crate::error::TraceError;
use crate::tables::InvocationTable;

/// Target range for rescaled invocation counts. Construction validates
/// `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapRange {
    min: i64,
    max: i64,
}

impl RemapRange {
    pub fn new(min: i64, max: i64) -> Result<Self, TraceError> {
        if min >= max {
            return Err(TraceError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }
}

/// One joined, rescaled invocation row. The counts concatenate every loaded
/// day's intervals in day order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub app: String,
    pub function: String,
    pub counts: Vec<i64>,
}

/// The joined invocation table after rescaling.
///
/// Row order is the first day's (restricted) row order, which makes the
/// downstream query plan reproducible. Every row has the same count length.
#[derive(Debug, Default)]
pub struct RescaledInvocations {
    rows: Vec<JoinedRow>,
    by_function: HashMap<String, usize>,
}

impl RescaledInvocations {
    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    /// Rescaled counts for `function`, if it survived the join.
    pub fn counts_for(&self, function: &str) -> Option<&[i64]> {
        self.by_function
            .get(function)
            .map(|&idx| self.rows[idx].counts.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Restrict each day's invocation table to `assigned` functions, left-join
/// across days on (app, function), and affinely remap every count into
/// `range`.
///
/// The join is seeded from the first day's rows; a function missing from a
/// later day's table gets that day's segment zero-filled. When every count
/// cell carries the same value the input range is degenerate and every cell
/// maps to `range.min()` instead of dividing by zero.
pub fn rescale(
    tables: &[&InvocationTable],
    assigned: &HashSet<String>,
    range: RemapRange,
) -> RescaledInvocations {
    let Some((first, rest)) = tables.split_first() else {
        return RescaledInvocations::default();
    };

    let mut rows: Vec<JoinedRow> = first
        .rows
        .iter()
        .filter(|row| assigned.contains(&row.function))
        .map(|row| JoinedRow {
            app: row.app.clone(),
            function: row.function.clone(),
            counts: row.counts.clone(),
        })
        .collect();

    for table in rest {
        let by_key: HashMap<(&str, &str), &[i64]> = table
            .rows
            .iter()
            .filter(|row| assigned.contains(&row.function))
            .map(|row| {
                (
                    (row.app.as_str(), row.function.as_str()),
                    row.counts.as_slice(),
                )
            })
            .collect();

        for row in &mut rows {
            match by_key.get(&(row.app.as_str(), row.function.as_str())) {
                Some(counts) => row.counts.extend_from_slice(counts),
                None => {
                    tracing::warn!(
                        function = %row.function,
                        "function missing from a later day's invocation table, zero-filling"
                    );
                    row.counts.extend(std::iter::repeat(0).take(table.intervals));
                }
            }
        }
    }

    let cells = rows.iter().flat_map(|row| row.counts.iter().copied());
    let (min_val, max_val) = match cells.fold(None, |acc: Option<(i64, i64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    }) {
        Some(bounds) => bounds,
        None => return RescaledInvocations::default(),
    };

    if min_val == max_val {
        // Degenerate input range: the affine map is undefined, so pin every
        // cell to the bottom of the target range.
        tracing::warn!(value = min_val, "all invocation counts identical, mapping to range minimum");
        for row in &mut rows {
            row.counts.fill(range.min());
        }
    } else {
        let input_range = (max_val - min_val) as f64;
        let output_range = (range.max() - range.min()) as f64;
        for row in &mut rows {
            for count in &mut row.counts {
                let scaled =
                    (*count - min_val) as f64 * output_range / input_range + range.min() as f64;
                *count = scaled.round() as i64;
            }
        }
    }

    let by_function = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (row.function.clone(), idx))
        .collect();

    RescaledInvocations { rows, by_function }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::InvocationRow;

    fn table(rows: Vec<(&str, &str, Vec<i64>)>, intervals: usize) -> InvocationTable {
        InvocationTable {
            rows: rows
                .into_iter()
                .map(|(app, function, counts)| InvocationRow {
                    app: app.into(),
                    function: function.into(),
                    counts,
                })
                .collect(),
            intervals,
        }
    }

    fn assigned(functions: &[&str]) -> HashSet<String> {
        functions.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn affine_map_matches_reference_values() {
        let day1 = table(vec![("a1", "f1", vec![0, 50, 100])], 3);
        let range = RemapRange::new(1, 10).unwrap();

        let rescaled = rescale(&[&day1], &assigned(&["f1"]), range);
        assert_eq!(rescaled.counts_for("f1").unwrap(), &[1, 6, 10]);
    }

    #[test]
    fn rescaled_values_stay_in_range_and_preserve_order() {
        let day1 = table(
            vec![
                ("a1", "f1", vec![3, 17, 120, 4711]),
                ("a2", "f2", vec![0, 9, 9, 33]),
            ],
            4,
        );
        let range = RemapRange::new(1, 100).unwrap();

        let rescaled = rescale(&[&day1], &assigned(&["f1", "f2"]), range);
        let mut all: Vec<(i64, i64)> = Vec::new();
        for row in rescaled.rows() {
            for &v in &row.counts {
                assert!((1..=100).contains(&v), "{v} out of range");
            }
        }
        // Order preservation: pair raw and rescaled cells and compare.
        let raw: Vec<i64> = vec![3, 17, 120, 4711, 0, 9, 9, 33];
        let mapped: Vec<i64> = rescaled
            .rows()
            .iter()
            .flat_map(|row| row.counts.iter().copied())
            .collect();
        for (i, &a) in raw.iter().enumerate() {
            for (j, &b) in raw.iter().enumerate() {
                if a <= b {
                    assert!(mapped[i] <= mapped[j]);
                    all.push((a, b));
                }
            }
        }
        assert!(!all.is_empty());
    }

    #[test]
    fn left_join_concatenates_days_and_zero_fills() {
        let day1 = table(
            vec![("a1", "f1", vec![0, 10]), ("a2", "f2", vec![5, 5])],
            2,
        );
        // f2 is missing on day 2.
        let day2 = table(vec![("a1", "f1", vec![20, 0])], 2);
        let range = RemapRange::new(0, 20).unwrap();

        let rescaled = rescale(&[&day1, &day2], &assigned(&["f1", "f2"]), range);
        // Raw joined rows: f1 = [0,10,20,0], f2 = [5,5,0,0]; min 0, max 20,
        // range [0,20] makes the map the identity.
        assert_eq!(rescaled.counts_for("f1").unwrap(), &[0, 10, 20, 0]);
        assert_eq!(rescaled.counts_for("f2").unwrap(), &[5, 5, 0, 0]);
    }

    #[test]
    fn unassigned_functions_are_dropped() {
        let day1 = table(
            vec![("a1", "f1", vec![1, 2]), ("a2", "f2", vec![3, 4])],
            2,
        );
        let range = RemapRange::new(1, 10).unwrap();

        let rescaled = rescale(&[&day1], &assigned(&["f1"]), range);
        assert_eq!(rescaled.rows().len(), 1);
        assert!(rescaled.counts_for("f2").is_none());
    }

    #[test]
    fn degenerate_range_maps_to_minimum() {
        let day1 = table(vec![("a1", "f1", vec![5, 5]), ("a2", "f2", vec![5, 5])], 2);
        let range = RemapRange::new(1, 10).unwrap();

        let rescaled = rescale(&[&day1], &assigned(&["f1", "f2"]), range);
        assert_eq!(rescaled.counts_for("f1").unwrap(), &[1, 1]);
        assert_eq!(rescaled.counts_for("f2").unwrap(), &[1, 1]);
    }

    #[test]
    fn invalid_range_is_rejected() {
        assert!(RemapRange::new(10, 10).is_err());
        assert!(RemapRange::new(10, 1).is_err());
        assert!(RemapRange::new(1, 10).is_ok());
    }

    #[test]
    fn row_order_follows_first_day() {
        let day1 = table(
            vec![
                ("a2", "f2", vec![0, 1]),
                ("a1", "f1", vec![2, 3]),
                ("a3", "f3", vec![4, 5]),
            ],
            2,
        );
        let range = RemapRange::new(0, 5).unwrap();

        let rescaled = rescale(&[&day1], &assigned(&["f1", "f2", "f3"]), range);
        let order: Vec<&str> = rescaled.rows().iter().map(|r| r.function.as_str()).collect();
        assert_eq!(order, vec!["f2", "f1", "f3"]);
    }
}
