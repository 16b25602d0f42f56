// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Typed in-memory trace tables.
//!
//! Row order always matches file order; the endpoint assigner and the
//! invocation join both depend on that for reproducibility.

/// Day tag of a trace file (`d01`..`d14` in the public corpus).
pub type Day = u8;

/// One row of a `function_durations` table: a function, its owning app and
/// its 99th-percentile execution time in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationRow {
    pub app: String,
    pub function: String,
    pub pct99_ms: f64,
}

/// One row of an `app_memory` table: an app and its 99th-percentile
/// allocated memory in MB.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub app: String,
    pub allocated_mb_pct99: f64,
}

/// One row of an `invocations_per_function` table: a function, its owning
/// app and the ordered per-interval invocation counts.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRow {
    pub app: String,
    pub function: String,
    pub counts: Vec<i64>,
}

/// Per-function execution-time percentiles for one day.
#[derive(Debug, Clone, Default)]
pub struct DurationTable {
    pub rows: Vec<DurationRow>,
}

impl DurationTable {
    /// 99th-percentile execution time for `function`, if the day recorded it.
    /// First row wins if the table carries duplicates.
    pub fn pct99_ms(&self, function: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.function == function)
            .map(|row| row.pct99_ms)
    }
}

/// Per-app allocated-memory percentiles for one day.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub rows: Vec<MemoryRow>,
}

impl MemoryTable {
    /// 99th-percentile allocated memory in MB for `app`.
    pub fn allocated_mb_pct99(&self, app: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.app == app)
            .map(|row| row.allocated_mb_pct99)
    }
}

/// Per-function invocation counts for one day.
///
/// `intervals` is the number of count columns in the source file; every row
/// carries exactly that many counts.
#[derive(Debug, Clone, Default)]
pub struct InvocationTable {
    pub rows: Vec<InvocationRow>,
    pub intervals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_lookup_prefers_first_row() {
        let table = DurationTable {
            rows: vec![
                DurationRow {
                    app: "a1".into(),
                    function: "f1".into(),
                    pct99_ms: 120.0,
                },
                DurationRow {
                    app: "a1".into(),
                    function: "f1".into(),
                    pct99_ms: 999.0,
                },
            ],
        };
        assert_eq!(table.pct99_ms("f1"), Some(120.0));
        assert_eq!(table.pct99_ms("missing"), None);
    }

    #[test]
    fn memory_lookup_by_app() {
        let table = MemoryTable {
            rows: vec![MemoryRow {
                app: "a1".into(),
                allocated_mb_pct99: 256.0,
            }],
        };
        assert_eq!(table.allocated_mb_pct99("a1"), Some(256.0));
        assert_eq!(table.allocated_mb_pct99("a2"), None);
    }
}
