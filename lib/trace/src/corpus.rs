// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Trace corpus loader.
//!
//! Scans a directory for the three recognized table kinds, keyed by the
//! `dNN` day tag embedded in each filename:
//!
//! - `app_memory`: keeps `HashApp`, `AverageAllocatedMb_pct99`
//! - `function_durations`: keeps `HashApp`, `HashFunction`, `percentile_Average_99`
//! - `invocations_per_function`: drops `HashOwner` and `Trigger`, keeps the
//!   identity columns and every per-interval count column in file order
//!
//! Files matching none of the kind substrings are ignored silently. A
//! recognized file that is malformed is a fatal [TraceError::Parse].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::TraceError;
use crate::tables::{
    Day, DurationRow, DurationTable, InvocationRow, InvocationTable, MemoryRow, MemoryTable,
};

const KIND_MEMORY: &str = "app_memory";
const KIND_DURATIONS: &str = "function_durations";
const KIND_INVOCATIONS: &str = "invocations_per_function";

const COL_APP: &str = "HashApp";
const COL_FUNCTION: &str = "HashFunction";
const COL_OWNER: &str = "HashOwner";
const COL_TRIGGER: &str = "Trigger";
const COL_MEMORY_PCT99: &str = "AverageAllocatedMb_pct99";
const COL_DURATION_PCT99: &str = "percentile_Average_99";

/// Set of days to load. An empty filter accepts every day, matching the
/// original corpus tooling.
#[derive(Debug, Clone, Default)]
pub struct DayFilter(BTreeSet<Day>);

impl DayFilter {
    /// Accept all days.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_days(days: impl IntoIterator<Item = Day>) -> Self {
        Self(days.into_iter().collect())
    }

    pub fn matches(&self, day: Day) -> bool {
        self.0.is_empty() || self.0.contains(&day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Memory,
    Durations,
    Invocations,
}

/// All loaded trace tables, keyed by day.
///
/// Day keys are ordered, so "first loaded day" always means the smallest day
/// tag present regardless of directory iteration order.
#[derive(Debug, Default)]
pub struct TraceCorpus {
    pub durations: BTreeMap<Day, DurationTable>,
    pub memory: BTreeMap<Day, MemoryTable>,
    pub invocations: BTreeMap<Day, InvocationTable>,
}

impl TraceCorpus {
    /// Load every recognized trace file under `dir` whose day tag passes
    /// `filter`.
    pub fn load(dir: &Path, filter: &DayFilter) -> Result<Self, TraceError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|source| TraceError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        // Directory iteration order is platform-dependent; sort for
        // reproducible parse order and duplicate handling.
        files.sort();

        let mut corpus = TraceCorpus::default();
        for path in files {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let Some(kind) = table_kind(&name) else {
                continue;
            };
            let Some(day) = day_tag(&name) else {
                return Err(TraceError::parse(&path, "no dNN day tag in filename"));
            };
            if !filter.matches(day) {
                continue;
            }

            tracing::info!(file = %name, day, "parsing trace table");
            match kind {
                TableKind::Memory => {
                    if corpus.memory.insert(day, parse_memory(&path)?).is_some() {
                        tracing::warn!(file = %name, day, "duplicate memory table for day, keeping the later file");
                    }
                }
                TableKind::Durations => {
                    if corpus
                        .durations
                        .insert(day, parse_durations(&path)?)
                        .is_some()
                    {
                        tracing::warn!(file = %name, day, "duplicate duration table for day, keeping the later file");
                    }
                }
                TableKind::Invocations => {
                    if corpus
                        .invocations
                        .insert(day, parse_invocations(&path)?)
                        .is_some()
                    {
                        tracing::warn!(file = %name, day, "duplicate invocation table for day, keeping the later file");
                    }
                }
            }
        }

        Ok(corpus)
    }

    /// Duration table of the first (smallest-tagged) loaded day.
    pub fn first_day_durations(&self) -> Option<&DurationTable> {
        self.durations.values().next()
    }

    /// Memory table of the first (smallest-tagged) loaded day.
    pub fn first_day_memory(&self) -> Option<&MemoryTable> {
        self.memory.values().next()
    }

    /// Duration tables in ascending day order.
    pub fn durations_in_day_order(&self) -> impl Iterator<Item = &DurationTable> {
        self.durations.values()
    }

    /// Invocation tables in ascending day order.
    pub fn invocations_in_day_order(&self) -> Vec<&InvocationTable> {
        self.invocations.values().collect()
    }
}

/// Extract the `dNN` day tag from a filename.
fn day_tag(name: &str) -> Option<Day> {
    let bytes = name.as_bytes();
    for i in 0..bytes.len().saturating_sub(2) {
        if bytes[i] == b'd' && bytes[i + 1].is_ascii_digit() && bytes[i + 2].is_ascii_digit() {
            // Reject longer runs of digits such as `d123`.
            if bytes.get(i + 3).is_some_and(|b| b.is_ascii_digit()) {
                continue;
            }
            let tens = (bytes[i + 1] - b'0') as Day;
            let ones = (bytes[i + 2] - b'0') as Day;
            return Some(tens * 10 + ones);
        }
    }
    None
}

fn table_kind(name: &str) -> Option<TableKind> {
    if name.contains(KIND_MEMORY) {
        Some(TableKind::Memory)
    } else if name.contains(KIND_DURATIONS) {
        Some(TableKind::Durations)
    } else if name.contains(KIND_INVOCATIONS) {
        Some(TableKind::Invocations)
    } else {
        None
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, TraceError> {
    csv::Reader::from_path(path).map_err(|err| TraceError::parse(path, err.to_string()))
}

/// Index of a required header column, or a ParseError naming it.
fn required_column(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize, TraceError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| TraceError::parse(path, format!("missing expected column {name}")))
}

fn parse_f64(field: &str, column: &str, path: &Path) -> Result<f64, TraceError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| TraceError::parse(path, format!("non-numeric value {field:?} in column {column}")))
}

fn parse_i64(field: &str, column: &str, path: &Path) -> Result<i64, TraceError> {
    field
        .trim()
        .parse::<i64>()
        .map_err(|_| TraceError::parse(path, format!("non-integer value {field:?} in column {column}")))
}

fn parse_memory(path: &Path) -> Result<MemoryTable, TraceError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| TraceError::parse(path, err.to_string()))?
        .clone();
    let app_idx = required_column(&headers, COL_APP, path)?;
    let pct_idx = required_column(&headers, COL_MEMORY_PCT99, path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| TraceError::parse(path, err.to_string()))?;
        rows.push(MemoryRow {
            app: record[app_idx].to_string(),
            allocated_mb_pct99: parse_f64(&record[pct_idx], COL_MEMORY_PCT99, path)?,
        });
    }
    Ok(MemoryTable { rows })
}

fn parse_durations(path: &Path) -> Result<DurationTable, TraceError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| TraceError::parse(path, err.to_string()))?
        .clone();
    let app_idx = required_column(&headers, COL_APP, path)?;
    let func_idx = required_column(&headers, COL_FUNCTION, path)?;
    let pct_idx = required_column(&headers, COL_DURATION_PCT99, path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| TraceError::parse(path, err.to_string()))?;
        rows.push(DurationRow {
            app: record[app_idx].to_string(),
            function: record[func_idx].to_string(),
            pct99_ms: parse_f64(&record[pct_idx], COL_DURATION_PCT99, path)?,
        });
    }
    Ok(DurationTable { rows })
}

fn parse_invocations(path: &Path) -> Result<InvocationTable, TraceError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| TraceError::parse(path, err.to_string()))?
        .clone();
    let app_idx = required_column(&headers, COL_APP, path)?;
    let func_idx = required_column(&headers, COL_FUNCTION, path)?;

    // Everything that is not identity or dropped metadata is a count column.
    let count_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| *h != COL_APP && *h != COL_FUNCTION && *h != COL_OWNER && *h != COL_TRIGGER)
        .map(|(i, h)| (i, h.to_string()))
        .collect();
    if count_cols.is_empty() {
        return Err(TraceError::parse(path, "no invocation count columns"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| TraceError::parse(path, err.to_string()))?;
        let mut counts = Vec::with_capacity(count_cols.len());
        for (idx, column) in &count_cols {
            counts.push(parse_i64(&record[*idx], column, path)?);
        }
        rows.push(InvocationRow {
            app: record[app_idx].to_string(),
            function: record[func_idx].to_string(),
            counts,
        });
    }
    Ok(InvocationTable {
        rows,
        intervals: count_cols.len(),
    })
}
