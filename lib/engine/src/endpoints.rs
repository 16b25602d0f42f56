// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Endpoint pool and function-to-endpoint assignment.
//!
//! The pool is consumed destructively, front of queue first, while walking
//! duration-table rows in day/row order. Assignment is therefore
//! deterministic given identical pool and table ordering: no two functions
//! share an endpoint and no endpoint is reused. Running out of endpoints is
//! not an error; surplus functions are simply left out of the query plan.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use faasload_trace::DurationTable;

use crate::config::EndpointSource;

/// An ordered pool of opaque endpoint address strings.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    queue: VecDeque<String>,
}

/// One entry of a JSON endpoint descriptor file.
#[derive(Debug, Deserialize)]
struct EndpointDescriptor {
    hostname: String,
}

impl EndpointPool {
    pub fn load(source: &EndpointSource) -> anyhow::Result<Self> {
        match source {
            EndpointSource::List(path) => Self::from_list(path),
            EndpointSource::Descriptor(path) => Self::from_descriptor(path),
        }
    }

    /// Flat text file, one address per line.
    pub fn from_list(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading endpoint list {}", path.display()))?;
        let queue: VecDeque<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        anyhow::ensure!(!queue.is_empty(), "endpoint list {} is empty", path.display());
        Ok(Self { queue })
    }

    /// JSON descriptor file; only the first entry's hostname is used.
    pub fn from_descriptor(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading endpoint descriptor {}", path.display()))?;
        let descriptors: Vec<EndpointDescriptor> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing endpoint descriptor {}", path.display()))?;
        let first = descriptors
            .into_iter()
            .next()
            .with_context(|| format!("endpoint descriptor {} is empty", path.display()))?;
        Ok(Self {
            queue: VecDeque::from([first.hostname]),
        })
    }

    pub fn from_addresses(addresses: impl IntoIterator<Item = String>) -> Self {
        Self {
            queue: addresses.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }
}

/// A function bound to its endpoint for the life of the experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub function: String,
    pub app: String,
    pub endpoint: String,
}

/// Walk duration-table rows in order and bind each unseen function to the
/// next endpoint in the pool, stopping early once the pool is exhausted.
pub fn assign_endpoints<'a>(
    pool: &mut EndpointPool,
    durations: impl Iterator<Item = &'a DurationTable>,
) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    'tables: for table in durations {
        for row in &table.rows {
            if seen.contains(row.function.as_str()) {
                continue;
            }
            let Some(endpoint) = pool.pop() else {
                break 'tables;
            };
            seen.insert(row.function.as_str());
            assignments.push(Assignment {
                function: row.function.clone(),
                app: row.app.clone(),
                endpoint,
            });
        }
    }

    tracing::info!(assigned = assignments.len(), remaining_endpoints = pool.len(), "endpoint assignment complete");
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use faasload_trace::tables::DurationRow;

    fn durations(rows: &[(&str, &str)]) -> DurationTable {
        DurationTable {
            rows: rows
                .iter()
                .map(|(app, function)| DurationRow {
                    app: app.to_string(),
                    function: function.to_string(),
                    pct99_ms: 100.0,
                })
                .collect(),
        }
    }

    #[test]
    fn assigns_min_of_functions_and_endpoints() {
        let table = durations(&[("a1", "f1"), ("a2", "f2"), ("a3", "f3")]);
        let mut pool = EndpointPool::from_addresses(["e1".into(), "e2".into()]);

        let assignments = assign_endpoints(&mut pool, std::iter::once(&table));
        assert_eq!(assignments.len(), 2);
        assert!(pool.is_empty());
        assert_eq!(assignments[0].endpoint, "e1");
        assert_eq!(assignments[1].endpoint, "e2");
    }

    #[test]
    fn no_endpoint_is_reused() {
        let table = durations(&[("a1", "f1"), ("a2", "f2"), ("a3", "f3")]);
        let mut pool =
            EndpointPool::from_addresses(["e1".into(), "e2".into(), "e3".into(), "e4".into()]);

        let assignments = assign_endpoints(&mut pool, std::iter::once(&table));
        let mut endpoints: Vec<&str> = assignments.iter().map(|a| a.endpoint.as_str()).collect();
        endpoints.sort();
        endpoints.dedup();
        assert_eq!(endpoints.len(), assignments.len());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn repeated_functions_across_days_are_assigned_once() {
        let day1 = durations(&[("a1", "f1")]);
        let day2 = durations(&[("a1", "f1"), ("a2", "f2")]);
        let mut pool = EndpointPool::from_addresses(["e1".into(), "e2".into(), "e3".into()]);

        let assignments = assign_endpoints(&mut pool, [&day1, &day2].into_iter());
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].function, "f1");
        assert_eq!(assignments[1].function, "f2");
    }

    #[test]
    fn descriptor_file_yields_single_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endpoints.json");
        std::fs::write(
            &path,
            r#"[{"hostname": "10.0.0.5:50051"}, {"hostname": "ignored:1"}]"#,
        )
        .unwrap();

        let pool = EndpointPool::from_descriptor(&path).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn list_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endpoints.txt");
        std::fs::write(&path, "e1:50051\n\n  e2:50051  \n").unwrap();

        let pool = EndpointPool::from_list(&path).unwrap();
        assert_eq!(pool.len(), 2);
    }
}
