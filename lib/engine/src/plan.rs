// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Query plan construction.
//!
//! Joins per-function latency/memory statistics with the rescaled invocation
//! series and the assigned endpoint into one immutable [Query] per function.
//! Statistics come from the first loaded day only; later days are not
//! averaged in. An optional sort policy reorders the plan; sorting is stable,
//! so functions with equal keys keep their assignment order.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use faasload_trace::{RescaledInvocations, TraceCorpus};

use crate::endpoints::Assignment;

/// Immutable per-function replay descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub function: String,
    pub app: String,
    pub endpoint: String,
    /// 99th-percentile execution time, milliseconds.
    pub execution_time_ms: u64,
    /// 99th-percentile allocated memory, KB on the wire (the trace records MB).
    pub memory_kb: u64,
    /// No object-size column is sourced from the traces today.
    pub object_size_kb: u64,
    /// Rescaled per-tick invocation counts.
    pub invocations: Vec<i64>,
}

/// Plan ordering. `Unsorted` preserves assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortPolicy {
    #[default]
    Unsorted,
    TimeAscending,
    TimeDescending,
    MemoryAscending,
    MemoryDescending,
}

impl FromStr for SortPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "default" => Ok(SortPolicy::Unsorted),
            "mintime" => Ok(SortPolicy::TimeAscending),
            "maxtime" => Ok(SortPolicy::TimeDescending),
            "minmem" => Ok(SortPolicy::MemoryAscending),
            "maxmem" => Ok(SortPolicy::MemoryDescending),
            e => Err(anyhow::anyhow!("Invalid sort= option '{e}'")),
        }
    }
}

impl fmt::Display for SortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SortPolicy::Unsorted => "default",
            SortPolicy::TimeAscending => "mintime",
            SortPolicy::TimeDescending => "maxtime",
            SortPolicy::MemoryAscending => "minmem",
            SortPolicy::MemoryDescending => "maxmem",
        };
        write!(f, "{s}")
    }
}

/// Build the query plan for the assigned functions.
///
/// A function whose execution-time, memory or invocation row cannot be found
/// is dropped with a warning; structural problems were already surfaced at
/// corpus load time.
pub fn build_plan(
    assignments: &[Assignment],
    corpus: &TraceCorpus,
    rescaled: &RescaledInvocations,
    sort: SortPolicy,
) -> Vec<Query> {
    let Some(durations) = corpus.first_day_durations() else {
        tracing::warn!("no duration table loaded, query plan is empty");
        return Vec::new();
    };
    let Some(memory) = corpus.first_day_memory() else {
        tracing::warn!("no memory table loaded, query plan is empty");
        return Vec::new();
    };

    let mut plan = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let Some(pct99_ms) = durations.pct99_ms(&assignment.function) else {
            tracing::warn!(function = %assignment.function, "no execution-time statistic on the first day, dropping");
            continue;
        };
        let Some(allocated_mb) = memory.allocated_mb_pct99(&assignment.app) else {
            tracing::warn!(app = %assignment.app, function = %assignment.function, "no memory statistic on the first day, dropping");
            continue;
        };
        let Some(counts) = rescaled.counts_for(&assignment.function) else {
            tracing::warn!(function = %assignment.function, "no invocation row after join, dropping");
            continue;
        };

        plan.push(Query {
            function: assignment.function.clone(),
            app: assignment.app.clone(),
            endpoint: assignment.endpoint.clone(),
            execution_time_ms: pct99_ms.round() as u64,
            memory_kb: (allocated_mb * 1024.0).round() as u64,
            object_size_kb: 0,
            invocations: counts.to_vec(),
        });
    }

    if let Some(first) = plan.first() {
        let ticks = first.invocations.len();
        debug_assert!(
            plan.iter().all(|q| q.invocations.len() == ticks),
            "invocation sequences must share one length"
        );
    }

    // Vec::sort_by_key is stable: equal keys keep assignment order.
    match sort {
        SortPolicy::Unsorted => {}
        SortPolicy::TimeAscending => plan.sort_by_key(|q| q.execution_time_ms),
        SortPolicy::TimeDescending => plan.sort_by_key(|q| Reverse(q.execution_time_ms)),
        SortPolicy::MemoryAscending => plan.sort_by_key(|q| q.memory_kb),
        SortPolicy::MemoryDescending => plan.sort_by_key(|q| Reverse(q.memory_kb)),
    }

    plan
}
