// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Result aggregation.
//!
//! Workers never touch shared state: each completed call sends one
//! `(function, outcome)` record over an unbounded channel to a single
//! collector task that owns the per-function lists and counters. Dropping
//! the last sender finalizes the collector, after which the state is read
//! only.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::CallOutcome;

/// Accumulated observations for one function.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionStats {
    /// Round-trip latencies in completion order. Budget-rejected calls still
    /// completed a round trip and are included.
    pub latencies_ms: Vec<u64>,
    /// Total calls recorded, including failures.
    pub invocations: u64,
    /// Calls the server completed but rejected for budget reasons.
    pub rejected: u64,
    /// Calls that never completed a round trip.
    pub failures: u64,
}

/// Final output of one experiment run.
#[derive(Debug, Serialize)]
pub struct ExperimentResult {
    pub functions: BTreeMap<String, FunctionStats>,
    /// Every distinct worker instance the monitor ever observed.
    pub instances_seen: BTreeSet<String>,
}

/// One completed call, as reported by a driver worker.
#[derive(Debug)]
pub struct CallRecord {
    pub function: String,
    pub outcome: CallOutcome,
}

/// Cloneable sending half handed to every driver worker.
#[derive(Debug, Clone)]
pub struct RecordSender(mpsc::UnboundedSender<CallRecord>);

impl RecordSender {
    pub fn record(&self, function: String, outcome: CallOutcome) {
        // The collector outlives the driver, so a send can only fail during
        // teardown; nothing useful is lost at that point.
        if self.0.send(CallRecord { function, outcome }).is_err() {
            tracing::debug!("result collector already stopped, dropping record");
        }
    }
}

/// Handle to the collector task.
pub struct ResultAggregator {
    tx: mpsc::UnboundedSender<CallRecord>,
    handle: JoinHandle<BTreeMap<String, FunctionStats>>,
}

impl ResultAggregator {
    /// Spawn the collector task.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CallRecord>();
        let handle = tokio::spawn(async move {
            let mut functions: BTreeMap<String, FunctionStats> = BTreeMap::new();
            while let Some(record) = rx.recv().await {
                let stats = functions.entry(record.function).or_default();
                stats.invocations += 1;
                match record.outcome {
                    CallOutcome::Completed { latency_ms } => {
                        stats.latencies_ms.push(latency_ms);
                    }
                    CallOutcome::Rejected { latency_ms, .. } => {
                        stats.latencies_ms.push(latency_ms);
                        stats.rejected += 1;
                    }
                    CallOutcome::Failed { error } => {
                        stats.failures += 1;
                        tracing::debug!(%error, "recorded failed call");
                    }
                }
            }
            functions
        });
        Self { tx, handle }
    }

    pub fn sender(&self) -> RecordSender {
        RecordSender(self.tx.clone())
    }

    /// Close the channel and wait for the collector to drain.
    pub async fn finish(self) -> anyhow::Result<BTreeMap<String, FunctionStats>> {
        drop(self.tx);
        self.handle
            .await
            .map_err(|err| anyhow::anyhow!("result collector panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BudgetViolation;

    #[tokio::test]
    async fn concurrent_records_are_not_lost() {
        let aggregator = ResultAggregator::spawn();
        let mut handles = Vec::new();
        for worker in 0..8 {
            let sender = aggregator.sender();
            handles.push(tokio::spawn(async move {
                for i in 0..100u64 {
                    sender.record(
                        format!("f{}", worker % 2),
                        CallOutcome::Completed { latency_ms: i },
                    );
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let functions = aggregator.finish().await.unwrap();
        let total: u64 = functions.values().map(|s| s.invocations).sum();
        assert_eq!(total, 800);
        assert_eq!(functions["f0"].latencies_ms.len(), 400);
        assert_eq!(functions["f1"].latencies_ms.len(), 400);
    }

    #[tokio::test]
    async fn outcomes_are_classified_per_function() {
        let aggregator = ResultAggregator::spawn();
        let sender = aggregator.sender();
        sender.record("f1".into(), CallOutcome::Completed { latency_ms: 12 });
        sender.record(
            "f1".into(),
            CallOutcome::Rejected {
                latency_ms: 40,
                violation: BudgetViolation::InsufficientMemory,
            },
        );
        sender.record(
            "f1".into(),
            CallOutcome::Failed {
                error: "connection refused".into(),
            },
        );

        // Drop the sender so the collector's channel can close; otherwise
        // `finish()` waits forever for an outstanding sender.
        drop(sender);

        let functions = aggregator.finish().await.unwrap();
        let stats = &functions["f1"];
        assert_eq!(stats.invocations, 3);
        assert_eq!(stats.latencies_ms, vec![12, 40]);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.failures, 1);
    }
}
