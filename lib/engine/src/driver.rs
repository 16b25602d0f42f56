// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tick-by-tick load driver.
//!
//! Steps through discrete one-second ticks of the replay timeline. At tick
//! `t`, every query contributes `invocations[t]` concurrent calls against
//! its endpoint; all calls issued for a tick, across all queries, must
//! complete before tick `t+1` begins. That per-tick barrier is the only
//! blocking point in the loop. Failing calls are recorded and never abort
//! the tick.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::client::{CallFailure, CallOutcome, FunctionClient, InvokePayload};
use crate::config::DriverConfig;
use crate::plan::Query;
use crate::results::RecordSender;

/// What the driver actually did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSummary {
    pub ticks_run: usize,
    pub calls_issued: u64,
}

pub struct LoadDriver {
    client: FunctionClient,
    limiter: Arc<Semaphore>,
}

impl LoadDriver {
    pub fn new(config: &DriverConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: FunctionClient::new(config.call_timeout())?,
            limiter: Arc::new(Semaphore::new(config.max_in_flight)),
        })
    }

    /// Drive the plan for `ticks` ticks, or the full invocation-sequence
    /// length when `ticks` is `None`. Outcomes stream to `sender` as calls
    /// complete; `token` stops the loop at the next tick boundary and is
    /// raced against every in-flight call.
    pub async fn run(
        &self,
        plan: &[Query],
        ticks: Option<usize>,
        sender: RecordSender,
        token: CancellationToken,
    ) -> DriveSummary {
        // All sequences share one length by construction, so any query's
        // length is the trace length.
        let trace_len = plan.first().map(|q| q.invocations.len()).unwrap_or(0);
        let total_ticks = ticks.unwrap_or(trace_len);

        // The payload never varies across ticks; build each one once.
        let payloads: Vec<InvokePayload> = plan.iter().map(InvokePayload::from_query).collect();

        let mut calls_issued: u64 = 0;
        let mut ticks_run = 0;
        for tick in 0..total_ticks {
            if token.is_cancelled() {
                tracing::info!(tick, "load driver cancelled at tick boundary");
                break;
            }

            let mut in_flight: JoinSet<()> = JoinSet::new();
            let mut tick_calls: u64 = 0;
            for (query, payload) in plan.iter().zip(&payloads) {
                // Ticks past the end of the sequence issue no calls.
                let count = query.invocations.get(tick).copied().unwrap_or(0).max(0);
                for _ in 0..count {
                    let permit = match self.limiter.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        // The semaphore is never closed while the driver runs.
                        Err(_) => return DriveSummary { ticks_run, calls_issued },
                    };
                    let client = self.client.clone();
                    let sender = sender.clone();
                    let token = token.clone();
                    let function = query.function.clone();
                    let endpoint = query.endpoint.clone();
                    let payload = payload.clone();

                    in_flight.spawn(async move {
                        let _permit = permit;
                        let outcome = tokio::select! {
                            _ = token.cancelled() => CallOutcome::failed(CallFailure::Cancelled),
                            outcome = client.invoke(&endpoint, &payload) => outcome,
                        };
                        sender.record(function, outcome);
                    });
                    tick_calls += 1;
                }
            }

            // Barrier: tick t+1 must not start until every call of tick t
            // has completed, success or failure.
            while let Some(joined) = in_flight.join_next().await {
                if let Err(err) = joined {
                    tracing::error!(%err, tick, "call task panicked");
                }
            }

            calls_issued += tick_calls;
            ticks_run += 1;
            tracing::debug!(tick, calls = tick_calls, "tick complete");
        }

        tracing::info!(ticks_run, calls_issued, "load drive complete");
        DriveSummary {
            ticks_run,
            calls_issued,
        }
    }
}
