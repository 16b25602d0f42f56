// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! RPC client for the synthetic function servers.
//!
//! One invocation is one HTTP POST to `http://<endpoint>/invoke` carrying a
//! JSON payload with optional `executiontime` (ms), `objectsize` (KB) and
//! `memoryallocate` (KB) fields. A field is omitted entirely, not sent as
//! zero, when that behavior is to be skipped. The server replies with a
//! message string describing what it performed or which budget constraint it
//! could not satisfy; budget violations are completed calls, not transport
//! failures.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::plan::Query;

/// Request payload for one synthetic invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executiontime: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub objectsize: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memoryallocate: Option<u64>,
}

impl InvokePayload {
    /// Build the payload for a query, omitting zero-valued parameters.
    pub fn from_query(query: &Query) -> Self {
        Self::from_parts(query.execution_time_ms, query.object_size_kb, query.memory_kb)
    }

    pub fn from_parts(execution_time_ms: u64, object_size_kb: u64, memory_kb: u64) -> Self {
        InvokePayload {
            executiontime: (execution_time_ms > 0).then_some(execution_time_ms),
            objectsize: (object_size_kb > 0).then_some(object_size_kb),
            memoryallocate: (memory_kb > 0).then_some(memory_kb),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.executiontime.is_none() && self.objectsize.is_none() && self.memoryallocate.is_none()
    }
}

/// A budget constraint the server reported it could not satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetViolation {
    InsufficientMemory,
    ObjectNotFound,
    InsufficientTime,
}

impl BudgetViolation {
    /// Classify a server reply message. The synthetic servers signal budget
    /// violations in the message text rather than the status code.
    pub fn classify(message: &str) -> Option<Self> {
        if message.contains("Not enough memory") {
            Some(BudgetViolation::InsufficientMemory)
        } else if message.contains("does not exist in the bucket") {
            Some(BudgetViolation::ObjectNotFound)
        } else if message.contains("More time needed") {
            Some(BudgetViolation::InsufficientTime)
        } else {
            None
        }
    }
}

/// Why a call never completed a round trip.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallFailure {
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("request to {endpoint} timed out")]
    TimedOut { endpoint: String },

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("call cancelled before completion")]
    Cancelled,
}

/// The recorded outcome of one call. Failures are data here, never `Err`:
/// a failing call must not abort its tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CallOutcome {
    /// Round trip completed and the server performed the requested work.
    Completed { latency_ms: u64 },
    /// Round trip completed but the server rejected a budget constraint.
    Rejected {
        latency_ms: u64,
        violation: BudgetViolation,
    },
    /// No round trip: transport error, timeout or cancellation.
    Failed { error: String },
}

impl CallOutcome {
    pub fn failed(failure: CallFailure) -> Self {
        CallOutcome::Failed {
            error: failure.to_string(),
        }
    }
}

/// Shared HTTP client for all invocation calls. Cloning is cheap and reuses
/// the underlying connection pool across ticks.
#[derive(Debug, Clone)]
pub struct FunctionClient {
    http: reqwest::Client,
}

impl FunctionClient {
    pub fn new(call_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(call_timeout).build()?;
        Ok(Self { http })
    }

    /// Issue one invocation and record its outcome. Never returns `Err`.
    pub async fn invoke(&self, endpoint: &str, payload: &InvokePayload) -> CallOutcome {
        let url = format!("http://{endpoint}/invoke");
        let started = Instant::now();

        let response = match self.http.post(&url).json(payload).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return CallOutcome::failed(CallFailure::TimedOut {
                    endpoint: endpoint.to_string(),
                });
            }
            Err(err) => {
                return CallOutcome::failed(CallFailure::Transport {
                    endpoint: endpoint.to_string(),
                    reason: err.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            return CallOutcome::failed(CallFailure::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let message = match response.text().await {
            Ok(message) => message,
            Err(err) => {
                return CallOutcome::failed(CallFailure::Transport {
                    endpoint: endpoint.to_string(),
                    reason: err.to_string(),
                });
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        match BudgetViolation::classify(&message) {
            Some(violation) => {
                tracing::debug!(endpoint, ?violation, "call rejected by server");
                CallOutcome::Rejected {
                    latency_ms,
                    violation,
                }
            }
            None => CallOutcome::Completed { latency_ms },
        }
    }
}
