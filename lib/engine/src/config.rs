// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

use faasload_trace::{DayFilter, RemapRange};

use crate::plan::SortPolicy;

/// Default per-call timeout in milliseconds.
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Default cap on concurrently in-flight calls.
const DEFAULT_MAX_IN_FLIGHT: usize = 512;

/// Default resource-sampling interval in milliseconds.
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1_000;

/// Where the endpoint pool is read from. Exactly one source is used per run.
#[derive(Debug, Clone)]
pub enum EndpointSource {
    /// Flat text file, one address per line. Blank lines are skipped.
    List(PathBuf),
    /// JSON descriptor file: an array of objects with a `hostname` field,
    /// of which only the first entry is used.
    Descriptor(PathBuf),
}

/// Immutable per-experiment configuration, constructed once at startup and
/// passed to each component.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Directory holding the per-day trace CSVs.
    pub trace_dir: PathBuf,
    /// Days to load; empty accepts all.
    pub days: DayFilter,
    /// Target invocation-count range.
    pub range: RemapRange,
    /// Number of ticks to drive. `None` runs the full trace length.
    pub ticks: Option<usize>,
    /// Query plan ordering.
    pub sort: SortPolicy,
    /// Endpoint pool source.
    pub endpoints: EndpointSource,
    /// Cluster API base URL for worker-instance sampling; `None` disables
    /// the resource monitor.
    pub cluster_api: Option<String>,
}

/// Ambient driver knobs, read from the environment.
///
/// These are deliberately separate from [ExperimentConfig]: they tune the
/// replay machinery, not the experiment itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Per-call timeout in milliseconds.
    /// Set this at runtime with environment variable FAASLOAD_CALL_TIMEOUT_MS.
    pub call_timeout_ms: u64,

    /// Maximum number of concurrently in-flight calls across all functions.
    /// Set this at runtime with environment variable FAASLOAD_MAX_IN_FLIGHT.
    pub max_in_flight: usize,

    /// Resource monitor sampling interval in milliseconds.
    /// Set this at runtime with environment variable FAASLOAD_SAMPLE_INTERVAL_MS.
    pub sample_interval_ms: u64,
}

impl DriverConfig {
    /// Instantiates and reads driver configuration from appropriate sources.
    /// Panics on invalid configuration.
    pub fn from_settings() -> Self {
        // All calls should be global and thread safe.
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("FAASLOAD_"))
            .extract()
            .unwrap() // safety: Called on startup, so panic is reasonable
    }

    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.call_timeout_ms)
    }

    pub fn sample_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sample_interval_ms)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
        }
    }
}
