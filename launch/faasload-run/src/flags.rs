// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use faasload_engine::config::{DriverConfig, EndpointSource, ExperimentConfig};
use faasload_engine::plan::SortPolicy;
use faasload_trace::{DayFilter, RemapRange};

/// Replay serverless invocation traces as live load, or issue one manual
/// call when no trace directory is given.
#[derive(Parser, Debug, Clone)]
#[command(name = "faasload-run", version, about)]
pub struct Flags {
    /// Endpoint to query in single-shot mode (host:port).
    #[arg(long, short = 'e')]
    pub endpoint: Option<String>,

    /// Path to the trace directory. If not specified, the manually-given
    /// parameters below are sent as a single call to --endpoint.
    #[arg(long, short = 'd')]
    pub trace_dir: Option<PathBuf>,

    /// Endpoint pool file, one address per line.
    #[arg(long)]
    pub endpoints_file: Option<PathBuf>,

    /// Single-entry JSON endpoint descriptor file.
    #[arg(long, conflicts_with = "endpoints_file")]
    pub endpoints_descriptor: Option<PathBuf>,

    /// Restrict loading to one trace day (1-14). Repeat for several days;
    /// omit to load all days.
    #[arg(long = "day", value_name = "N")]
    pub days: Vec<u8>,

    /// Bottom of the target invocation-count range.
    #[arg(long, default_value_t = 1)]
    pub min_range: i64,

    /// Top of the target invocation-count range.
    #[arg(long, default_value_t = 100)]
    pub max_range: i64,

    /// Number of ticks to replay. Omit to run the full trace length.
    #[arg(long)]
    pub ticks: Option<usize>,

    /// Query plan ordering: default|mintime|maxtime|minmem|maxmem.
    #[arg(long, default_value = "default")]
    pub sort: String,

    /// Cluster API base URL for worker-instance sampling. Omit to disable
    /// the resource monitor.
    #[arg(long)]
    pub cluster_api: Option<String>,

    /// Write the JSON results here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Per-call timeout, e.g. "30s". Overrides FAASLOAD_CALL_TIMEOUT_MS.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub call_timeout: Option<Duration>,

    /// Resource sampling interval, e.g. "1s". Overrides
    /// FAASLOAD_SAMPLE_INTERVAL_MS.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub sample_interval: Option<Duration>,

    /// Execution time in ms for single-shot mode (0 skips the field).
    #[arg(long, short = 't', default_value_t = 0)]
    pub execution_time_ms: u64,

    /// Object size in KB for single-shot mode (0 skips the field).
    #[arg(long, short = 's', default_value_t = 0)]
    pub object_size_kb: u64,

    /// Memory to allocate in KB for single-shot mode (0 skips the field).
    #[arg(long, short = 'm', default_value_t = 0)]
    pub memory_kb: u64,
}

impl Flags {
    /// Build the immutable experiment configuration for trace-replay mode.
    pub fn experiment_config(&self) -> anyhow::Result<ExperimentConfig> {
        let trace_dir = self
            .trace_dir
            .clone()
            .context("trace replay needs --trace-dir")?;

        for &day in &self.days {
            anyhow::ensure!((1..=14).contains(&day), "--day must be between 1 and 14, got {day}");
        }

        let sort: SortPolicy = self.sort.parse()?;
        let range = RemapRange::new(self.min_range, self.max_range)?;

        Ok(ExperimentConfig {
            trace_dir,
            days: DayFilter::from_days(self.days.iter().copied()),
            range,
            ticks: self.ticks,
            sort,
            endpoints: self.endpoint_source()?,
            cluster_api: self.cluster_api.clone(),
        })
    }

    /// Environment-derived driver knobs with any command-line overrides
    /// applied on top.
    pub fn driver_config(&self) -> DriverConfig {
        let mut config = DriverConfig::from_settings();
        if let Some(timeout) = self.call_timeout {
            config.call_timeout_ms = timeout.as_millis() as u64;
        }
        if let Some(interval) = self.sample_interval {
            config.sample_interval_ms = interval.as_millis() as u64;
        }
        config
    }

    fn endpoint_source(&self) -> anyhow::Result<EndpointSource> {
        match (&self.endpoints_file, &self.endpoints_descriptor) {
            (Some(path), None) => Ok(EndpointSource::List(path.clone())),
            (None, Some(path)) => Ok(EndpointSource::Descriptor(path.clone())),
            (None, None) => anyhow::bail!(
                "trace replay needs --endpoints-file or --endpoints-descriptor"
            ),
            // clap's conflicts_with already rejects this, belt and braces.
            (Some(_), Some(_)) => anyhow::bail!(
                "--endpoints-file and --endpoints-descriptor are mutually exclusive"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_flags_build_a_config() {
        let flags = Flags::parse_from([
            "faasload-run",
            "--trace-dir",
            "/tmp/traces",
            "--endpoints-file",
            "/tmp/endpoints.txt",
            "--day",
            "1",
            "--day",
            "2",
            "--min-range",
            "1",
            "--max-range",
            "10",
            "--sort",
            "mintime",
            "--ticks",
            "60",
        ]);
        let config = flags.experiment_config().unwrap();
        assert_eq!(config.ticks, Some(60));
        assert_eq!(config.sort, SortPolicy::TimeAscending);
        assert!(matches!(config.endpoints, EndpointSource::List(_)));
    }

    #[test]
    fn replay_without_endpoint_source_is_rejected() {
        let flags = Flags::parse_from(["faasload-run", "--trace-dir", "/tmp/traces"]);
        assert!(flags.experiment_config().is_err());
    }

    #[test]
    fn invalid_day_is_rejected() {
        let flags = Flags::parse_from([
            "faasload-run",
            "--trace-dir",
            "/tmp/traces",
            "--endpoints-file",
            "/tmp/endpoints.txt",
            "--day",
            "15",
        ]);
        assert!(flags.experiment_config().is_err());
    }

    #[test]
    fn invalid_range_is_rejected() {
        let flags = Flags::parse_from([
            "faasload-run",
            "--trace-dir",
            "/tmp/traces",
            "--endpoints-file",
            "/tmp/endpoints.txt",
            "--min-range",
            "10",
            "--max-range",
            "10",
        ]);
        assert!(flags.experiment_config().is_err());
    }
}
