// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end experiment orchestration.
//!
//! Load corpus → assign endpoints → rescale invocations → build plan →
//! run the load driver with the result collector and the resource monitor
//! alongside → finalize. Structural errors abort before any load is
//! generated; once the driver starts, per-call failures are isolated and
//! recorded.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use faasload_trace::{remap, TraceCorpus};

use crate::config::{DriverConfig, ExperimentConfig};
use crate::driver::LoadDriver;
use crate::endpoints::{assign_endpoints, EndpointPool};
use crate::monitor::{HttpInstanceLister, InstanceLister, ResourceMonitor};
use crate::plan::build_plan;
use crate::results::{ExperimentResult, ResultAggregator};

pub struct Experiment {
    config: ExperimentConfig,
    driver: DriverConfig,
    lister: Option<Arc<dyn InstanceLister>>,
}

impl Experiment {
    pub fn new(config: ExperimentConfig, driver: DriverConfig) -> Self {
        Self {
            config,
            driver,
            lister: None,
        }
    }

    /// Override the cluster instance source (tests use this to avoid a live
    /// cluster API).
    pub fn with_instance_lister(mut self, lister: Arc<dyn InstanceLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Run the full replay. `token` cancels the driver at the next tick
    /// boundary and every in-flight call immediately.
    pub async fn run(self, token: CancellationToken) -> anyhow::Result<ExperimentResult> {
        let Self {
            config,
            driver: driver_config,
            lister,
        } = self;

        let corpus = TraceCorpus::load(&config.trace_dir, &config.days)?;
        anyhow::ensure!(
            !corpus.durations.is_empty(),
            "no duration tables found under {}",
            config.trace_dir.display()
        );
        anyhow::ensure!(
            !corpus.invocations.is_empty(),
            "no invocation tables found under {}",
            config.trace_dir.display()
        );

        let mut pool = EndpointPool::load(&config.endpoints)?;
        let assignments = assign_endpoints(&mut pool, corpus.durations_in_day_order());
        anyhow::ensure!(!assignments.is_empty(), "no functions could be assigned an endpoint");

        let assigned: HashSet<String> = assignments
            .iter()
            .map(|a| a.function.clone())
            .collect();
        let rescaled = remap::rescale(
            &corpus.invocations_in_day_order(),
            &assigned,
            config.range,
        );

        let plan = build_plan(&assignments, &corpus, &rescaled, config.sort);
        anyhow::ensure!(!plan.is_empty(), "query plan is empty, nothing to replay");
        tracing::info!(
            functions = plan.len(),
            ticks = plan[0].invocations.len(),
            sort = %config.sort,
            "query plan ready"
        );

        let lister = match (lister, &config.cluster_api) {
            (Some(lister), _) => Some(lister),
            (None, Some(base)) => {
                Some(Arc::new(HttpInstanceLister::new(base.clone())?) as Arc<dyn InstanceLister>)
            }
            (None, None) => None,
        };

        let aggregator = ResultAggregator::spawn();
        let monitor = lister.map(|lister| {
            ResourceMonitor::spawn(lister, driver_config.sample_interval(), token.child_token())
        });

        let driver = LoadDriver::new(&driver_config)?;
        let summary = driver
            .run(&plan, config.ticks, aggregator.sender(), token.clone())
            .await;
        tracing::info!(
            ticks = summary.ticks_run,
            calls = summary.calls_issued,
            "replay finished"
        );

        // The monitor stops only after the last tick has completed.
        let instances_seen = match monitor {
            Some(monitor) => monitor.stop().await,
            None => BTreeSet::new(),
        };
        let functions = aggregator.finish().await?;

        Ok(ExperimentResult {
            functions,
            instances_seen,
        })
    }
}
