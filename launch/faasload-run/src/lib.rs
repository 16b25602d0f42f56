// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! faasload CLI.
//!
//! Two modes, selected by the presence of `--trace-dir`:
//! - trace replay: drive the full pipeline and dump the `ExperimentResult`
//!   as JSON to stdout or `--output`;
//! - single shot: one manual call to `--endpoint` carrying the given
//!   execution-time / object-size / memory parameters.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use faasload_engine::client::{CallOutcome, FunctionClient, InvokePayload};
use faasload_engine::Experiment;

mod flags;
pub use flags::Flags;

pub async fn run(flags: Flags, token: CancellationToken) -> anyhow::Result<()> {
    if flags.trace_dir.is_some() {
        run_replay(flags, token).await
    } else {
        run_single_shot(flags).await
    }
}

async fn run_replay(flags: Flags, token: CancellationToken) -> anyhow::Result<()> {
    let config = flags.experiment_config()?;
    let driver_config = flags.driver_config();

    let result = Experiment::new(config, driver_config).run(token).await?;

    match &flags.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&result)?;
            std::fs::write(path, json)
                .with_context(|| format!("writing results to {}", path.display()))?;
            tracing::info!(path = %path.display(), "results written");
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &result)?;
            println!();
        }
    }
    Ok(())
}

async fn run_single_shot(flags: Flags) -> anyhow::Result<()> {
    let endpoint = flags
        .endpoint
        .as_deref()
        .context("single-shot mode needs --endpoint")?;
    let payload = InvokePayload::from_parts(
        flags.execution_time_ms,
        flags.object_size_kb,
        flags.memory_kb,
    );
    anyhow::ensure!(
        !payload.is_empty(),
        "give at least one of --execution-time-ms, --object-size-kb, --memory-kb"
    );

    let client = FunctionClient::new(flags.driver_config().call_timeout())?;
    tracing::info!(endpoint, ?payload, "issuing single-shot call");
    match client.invoke(endpoint, &payload).await {
        CallOutcome::Completed { latency_ms } => {
            tracing::info!(latency_ms, "call completed");
            Ok(())
        }
        CallOutcome::Rejected {
            latency_ms,
            violation,
        } => {
            tracing::warn!(latency_ms, ?violation, "server rejected the requested budget");
            Ok(())
        }
        CallOutcome::Failed { error } => anyhow::bail!("call failed: {error}"),
    }
}
