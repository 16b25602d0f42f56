// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! faasload replay engine.
//!
//! Takes a loaded trace corpus, assigns each observed function a live RPC
//! endpoint, builds an immutable per-function query plan, and replays the
//! rescaled invocation series tick by tick with concurrent call fan-out
//! while a background monitor samples the serving cluster's worker
//! instances.

pub use anyhow::{Error, Result};
pub use tokio_util::sync::CancellationToken;

pub mod client;
pub mod config;
pub mod driver;
pub mod endpoints;
pub mod experiment;
pub mod logging;
pub mod monitor;
pub mod plan;
pub mod results;

pub use client::{BudgetViolation, CallOutcome, FunctionClient, InvokePayload};
pub use config::{DriverConfig, EndpointSource, ExperimentConfig};
pub use driver::LoadDriver;
pub use endpoints::{Assignment, EndpointPool};
pub use experiment::Experiment;
pub use monitor::{HttpInstanceLister, InstanceLister, ResourceMonitor};
pub use plan::{Query, SortPolicy};
pub use results::{ExperimentResult, FunctionStats, ResultAggregator};
