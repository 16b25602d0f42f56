// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Trace corpus handling for the faasload replay engine.
//!
//! The public Azure Functions trace corpus ships one CSV per (day, table
//! kind): per-app 99th-percentile allocated memory, per-function
//! 99th-percentile execution time, and per-function per-interval invocation
//! counts. This crate loads those tables into typed in-memory form
//! ([corpus::TraceCorpus]) and rescales raw invocation counts into a target
//! intensity range ([remap::rescale]) ahead of replay.

pub mod corpus;
pub mod error;
pub mod remap;
pub mod tables;

pub use corpus::{DayFilter, TraceCorpus};
pub use error::TraceError;
pub use remap::{RemapRange, RescaledInvocations};
pub use tables::{Day, DurationTable, InvocationTable, MemoryTable};
