// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors surfaced while loading or transforming trace tables.
///
/// All of these are structural: they abort the experiment before any load is
/// generated. Per-call failures during replay are handled in the engine crate
/// and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("failed to read trace directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A recognized trace file is malformed: unreadable, missing an expected
    /// column, or carrying a value that does not parse as a number.
    #[error("malformed trace file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid rescale range [{min}, {max}]: min must be less than max")]
    InvalidRange { min: i64, max: i64 },
}

impl TraceError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TraceError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
