// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup.
//!
//! Filters come from the `FAASLOAD_LOG` environment variable (same syntax as
//! `RUST_LOG`); the default level is `info`. Output is human-readable unless
//! `FAASLOAD_LOG_JSONL` is truthy, in which case one JSON object is emitted
//! per line.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Default log level
const DEFAULT_FILTER_LEVEL: &str = "info";

/// Environment variable holding the filter directives.
const FILTER_ENV: &str = "FAASLOAD_LOG";

/// Environment variable selecting JSONL output.
const JSONL_ENV: &str = "FAASLOAD_LOG_JSONL";

/// Once instance to ensure the logger is only initialized once
static INIT: Once = Once::new();

/// Checks if the given environment variable is set to a truthy value
/// (accepts: "1", "true", "on", "yes" - case insensitive).
fn env_is_truthy(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "on" | "yes"))
        .unwrap_or(false)
}

/// Initialize the global tracing subscriber. Safe to call more than once;
/// only the first call has any effect.
pub fn init() {
    INIT.call_once(setup);
}

fn setup() {
    let filter = EnvFilter::try_from_env(FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER_LEVEL));

    if env_is_truthy(JSONL_ENV) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        std::env::set_var("FAASLOAD_TEST_TRUTHY", "ON");
        assert!(env_is_truthy("FAASLOAD_TEST_TRUTHY"));
        std::env::set_var("FAASLOAD_TEST_TRUTHY", "0");
        assert!(!env_is_truthy("FAASLOAD_TEST_TRUTHY"));
        std::env::remove_var("FAASLOAD_TEST_TRUTHY");
        assert!(!env_is_truthy("FAASLOAD_TEST_TRUTHY"));
    }
}
