// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use tokio_util::sync::CancellationToken;

use faasload_run::Flags;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    faasload_engine::logging::init();
    let flags = Flags::parse();

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping at the next tick boundary");
            signal_token.cancel();
        }
    });

    faasload_run::run(flags, token).await
}
