// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Background resource monitor.
//!
//! Samples the serving cluster's live worker instances on a fixed interval,
//! concurrently with the load driver, and unions every observed instance id
//! into one cumulative set: the result records all instances ever seen over
//! the experiment, not a per-tick snapshot. The monitor runs until its
//! cancellation token fires and never dies on a sampling error.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Source of the cluster's current live worker instances.
#[async_trait::async_trait]
pub trait InstanceLister: Send + Sync {
    async fn list_instances(&self) -> anyhow::Result<Vec<String>>;
}

/// Lists instances from a cluster API endpoint: GET `<base>/instances`
/// returning a JSON array of instance ids.
#[derive(Debug, Clone)]
pub struct HttpInstanceLister {
    http: reqwest::Client,
    base: String,
}

impl HttpInstanceLister {
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base: base.into(),
        })
    }
}

#[async_trait::async_trait]
impl InstanceLister for HttpInstanceLister {
    async fn list_instances(&self) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/instances", self.base.trim_end_matches('/'));
        let instances = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<String>>()
            .await?;
        Ok(instances)
    }
}

/// Handle to the spawned monitor task.
pub struct ResourceMonitor {
    token: CancellationToken,
    handle: JoinHandle<BTreeSet<String>>,
}

impl ResourceMonitor {
    /// Spawn the sampling loop. The first sample is taken immediately, then
    /// one per `interval` until `token` is cancelled.
    pub fn spawn(
        lister: Arc<dyn InstanceLister>,
        interval: Duration,
        token: CancellationToken,
    ) -> Self {
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut seen: BTreeSet<String> = BTreeSet::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        tracing::debug!("resource monitor cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        match lister.list_instances().await {
                            Ok(instances) => {
                                for instance in instances {
                                    if seen.insert(instance.clone()) {
                                        tracing::debug!(%instance, "new worker instance observed");
                                    }
                                }
                            }
                            Err(err) => {
                                tracing::warn!(%err, "instance sampling failed, skipping interval");
                            }
                        }
                    }
                }
            }

            tracing::info!(distinct_instances = seen.len(), "resource monitor exiting");
            seen
        });

        Self { token, handle }
    }

    /// Signal the monitor to stop and return the cumulative instance set.
    pub async fn stop(self) -> BTreeSet<String> {
        self.token.cancel();
        match self.handle.await {
            Ok(seen) => seen,
            Err(err) => {
                tracing::error!(%err, "resource monitor task failed");
                BTreeSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns one canned snapshot per sample, then repeats the last.
    struct MockLister {
        snapshots: Mutex<VecDeque<Vec<String>>>,
    }

    impl MockLister {
        fn new(snapshots: Vec<Vec<&str>>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: Mutex::new(
                    snapshots
                        .into_iter()
                        .map(|s| s.into_iter().map(String::from).collect())
                        .collect(),
                ),
            })
        }
    }

    #[async_trait::async_trait]
    impl InstanceLister for MockLister {
        async fn list_instances(&self) -> anyhow::Result<Vec<String>> {
            let mut snapshots = self.snapshots.lock().unwrap();
            if snapshots.len() > 1 {
                Ok(snapshots.pop_front().unwrap())
            } else {
                Ok(snapshots.front().cloned().unwrap_or_default())
            }
        }
    }

    #[tokio::test]
    async fn accumulates_instances_across_samples() {
        // Instances that disappear stay in the cumulative set.
        let lister = MockLister::new(vec![
            vec!["w1", "w2"],
            vec!["w2", "w3"],
            vec!["w3"],
        ]);
        let monitor = ResourceMonitor::spawn(
            lister,
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        tokio::time::sleep(Duration::from_millis(60)).await;

        let seen = monitor.stop().await;
        assert_eq!(
            seen,
            BTreeSet::from(["w1".to_string(), "w2".to_string(), "w3".to_string()])
        );
    }

    #[tokio::test]
    async fn stop_signal_terminates_promptly() {
        let lister = MockLister::new(vec![vec!["w1"]]);
        let monitor = ResourceMonitor::spawn(
            lister,
            Duration::from_secs(3600),
            CancellationToken::new(),
        );
        // First sample fires immediately; the next is an hour out, so stop
        // must not wait for it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let seen = tokio::time::timeout(Duration::from_secs(1), monitor.stop())
            .await
            .expect("stop should not block on the sampling interval");
        assert!(seen.contains("w1"));
    }

    #[tokio::test]
    async fn sampling_errors_do_not_kill_the_monitor() {
        struct FlakyLister {
            calls: Mutex<u32>,
        }

        #[async_trait::async_trait]
        impl InstanceLister for FlakyLister {
            async fn list_instances(&self) -> anyhow::Result<Vec<String>> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    anyhow::bail!("cluster API unreachable");
                }
                Ok(vec!["w1".to_string()])
            }
        }

        let monitor = ResourceMonitor::spawn(
            Arc::new(FlakyLister {
                calls: Mutex::new(0),
            }),
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = monitor.stop().await;
        assert!(seen.contains("w1"));
    }
}
