use std::time::Duration;

use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use super::aggregate::{Aggregator, LatencyAggregate, LatencySummary};

/// Background summary of one fan-out level.
///
/// Samples are sent through [`LatencySender`]s. Once every sender is gone, which is the close signal,
/// the summary is computed and logged, and [`LatencyAggregator::close`] resolves with it.
#[derive(Debug)]
pub struct LatencyAggregator {
    key: String,
    sender: Option<UnboundedSender<Duration>>,
    task: JoinHandle<LatencySummary>,
}

#[derive(Debug, Clone)]
pub struct LatencySender {
    sender: UnboundedSender<Duration>,
}
impl LatencySender {
    pub fn record(&self, elapsed: Duration) {
        if self.sender.send(elapsed).is_err() {
            tracing::warn!(?elapsed, "latency summary is already closed");
        }
    }
}

impl LatencyAggregator {
    pub fn spawn<K: Into<String>>(key: K) -> Self {
        let key = key.into();
        let (sender, receiver) = unbounded_channel();
        let task = tokio::spawn(Self::summarize(key.clone(), receiver));
        Self { key, sender: Some(sender), task }
    }

    pub fn sender(&self) -> Option<LatencySender> {
        self.sender.clone().map(|sender| LatencySender { sender })
    }

    /// Close own sender and wait until the summary is ready.
    pub async fn close(mut self) -> Option<LatencySummary> {
        drop(self.sender.take());
        match self.task.await {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::error!(key = %self.key, %err, "latency summary is lost");
                None
            }
        }
    }

    async fn summarize(key: String, mut receiver: UnboundedReceiver<Duration>) -> LatencySummary {
        let mut aggregate = LatencyAggregate::new();
        while let Some(elapsed) = receiver.recv().await {
            aggregate.add(&elapsed);
        }
        let summary = aggregate.aggregate();
        tracing::info!(
            %key,
            size = summary.count,
            avg = ?summary.avg,
            max = ?summary.max,
            min = ?summary.min,
            p99 = ?summary.p99,
            "latency summary"
        );
        summary
    }
}
