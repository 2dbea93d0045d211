use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

pub trait Aggregator {
    type Add;
    type Aggregate;
    fn add(&mut self, add: &Self::Add);
    fn aggregate(&self) -> Self::Aggregate;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub sum: Duration,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

#[derive(Debug, Clone)]
pub struct LatencyAggregate {
    count: u64,
    sum: u128,
    min: u64,
    max: u64,
    hist: Histogram<u64>,
}
impl Default for LatencyAggregate {
    fn default() -> Self {
        Self::new()
    }
}
impl Aggregator for LatencyAggregate {
    type Add = Duration;
    type Aggregate = LatencySummary;
    fn add(&mut self, latency: &Self::Add) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.count += 1;
        self.sum += nanos as u128;
        self.min = self.min.min(nanos);
        self.max = self.max.max(nanos);
        if let Err(err) = self.hist.record(nanos) {
            tracing::warn!(?err, ?latency, "latency is not recorded in histogram");
        }
    }
    fn aggregate(&self) -> Self::Aggregate {
        if self.count == 0 {
            return LatencySummary::default();
        }
        LatencySummary {
            count: self.count,
            sum: Self::nanos(self.sum),
            min: Duration::from_nanos(self.min),
            max: Duration::from_nanos(self.max),
            avg: self.avg(),
            p50: self.value_at_quantile(0.5),
            p90: self.value_at_quantile(0.9),
            p99: self.value_at_quantile(0.99),
        }
    }
}
impl LatencyAggregate {
    pub fn new() -> Self {
        let hist = Histogram::new(3).unwrap_or_else(|e| unreachable!("{}", e));
        Self { count: 0, sum: 0, min: u64::MAX, max: 0, hist }
    }

    /// Never divides by zero, no samples count as one.
    pub fn avg(&self) -> Duration {
        Self::nanos(self.sum / self.count.max(1) as u128)
    }
    pub fn value_at_quantile(&self, quantile: f64) -> Duration {
        Duration::from_nanos(self.hist.value_at_quantile(quantile))
    }

    fn nanos(n: u128) -> Duration {
        Duration::from_nanos(u64::try_from(n).unwrap_or(u64::MAX))
    }
}
