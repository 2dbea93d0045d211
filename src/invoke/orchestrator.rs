use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::{sync::watch, task::JoinSet};
use tower::{Service, ServiceExt};

use crate::{
    error::DispatchError,
    interface::curl::to_curl,
    measure::{LatencyAggregator, LatencySender},
    template::{decode, decode_each},
};

use super::{
    dispatch::{parse_headers, InvocationResult, RpcRequest},
    report::{InvocationReport, Tally},
    spec::InvocationSpec,
};

/// Switches carried through a run instead of process wide flags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Settings {
    /// Do not log request data.
    pub silence: bool,
    /// Echo each request as a curl command.
    pub curl: bool,
    /// Target address, only used by the curl echo.
    pub address: String,
}

/// Walks invocation trees: fan-out, join, `next`, then each `then`.
///
/// Workers of one fan-out run concurrently; everything chained after them waits for all of them.
/// A dispatch has no deadline here, so a hung call holds its fan-out's join.
#[derive(Debug, Clone)]
pub struct Orchestrator<S> {
    client: S,
    contexts: Arc<[Bytes]>,
    settings: Arc<Settings>,
}

impl<S> Orchestrator<S>
where
    S: Service<RpcRequest, Response = InvocationResult, Error = DispatchError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    /// `contexts` are the static template contexts; with none, templates are sent as written.
    pub fn new(client: S, contexts: Vec<Bytes>, settings: Settings) -> Self {
        Self { client, contexts: contexts.into(), settings: Arc::new(settings) }
    }

    /// Run specs one after another.
    pub async fn run(&self, specs: &[Arc<InvocationSpec>]) -> Vec<InvocationReport> {
        let mut reports = Vec::new();
        for spec in specs {
            let invocation = self.invokes(spec.clone(), None);
            reports.push(invocation.await);
        }
        reports
    }

    /// Run one spec tree. `forwarded` is the response handed over by the predecessor when this spec is a `next`.
    pub fn invokes(&self, spec: Arc<InvocationSpec>, forwarded: Option<Bytes>) -> BoxFuture<'static, InvocationReport> {
        let orchestrator = self.clone();
        Box::pin(orchestrator.invoke_tree(spec, forwarded))
    }

    async fn invoke_tree(self, spec: Arc<InvocationSpec>, forwarded: Option<Bytes>) -> InvocationReport {
        let bodies = Arc::new(self.bodies(&spec, forwarded.as_ref()));
        let forward = spec.next.as_ref().map(|_| Arc::new(watch::Sender::new(None::<Bytes>)));
        let aggregator = spec.is_aggregated().then(|| LatencyAggregator::spawn(spec.method.clone()));

        let mut workers = JoinSet::new();
        for index in 0..spec.n {
            if index > 0 {
                if let Some(interval) = spec.interval {
                    tokio::time::sleep(interval).await;
                }
            }
            let worker = Worker {
                index,
                client: self.client.clone(),
                settings: self.settings.clone(),
                spec: spec.clone(),
                forward: forward.clone(),
                stats: aggregator.as_ref().and_then(LatencyAggregator::sender),
            };
            workers.spawn(worker.work(bodies.clone()));
        }

        let mut tally = Tally::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker) => tally += worker,
                Err(err) => {
                    tracing::error!(method = %spec.method, %err, "worker aborted");
                    tally.failed += 1;
                }
            }
        }
        let summary = match aggregator {
            Some(aggregator) => aggregator.close().await,
            None => None,
        };
        tracing::debug!(method = %spec.method, workers = spec.n, ?tally, "fan-out joined");

        let mut chained = Vec::new();
        if let Some(next) = &spec.next {
            let latest = forward.and_then(|slot| slot.borrow().clone());
            match latest {
                Some(response) => {
                    let invocation = self.invokes(next.clone(), Some(response));
                    chained.push(invocation.await);
                }
                None => tracing::warn!(method = %next.method, "no response is forwarded, next is skipped"),
            }
        }
        for then in &spec.then {
            let invocation = self.invokes(then.clone(), None);
            chained.push(invocation.await);
        }

        InvocationReport { method: spec.method.clone(), workers: spec.n, tally, summary, chained }
    }

    /// Request bodies dispatched by each worker.
    fn bodies(&self, spec: &InvocationSpec, forwarded: Option<&Bytes>) -> Vec<String> {
        if spec.data.is_empty() {
            return vec![String::new()];
        }
        match forwarded {
            Some(response) => decode(&spec.data, response),
            None if self.contexts.is_empty() => vec![spec.data.clone()],
            None => decode_each(&spec.data, self.contexts.iter()),
        }
    }
}

struct Worker<S> {
    index: usize,
    client: S,
    settings: Arc<Settings>,
    spec: Arc<InvocationSpec>,
    /// Last writer wins.
    forward: Option<Arc<watch::Sender<Option<Bytes>>>>,
    stats: Option<LatencySender>,
}

impl<S> Worker<S>
where
    S: Service<RpcRequest, Response = InvocationResult, Error = DispatchError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    async fn work(mut self, bodies: Arc<Vec<String>>) -> Tally {
        let mut tally = Tally::default();
        for (i, body) in bodies.iter().enumerate() {
            if i > 0 {
                if let Some(interval) = self.spec.interval {
                    tokio::time::sleep(interval).await;
                }
            }
            tally += self.dispatch(body).await;
        }
        tally
    }

    async fn dispatch(&mut self, body: &str) -> Tally {
        let Self { index, client, settings, spec, forward, stats } = self;
        let method = spec.method.as_str();
        if !settings.silence {
            tracing::info!(method, data = body, "request data");
        }
        if settings.curl {
            println!("{}", to_curl(&settings.address, method, &spec.headers, body));
        }

        let request = RpcRequest::new(method, parse_headers(&spec.headers), body)
            .with_track_id(format!("{}#{}", method, index));
        let mut tally = Tally { dispatched: 1, ..Default::default() };
        match client.clone().oneshot(request).await {
            Ok(result) => {
                let elapsed = result.elapsed();
                tracing::info!(method, body = %String::from_utf8_lossy(result.body()), ?elapsed, "response");
                if let Some(expect) = &spec.expect {
                    tally.mismatches += expect.verify(result.body(), elapsed).len();
                }
                if let Some(stats) = stats {
                    stats.record(elapsed);
                }
                if let Some(forward) = forward {
                    forward.send_replace(Some(result.body().clone()));
                }
            }
            Err(err) => {
                tracing::error!(method, %err, "dispatch failed");
                tally.failed += 1;
            }
        }
        tally
    }
}
