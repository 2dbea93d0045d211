use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use tonic::metadata::MetadataMap;
use tower::{Layer, Service};

use crate::{
    error::DispatchError,
    invoke::dispatch::{InvocationResult, RpcResponse},
};

pub const TRACE_KEY: &str = "x-invoke-trace";

/// A request that is ready to be sent: only the wire exchange is left.
pub trait Traced {
    fn method(&self) -> &str;
    fn track_id(&self) -> &str;
    fn metadata_mut(&mut self) -> &mut MetadataMap;
}

/// Inject trace metadata when headers are sent and measure the time until the response arrives.
///
/// Wrap the innermost sending service, so that preparing a request is not measured as latency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService { inner }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct TraceService<S> {
    inner: S,
}

impl<S, R> Service<R> for TraceService<S>
where
    R: Traced,
    S: Service<R, Response = RpcResponse, Error = DispatchError>,
    S::Future: Send + 'static,
{
    type Response = InvocationResult;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: R) -> Self::Future {
        let track_id = req.track_id().to_string();
        on_send_headers(req.metadata_mut(), SystemTime::now(), &track_id);
        tracing::debug!(method = req.method(), track_id = track_id.as_str(), "send headers");

        let start = Instant::now();
        let fut = self.inner.call(req);
        Box::pin(async move {
            let response = fut.await?;
            let elapsed = start.elapsed();
            tracing::debug!(metadata = ?response.metadata, ?elapsed, "receive response");
            Ok(InvocationResult::new(response, elapsed))
        })
    }
}

fn on_send_headers(metadata: &mut MetadataMap, timestamp: SystemTime, track_id: &str) {
    let start_time = timestamp.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    for value in [format!("start_time={start_time}"), format!("track_id={track_id}")] {
        match value.parse() {
            Ok(value) => {
                metadata.append(TRACE_KEY, value);
            }
            Err(_) => tracing::debug!(%value, "cannot be trace metadata"),
        }
    }
}
