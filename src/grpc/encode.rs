use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use http::uri::PathAndQuery;
use serde_json::{Map, Value};
use tonic::{metadata::MetadataMap, Extensions, Request};
use tower::{Layer, Service};

use crate::{error::DispatchError, invoke::dispatch::RpcRequest, measure::trace::Traced};

use super::{
    client::method_path,
    codec::MethodCodec,
    descriptor::{DescriptorSource, Descriptors},
};

/// A unary call whose descriptor is resolved and whose message is parsed, ready for the wire.
#[derive(Debug)]
pub struct GrpcCall {
    pub method: String,
    pub track_id: String,
    pub path: PathAndQuery,
    pub codec: MethodCodec,
    pub request: Request<Value>,
}
impl Traced for GrpcCall {
    fn method(&self) -> &str {
        &self.method
    }
    fn track_id(&self) -> &str {
        &self.track_id
    }
    fn metadata_mut(&mut self) -> &mut MetadataMap {
        self.request.metadata_mut()
    }
}

/// Turn [`RpcRequest`]s into [`GrpcCall`]s before the inner service sees them.
#[derive(Debug, Clone)]
pub struct EncodeLayer {
    descriptors: Descriptors,
}
impl EncodeLayer {
    pub fn new(source: DescriptorSource) -> Self {
        Self { descriptors: Descriptors::new(source) }
    }
}

impl<S> Layer<S> for EncodeLayer {
    type Service = EncodeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EncodeService { descriptors: self.descriptors.clone(), inner }
    }
}

#[derive(Debug, Clone)]
pub struct EncodeService<S> {
    descriptors: Descriptors,
    inner: S,
}

impl<S> Service<RpcRequest> for EncodeService<S>
where
    S: Service<GrpcCall, Error = DispatchError> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RpcRequest) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let descriptors = self.descriptors.clone();
        Box::pin(async move {
            let call = encode(&descriptors, req).await?;
            inner.call(call).await
        })
    }
}

/// Resolve the descriptor and parse the body. An empty body is the default message `{}`.
pub async fn encode(descriptors: &Descriptors, req: RpcRequest) -> Result<GrpcCall, DispatchError> {
    let RpcRequest { method, metadata, body, track_id } = req;
    let descriptor = descriptors.method(&method).await?;
    let path = method_path(&descriptor).ok_or_else(|| DispatchError::InvalidMethod(method.clone()))?;
    let message = if body.trim().is_empty() { Value::Object(Map::new()) } else { serde_json::from_str(&body)? };
    let request = Request::from_parts(metadata, Extensions::default(), message);
    Ok(GrpcCall { method, track_id, path, codec: MethodCodec::new(descriptor), request })
}
