use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use http::uri::PathAndQuery;
use prost_reflect::MethodDescriptor;
use tonic::{
    client::Grpc,
    transport::{Channel, Endpoint},
};
use tower::Service;

use crate::{error::DispatchError, invoke::dispatch::RpcResponse};

use super::encode::GrpcCall;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends encoded unary calls over one connected channel.
#[derive(Debug, Clone)]
pub struct GrpcClient {
    channel: Channel,
}

impl GrpcClient {
    /// Connect before anything is dispatched, failing after [`CONNECT_TIMEOUT`].
    pub async fn connect(address: &str, keepalive: Option<Duration>) -> Result<Self, DispatchError> {
        let uri = if address.contains("://") { address.to_string() } else { format!("http://{}", address) };
        let mut endpoint = Endpoint::from_shared(uri)?.connect_timeout(CONNECT_TIMEOUT);
        if let Some(keepalive) = keepalive {
            endpoint = endpoint.http2_keep_alive_interval(keepalive).keep_alive_timeout(keepalive);
        }
        tracing::debug!(address, "connecting");
        let channel = endpoint.connect().await?;
        Ok(Self::new(channel))
    }

    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    async fn unary(channel: Channel, call: GrpcCall) -> Result<RpcResponse, DispatchError> {
        let GrpcCall { path, codec, request, .. } = call;
        let response = Grpc::new(channel).unary(request, path, codec).await?;
        let (metadata, message, _) = response.into_parts();
        Ok(RpcResponse::new(metadata, serde_json::to_vec(&message)?))
    }
}

impl Service<GrpcCall> for GrpcClient {
    type Response = RpcResponse;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Service::<http::Request<tonic::body::Body>>::poll_ready(&mut self.channel, cx).map_err(Into::into)
    }

    fn call(&mut self, call: GrpcCall) -> Self::Future {
        let clone = self.channel.clone();
        let channel = std::mem::replace(&mut self.channel, clone);
        Box::pin(Self::unary(channel, call))
    }
}

/// `/package.Service/Method`
pub fn method_path(method: &MethodDescriptor) -> Option<PathAndQuery> {
    format!("/{}/{}", method.parent_service().full_name(), method.name()).parse().ok()
}

#[cfg(test)]
mod tests {
    use crate::grpc::descriptor::tests::greeter_pool;

    use super::*;

    #[test]
    fn test_method_path() {
        let pool = greeter_pool();
        let method = pool.get_service_by_name("helloworld.Greeter").unwrap().methods().next().unwrap();
        assert_eq!(method_path(&method).unwrap().as_str(), "/helloworld.Greeter/SayHello");
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let connected = GrpcClient::connect("127.0.0.1:1", None).await;
        assert!(matches!(connected.unwrap_err(), DispatchError::Transport(_)));
    }
}
