use std::{collections::BTreeMap, time::Duration};

use bytes::Bytes;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};

use crate::measure::trace::Traced;

/// One call handed to the rpc engine.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub method: String,
    pub metadata: MetadataMap,
    /// Json text of the request message, empty for the default message.
    pub body: String,
    pub track_id: String,
}
impl RpcRequest {
    pub fn new<M: Into<String>, B: Into<String>>(method: M, metadata: MetadataMap, body: B) -> Self {
        let method = method.into();
        let track_id = method.clone();
        Self { method, metadata, body: body.into(), track_id }
    }

    pub fn with_track_id<T: Into<String>>(self, track_id: T) -> Self {
        Self { track_id: track_id.into(), ..self }
    }
}
impl Traced for RpcRequest {
    fn method(&self) -> &str {
        &self.method
    }
    fn track_id(&self) -> &str {
        &self.track_id
    }
    fn metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.metadata
    }
}

/// What the rpc engine got back: response metadata and the message as json bytes.
#[derive(Debug, Clone, Default)]
pub struct RpcResponse {
    pub metadata: MetadataMap,
    pub body: Bytes,
}
impl RpcResponse {
    pub fn new<B: Into<Bytes>>(metadata: MetadataMap, body: B) -> Self {
        Self { metadata, body: body.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    metadata: BTreeMap<String, Vec<String>>,
    body: Bytes,
    elapsed: Duration,
}
impl InvocationResult {
    pub fn new(response: RpcResponse, elapsed: Duration) -> Self {
        let RpcResponse { metadata, body } = response;
        Self { metadata: metadata_lists(&metadata), body, elapsed }
    }

    pub fn metadata(&self) -> &BTreeMap<String, Vec<String>> {
        &self.metadata
    }
    pub fn body(&self) -> &Bytes {
        &self.body
    }
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Build metadata from `key:value` header strings. Invalid headers are logged and skipped.
pub fn parse_headers<S: AsRef<str>>(headers: &[S]) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for header in headers {
        let header = header.as_ref();
        let Some((key, value)) = header.split_once(':') else {
            tracing::warn!(header, "header should be `key:value`");
            continue;
        };
        match (MetadataKey::<Ascii>::from_bytes(key.trim().as_bytes()), value.trim().parse::<MetadataValue<Ascii>>()) {
            (Ok(key), Ok(value)) => {
                metadata.append(key, value);
            }
            _ => tracing::warn!(header, "header is not valid metadata"),
        }
    }
    metadata
}

pub fn metadata_lists(metadata: &MetadataMap) -> BTreeMap<String, Vec<String>> {
    let mut lists = BTreeMap::<String, Vec<String>>::new();
    for (name, value) in metadata.clone().into_headers().iter() {
        lists.entry(name.to_string()).or_default().push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let metadata = parse_headers(&["customerId:123", "region: UK", "region:JP", "broken", "sp ace:1"]);
        let lists = metadata_lists(&metadata);
        assert_eq!(lists["customerid"], vec!["123"]);
        assert_eq!(lists["region"], vec!["UK", "JP"]);
        assert_eq!(lists.len(), 2);
    }
}
