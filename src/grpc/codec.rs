use bytes::Buf;
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, MethodDescriptor};
use serde_json::Value;
use tonic::{
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
    Status,
};

/// Encode json requests and decode json responses of one method through its reflected descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCodec {
    method: MethodDescriptor,
}
impl MethodCodec {
    pub fn new(method: MethodDescriptor) -> Self {
        Self { method }
    }
}

impl Codec for MethodCodec {
    type Encode = Value;
    type Decode = Value;
    type Encoder = JsonEncoder;
    type Decoder = JsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        JsonEncoder(self.method.input())
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(self.method.output())
    }
}

#[derive(Debug)]
pub struct JsonEncoder(MessageDescriptor);
impl Encoder for JsonEncoder {
    type Item = Value;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        let Self(descriptor) = self;
        from_json(descriptor, item)?.encode(dst).map_err(|e| Status::internal(e.to_string()))
    }
}

#[derive(Debug)]
pub struct JsonDecoder(MessageDescriptor);
impl Decoder for JsonDecoder {
    type Item = Value;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let Self(descriptor) = self;
        let message = decode_message(descriptor, src)?;
        Ok(Some(to_json(&message)?))
    }
}

pub fn from_json(descriptor: &MessageDescriptor, json: Value) -> Result<DynamicMessage, Status> {
    DynamicMessage::deserialize(descriptor.clone(), json).map_err(|e| Status::invalid_argument(e.to_string()))
}

pub fn to_json(message: &DynamicMessage) -> Result<Value, Status> {
    serde_json::to_value(message).map_err(|e| Status::internal(e.to_string()))
}

fn decode_message<B: Buf>(descriptor: &MessageDescriptor, src: B) -> Result<DynamicMessage, Status> {
    DynamicMessage::decode(descriptor.clone(), src).map_err(|e| Status::internal(e.to_string()))
}
