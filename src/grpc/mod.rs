//! Rpc engine over tonic channels with messages built from reflected descriptors.
pub mod client;
pub mod codec;
pub mod descriptor;
pub mod encode;

pub use client::GrpcClient;
pub use codec::MethodCodec;
pub use descriptor::{DescriptorSource, Descriptors};
pub use encode::{EncodeLayer, EncodeService, GrpcCall};
