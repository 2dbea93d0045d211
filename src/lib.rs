//! Data driven gRPC invocation tool
//!
//! # Binary Usage
//! ## Prepare Config
//! ```sh
//! grpc-chain --init
//! ```
//! writes a sample `invoke.toml`:
//! ```toml
//! [greeter]
//! log-level = "debug"
//!
//! [greeter.target]
//! address = "localhost:50051"
//! proto-base-path = "$HOME/protos"
//! include-imports = "helloworld/helloworld.proto"
//! data = '{"user":{"name":"tgrpc"}}'
//!
//! [[greeter.invokes]]
//! method = "helloworld.Greeter/SayHello"
//! data = '{"name":"@user,name"}'
//! n = 3
//! interval = "200ms"
//! [greeter.invokes.expect]
//! cost = "300ms"
//! json = { message = "Hello tgrpc" }
//! [greeter.invokes.next]
//! method = "helloworld.Greeter/SayHello"
//! data = '{"name":"@message"}'
//! ```
//! - `data` of each invocation is a json template, `"@user,name"` is replaced by the value of the context.
//! - `n` workers are dispatched concurrently, `next` runs after all of them with the last response as its context.
//!
//! ## Run CLI
//! ```sh
//! grpc-chain -c invoke.toml --strict
//! ```
//!
//! # Library Usage
//! The gRPC stack is [`grpc::EncodeLayer`] over [`measure::TraceLayer`] over [`grpc::GrpcClient`].
//! Any `tower::Service<RpcRequest>` wrapped in [`measure::TraceLayer`] can take its place,
//! see [`invoke::Orchestrator`].

pub mod error;
pub mod grpc;
pub mod interface;
pub mod invoke;
pub mod measure;
pub mod template;
pub mod verify;

pub use error::{Error, Result};
