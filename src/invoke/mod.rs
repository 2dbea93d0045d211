//! Invocation trees and their concurrent execution.
pub mod dispatch;
pub mod orchestrator;
pub mod report;
pub mod spec;

pub use dispatch::{InvocationResult, RpcRequest, RpcResponse};
pub use orchestrator::{Orchestrator, Settings};
pub use report::{InvocationReport, RunReport, SuiteReport, Tally};
pub use spec::InvocationSpec;
