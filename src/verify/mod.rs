//! Response verification: json paths, regular expression and latency ceiling.
pub mod classify;
pub mod expect;
pub mod messages;

pub use classify::{Classified, Classify, Cost};
pub use expect::Expectation;
pub use messages::Messages;
