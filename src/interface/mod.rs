pub mod command;
pub mod config;
pub mod curl;
pub mod duration;
pub mod report;
