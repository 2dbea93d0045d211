use std::{path::PathBuf, time::Duration};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[error(transparent)]
pub enum Error {
    ConfigError(#[from] ConfigError),
    DispatchError(#[from] DispatchError),
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read `{0}`: {1}")]
    CannotRead(PathBuf, #[source] std::io::Error),
    #[error("cannot write `{0}`: {1}")]
    CannotWrite(PathBuf, #[source] std::io::Error),
    #[error("`{0}` is unknown extension format")]
    UnknownFormatExtension(String),
    #[error("cannot specify format of `{0}`")]
    CannotSpecifyFormat(PathBuf),
    #[cfg(feature = "json")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "yaml")]
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[cfg(feature = "toml")]
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[cfg(feature = "toml")]
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid duration `{0}`")]
    InvalidDuration(String),
    #[error("`{0}`: {1}")]
    InvalidInvocation(String, String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("template is not json: {0}")]
    MalformedTemplate(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("`{path}`: {got} is got, {want} is wanted")]
    Mismatch { path: String, want: serde_json::Value, got: serde_json::Value },
    #[error("`{path}`: want-len {want}, got {got}")]
    LengthMismatch { path: String, want: i64, got: usize },
    #[error("`{path}`: want-len `{want}` is not int")]
    NotLength { path: String, want: serde_json::Value },
    #[error("response body is not json: {0}")]
    MalformedBody(#[source] serde_json::Error),
    #[error(transparent)]
    InvalidRegex(#[from] regex::Error),
    #[error("response body `{body}` does not match regexp `{regex}`")]
    Unmatched { regex: String, body: String },
    #[error("time cost {elapsed:?} is more than {ceiling:?}")]
    TooSlow { elapsed: Duration, ceiling: Duration },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid gRPC method: `{0}`")]
    InvalidMethod(String),
    #[error("service `{0}` is not found in descriptors")]
    NoService(String),
    #[error("method `{0}` is not found in descriptors")]
    NoMethod(String),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("request message is not json: {0}")]
    Message(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
    #[error("rpc error: {}: {}", .0.code(), .0.message())]
    Status(#[from] tonic::Status),
    #[error(transparent)]
    Blocking(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("protoc failed for `{0}`: {1}")]
    Protoc(PathBuf, #[source] std::io::Error),
    #[error("cannot access descriptor set `{0}`: {1}")]
    DescriptorSet(PathBuf, #[source] std::io::Error),
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
    #[error(transparent)]
    Pool(#[from] prost_reflect::DescriptorError),
    #[error("`{0}` is not a descriptor byte like `0x0a`")]
    RawByte(String),
    #[error("no descriptor source is configured")]
    NoSource,
}
