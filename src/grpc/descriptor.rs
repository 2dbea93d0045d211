use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use prost::Message;
use prost_reflect::{DescriptorPool, MethodDescriptor};
use prost_types::FileDescriptorProto;
use tokio::sync::Mutex;

use crate::error::{DescriptorError, DispatchError};

/// Where method descriptors come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DescriptorSource {
    /// Compile protos with protoc.
    Protoc {
        /// Proto root. A leading `$VAR` is read from the environment, relative paths are resolved from the cwd.
        base_path: String,
        /// Proto file of the service, relative to `base_path`.
        include: String,
        /// Reuse the descriptor set written by an earlier run as `.<service>.pbin`.
        reuse: bool,
    },
    /// Serialized `FileDescriptorProto`s written as `0x0a,0x1b,...`, dependencies first.
    Raw(Vec<String>),
}

impl DescriptorSource {
    pub fn pool(&self, service: &str) -> Result<DescriptorPool, DescriptorError> {
        match self {
            Self::Protoc { base_path, include, reuse } => protoc_pool(base_path, include, service, *reuse),
            Self::Raw(raws) => raw_pool(raws),
        }
    }

    /// Resolve `package.Service/Method`.
    pub fn method(&self, method: &str) -> Result<MethodDescriptor, DispatchError> {
        let (service, name) = split_method(method)?;
        let pool = self.pool(service)?;
        let service_descriptor =
            pool.get_service_by_name(service).ok_or_else(|| DispatchError::NoService(service.to_string()))?;
        let found = service_descriptor.methods().find(|m| m.name() == name);
        found.ok_or_else(|| DispatchError::NoMethod(name.to_string()))
    }
}

/// Method descriptors resolved once per method, shared by every clone.
#[derive(Debug, Clone)]
pub struct Descriptors {
    source: Arc<DescriptorSource>,
    cache: Arc<Mutex<HashMap<String, MethodDescriptor>>>,
}
impl Descriptors {
    pub fn new(source: DescriptorSource) -> Self {
        Self { source: Arc::new(source), cache: Default::default() }
    }

    /// Loading runs on a blocking thread. Concurrent callers wait for the first load instead of compiling again.
    pub async fn method(&self, method: &str) -> Result<MethodDescriptor, DispatchError> {
        let mut cache = self.cache.lock().await;
        if let Some(descriptor) = cache.get(method) {
            return Ok(descriptor.clone());
        }
        let (source, name) = (self.source.clone(), method.to_string());
        let descriptor = tokio::task::spawn_blocking(move || source.method(&name)).await??;
        tracing::debug!(method, "descriptor is loaded");
        cache.insert(method.to_string(), descriptor.clone());
        Ok(descriptor)
    }
}

/// The last two `/` separated parts: `package.Service` and `Method`.
pub fn split_method(method: &str) -> Result<(&str, &str), DispatchError> {
    let mut parts = method.rsplit('/');
    match (parts.next(), parts.next()) {
        (Some(name), Some(service)) if !name.is_empty() && !service.is_empty() => Ok((service, name)),
        _ => Err(DispatchError::InvalidMethod(method.to_string())),
    }
}

pub fn expand_base_path(base_path: &str) -> Result<PathBuf, DescriptorError> {
    if base_path.starts_with('/') {
        return Ok(PathBuf::from(base_path));
    }
    if let Some(variable) = base_path.strip_prefix('$') {
        let (name, rest) = variable.split_once('/').unwrap_or((variable, ""));
        let prefix = std::env::var(name).unwrap_or_else(|_| {
            tracing::warn!(variable = name, "environment variable is not set");
            String::new()
        });
        return Ok(Path::new(&prefix).join(rest));
    }
    let cwd = std::env::current_dir().map_err(|e| DescriptorError::DescriptorSet(PathBuf::from("."), e))?;
    Ok(cwd.join(base_path))
}

/// Path of the include file as seen from the proto root, at most `dir/file.proto`.
fn service_proto(include: &str) -> &str {
    match include.rmatch_indices('/').nth(1) {
        Some((at, _)) => &include[at + 1..],
        None => include,
    }
}

fn descriptor_set_path(service: &str) -> PathBuf {
    PathBuf::from(format!(".{}.pbin", service))
}

fn protoc_pool(base_path: &str, include: &str, service: &str, reuse: bool) -> Result<DescriptorPool, DescriptorError> {
    let cache = descriptor_set_path(service);
    if reuse {
        match std::fs::read(&cache) {
            Ok(bytes) => {
                tracing::debug!(path = %cache.display(), "reuse descriptor set");
                return Ok(DescriptorPool::decode(bytes.as_slice())?);
            }
            Err(err) => tracing::debug!(path = %cache.display(), %err, "descriptor set is not reusable"),
        }
    }

    let root = expand_base_path(base_path)?;
    let proto = service_proto(include);
    let fds = prost_build::Config::new()
        .load_fds(&[proto], &[&root])
        .map_err(|e| DescriptorError::Protoc(root.join(proto), e))?;
    std::fs::write(&cache, fds.encode_to_vec()).map_err(|e| DescriptorError::DescriptorSet(cache.clone(), e))?;
    Ok(DescriptorPool::from_file_descriptor_set(fds)?)
}

fn raw_pool<S: AsRef<str>>(raws: &[S]) -> Result<DescriptorPool, DescriptorError> {
    let mut pool = DescriptorPool::new();
    for raw in raws {
        let bytes = parse_raw_bytes(raw.as_ref())?;
        pool.add_file_descriptor_proto(FileDescriptorProto::decode(bytes.as_slice())?)?;
    }
    Ok(pool)
}

/// Parse `0x0a,0x1b,...`. Empty items are skipped.
pub fn parse_raw_bytes(raw: &str) -> Result<Vec<u8>, DescriptorError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let hex = item.strip_prefix("0x").or_else(|| item.strip_prefix("0X")).unwrap_or(item);
            u8::from_str_radix(hex, 16).map_err(|_| DescriptorError::RawByte(item.to_string()))
        })
        .collect()
}
