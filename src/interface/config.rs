use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Map;

use crate::{
    error::{ConfigError, DescriptorError},
    grpc::DescriptorSource,
    invoke::InvocationSpec,
    verify::Expectation,
};

/// Named suites, run in name order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub suites: BTreeMap<String, Suite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Suite {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    pub target: Target,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invokes: Vec<Arc<InvocationSpec>>,
}
fn enabled_default() -> bool {
    true
}

/// Where a suite connects, how its descriptors are found, and the static template contexts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Target {
    pub address: String,
    #[serde(default, with = "super::duration::option", skip_serializing_if = "Option::is_none")]
    pub keepalive: Option<Duration>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proto_base_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub include_imports: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reuse_desc: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_descs: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datas: Vec<String>,
}

impl Target {
    /// Raw descriptors win over protoc when both are configured.
    pub fn descriptor_source(&self) -> Result<DescriptorSource, DescriptorError> {
        if !self.raw_descs.is_empty() {
            Ok(DescriptorSource::Raw(self.raw_descs.clone()))
        } else if !self.include_imports.is_empty() {
            Ok(DescriptorSource::Protoc {
                base_path: self.proto_base_path.clone(),
                include: self.include_imports.clone(),
                reuse: self.reuse_desc,
            })
        } else {
            Err(DescriptorError::NoSource)
        }
    }

    /// `data` when given, otherwise every entry of `datas`.
    pub fn contexts(&self) -> Vec<Bytes> {
        if !self.data.is_empty() {
            vec![Bytes::from(self.data.clone())]
        } else {
            self.datas.iter().cloned().map(Bytes::from).collect()
        }
    }
}

impl Config {
    pub fn read<A: AsRef<Path>>(path: A) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::CannotRead(path.to_path_buf(), e))?;
        Self::read_str(&content, format)
    }

    pub fn read_str(content: &str, format: Format) -> Result<Self, ConfigError> {
        let config: Self = format.deserialize(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.suites.values().flat_map(|suite| &suite.invokes).try_for_each(|spec| spec.validate())
    }

    /// Enabled suites in name order.
    pub fn enabled(&self) -> impl Iterator<Item = (&String, &Suite)> {
        self.suites.iter().filter(|(_, suite)| suite.enabled)
    }

    /// Write [`Config::sample`] to `path` in the format of its extension.
    pub fn write_sample<A: AsRef<Path>>(path: A) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = Format::from_path(path)?.serialize(&Self::sample())?;
        std::fs::write(path, content).map_err(|e| ConfigError::CannotWrite(path.to_path_buf(), e))
    }

    pub fn sample() -> Self {
        let mut json = Map::new();
        json.insert("message".to_string(), "Hello tgrpc".into());
        let expect = Expectation {
            cost: Some(Duration::from_millis(300)),
            regexp: Some("Hello".to_string()),
            json,
            ..Default::default()
        };
        let next = InvocationSpec { data: r#"{"name":"@message"}"#.to_string(), ..InvocationSpec::new(SAMPLE_METHOD) };
        let invoke = InvocationSpec {
            headers: vec!["customerId:123".to_string(), "region:UK".to_string()],
            data: r#"{"name":"@user,name"}"#.to_string(),
            n: 3,
            interval: Some(Duration::from_millis(200)),
            expect: Some(expect),
            next: Some(Arc::new(next)),
            ..InvocationSpec::new(SAMPLE_METHOD)
        };
        let target = Target {
            address: "localhost:50051".to_string(),
            keepalive: Some(Duration::from_secs(100)),
            proto_base_path: "$HOME/protos".to_string(),
            include_imports: "helloworld/helloworld.proto".to_string(),
            reuse_desc: true,
            data: r#"{"user":{"name":"tgrpc"}}"#.to_string(),
            ..Default::default()
        };
        let suite = Suite { enabled: true, log_level: Some("debug".to_string()), target, invokes: vec![Arc::new(invoke)] };
        Self { suites: BTreeMap::from([("greeter".to_string(), suite)]) }
    }
}
const SAMPLE_METHOD: &str = "helloworld.Greeter/SayHello";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[cfg(feature = "json")]
    Json,
    #[cfg(feature = "yaml")]
    Yaml,
    #[cfg(feature = "toml")]
    Toml,
}
impl Format {
    pub fn from_path<A: AsRef<Path>>(path: A) -> Result<Self, ConfigError> {
        let extension = path.as_ref().extension().and_then(|ext| ext.to_str());
        match extension {
            #[cfg(feature = "json")]
            Some("json") => Ok(Format::Json),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Ok(Format::Yaml),
            #[cfg(feature = "toml")]
            Some("toml") => Ok(Format::Toml),
            Some(ext) => Err(ConfigError::UnknownFormatExtension(ext.to_string())),
            None => Err(ConfigError::CannotSpecifyFormat(path.as_ref().to_path_buf())),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T, ConfigError> {
        match self {
            #[cfg(feature = "json")]
            Format::Json => Ok(serde_json::from_str(content)?),
            #[cfg(feature = "yaml")]
            Format::Yaml => Ok(serde_yaml::from_str(content)?),
            #[cfg(feature = "toml")]
            Format::Toml => Ok(toml::from_str(content)?),
            #[cfg(not(any(feature = "json", feature = "yaml", feature = "toml")))]
            _ => {
                let _ = content;
                unreachable!("no format is enabled")
            }
        }
    }

    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String, ConfigError> {
        match self {
            #[cfg(feature = "json")]
            Format::Json => Ok(serde_json::to_string_pretty(value)?),
            #[cfg(feature = "yaml")]
            Format::Yaml => Ok(serde_yaml::to_string(value)?),
            #[cfg(feature = "toml")]
            Format::Toml => Ok(toml::to_string(value)?),
            #[cfg(not(any(feature = "json", feature = "yaml", feature = "toml")))]
            _ => {
                let _ = value;
                unreachable!("no format is enabled")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    #[cfg(feature = "toml")]
    fn test_read_toml_suite() {
        let content = indoc! {r#"
            [greeter]
            log-level = "info"

            [greeter.target]
            address = "localhost:50051"
            include-imports = "helloworld/helloworld.proto"
            data = '{"user":{"name":"tgrpc"}}'

            [[greeter.invokes]]
            method = "helloworld.Greeter/SayHello"
            data = '{"name":"@user,name"}'
            n = 5
            interval = "200ms"
            [greeter.invokes.expect]
            cost = "300ms"
            json = { message = "Hello tgrpc", "langs,$len" = 2 }
            [greeter.invokes.next]
            method = "helloworld.Greeter/SayHello"
            data = '{"name":"@message"}'

            [[greeter.invokes.then]]
            method = "helloworld.Greeter/SayGoodbye"
        "#};
        let config = Config::read_str(content, Format::Toml).unwrap();
        let suite = &config.suites["greeter"];
        assert!(suite.enabled);
        assert_eq!(suite.log_level.as_deref(), Some("info"));
        assert_eq!(suite.target.contexts(), vec![Bytes::from(r#"{"user":{"name":"tgrpc"}}"#)]);

        let invoke = &suite.invokes[0];
        assert_eq!(invoke.n, 5);
        assert_eq!(invoke.interval, Some(Duration::from_millis(200)));
        let expect = invoke.expect.as_ref().unwrap();
        assert_eq!(expect.cost, Some(Duration::from_millis(300)));
        assert_eq!(expect.json["message"], "Hello tgrpc");
        assert_eq!(expect.json["langs,$len"], 2);
        assert_eq!(invoke.next.as_ref().unwrap().n, 1);
        assert_eq!(invoke.then[0].method, "helloworld.Greeter/SayGoodbye");
    }

    #[test]
    #[cfg(feature = "toml")]
    fn test_reject_zero_repeat() {
        let content = indoc! {r#"
            [greeter.target]
            address = "localhost:50051"

            [[greeter.invokes]]
            method = "helloworld.Greeter/SayHello"
            n = 0
        "#};
        assert!(matches!(Config::read_str(content, Format::Toml).unwrap_err(), ConfigError::InvalidInvocation(..)));
    }

    #[test]
    #[cfg(feature = "toml")]
    fn test_reject_unknown_field() {
        let content = indoc! {r#"
            [greeter.target]
            address = "localhost:50051"
            unknown = true
        "#};
        assert!(matches!(Config::read_str(content, Format::Toml).unwrap_err(), ConfigError::TomlDe(_)));
    }

    #[test]
    #[cfg(all(feature = "toml", feature = "yaml", feature = "json"))]
    fn test_sample_is_readable() {
        for format in [Format::Toml, Format::Yaml, Format::Json] {
            let content = format.serialize(&Config::sample()).unwrap();
            assert_eq!(Config::read_str(&content, format).unwrap(), Config::sample());
        }
    }

    #[test]
    fn test_format_from_path() {
        assert!(matches!(Format::from_path("invoke.ini").unwrap_err(), ConfigError::UnknownFormatExtension(e) if e == "ini"));
        assert!(matches!(Format::from_path("invoke").unwrap_err(), ConfigError::CannotSpecifyFormat(_)));
    }

    #[test]
    fn test_descriptor_source() {
        let target = Target { address: "localhost:50051".to_string(), ..Default::default() };
        assert!(matches!(target.descriptor_source().unwrap_err(), DescriptorError::NoSource));

        let raw = Target { raw_descs: vec!["0x0a".to_string()], include_imports: "a.proto".to_string(), ..target };
        assert_eq!(raw.descriptor_source().unwrap(), DescriptorSource::Raw(vec!["0x0a".to_string()]));
    }
}
