use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, verify::Expectation};

/// One node of an invocation tree.
///
/// `next` receives the last response of this spec as its template context,
/// `then` entries run afterwards against the static context of the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InvocationSpec {
    /// `package.Service/Method`
    pub method: String,
    /// `key:value` metadata.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    /// Json template of the request message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default = "default_n")]
    pub n: usize,
    #[serde(default, with = "crate::interface::duration::option", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Expectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Arc<InvocationSpec>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<Arc<InvocationSpec>>,
}
fn default_n() -> usize {
    1
}

impl InvocationSpec {
    pub fn new<M: Into<String>>(method: M) -> Self {
        Self {
            method: method.into(),
            headers: Vec::new(),
            data: String::new(),
            n: default_n(),
            interval: None,
            expect: None,
            next: None,
            then: Vec::new(),
        }
    }

    /// Check the whole tree before anything is dispatched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.method.trim().is_empty() {
            return Err(ConfigError::InvalidInvocation(self.method.clone(), "method must not be empty".to_string()));
        }
        if self.n == 0 {
            return Err(ConfigError::InvalidInvocation(self.method.clone(), "n must be at least 1".to_string()));
        }
        self.next.iter().chain(&self.then).try_for_each(|chained| chained.validate())
    }

    /// Whether latency samples of this fan-out are summarized.
    pub fn is_aggregated(&self) -> bool {
        self.n > 1 && self.expect.is_some()
    }

    /// Number of specs in this tree, this one included.
    pub fn count(&self) -> usize {
        1 + self.next.iter().chain(&self.then).map(|chained| chained.count()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tree() {
        let mut spec = InvocationSpec::new("helloworld.Greeter/SayHello");
        spec.next = Some(Arc::new(InvocationSpec::new("helloworld.Greeter/SayHello")));
        assert!(spec.validate().is_ok());
        assert_eq!(spec.count(), 2);

        spec.then.push(Arc::new(InvocationSpec { n: 0, ..InvocationSpec::new("helloworld.Greeter/SayGoodbye") }));
        assert!(matches!(
            spec.validate().unwrap_err(),
            ConfigError::InvalidInvocation(method, _) if method == "helloworld.Greeter/SayGoodbye"
        ));
    }

    #[test]
    fn test_validate_empty_method() {
        assert!(matches!(InvocationSpec::new(" ").validate().unwrap_err(), ConfigError::InvalidInvocation(..)));
    }

    #[test]
    fn test_is_aggregated() {
        let spec = InvocationSpec { n: 3, ..InvocationSpec::new("a.B/C") };
        assert!(!spec.is_aggregated());
        let spec = InvocationSpec { expect: Some(Expectation::default()), ..spec };
        assert!(spec.is_aggregated());
        assert!(!InvocationSpec { n: 1, ..spec }.is_aggregated());
    }
}
