use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::VerifyError, template::Path};

use super::{
    classify::{Classified, Classify, Cost},
    messages::Messages,
};

/// What a response is expected to look like.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Expectation {
    /// Latency ceiling.
    #[serde(default, with = "crate::interface::duration::option", skip_serializing_if = "Option::is_none")]
    pub cost: Option<Duration>,
    /// Accepted for compatibility, never checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
    /// Path (`a,0,b`, or `a,$len`) to expected value.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub json: Map<String, Value>,
}

impl Expectation {
    /// Check a response body and its elapsed time. Every observation is logged and returned; nothing short-circuits.
    pub fn verify(&self, body: &[u8], elapsed: Duration) -> Messages<VerifyError> {
        let mut messages = Messages::new();
        if !self.json.is_empty() {
            match serde_json::from_slice::<Value>(body) {
                Ok(got) => messages.extend(self.verify_json(&got)),
                Err(err) => messages.push(VerifyError::MalformedBody(err)),
            }
        }
        if let Some(regexp) = &self.regexp {
            messages.extend(verify_regexp(regexp, body));
        }
        for observation in &messages {
            tracing::error!(error = %observation, "verification failed");
        }

        if let Some(ceiling) = self.cost {
            if let Some(slow) = verify_cost(Cost { elapsed, ceiling }) {
                messages.push(slow);
            }
        }
        messages
    }

    pub fn verify_json(&self, got: &Value) -> Messages<VerifyError> {
        self.json.iter().filter_map(|(path, want)| verify_path(path, want, got)).collect()
    }
}

fn verify_path(raw: &str, want: &Value, got: &Value) -> Option<VerifyError> {
    let path = Path::parse(raw);
    if let Some(parent) = path.len_parent() {
        let Some(want_len) = as_length(want) else {
            return Some(VerifyError::NotLength { path: raw.to_string(), want: want.clone() });
        };
        return match parent.array_len(got) {
            Some(len) if i64::try_from(len).is_ok_and(|len| len == want_len) => None,
            Some(len) => Some(VerifyError::LengthMismatch { path: raw.to_string(), want: want_len, got: len }),
            None => Some(VerifyError::Mismatch {
                path: raw.to_string(),
                want: want.clone(),
                got: parent.get(got).cloned().unwrap_or(Value::Null),
            }),
        };
    }

    match path.get(got) {
        Some(value) if value == want => None,
        value => Some(VerifyError::Mismatch {
            path: raw.to_string(),
            want: want.clone(),
            got: value.cloned().unwrap_or(Value::Null),
        }),
    }
}

/// Expected length may be written as a number or as numeric text.
fn as_length(want: &Value) -> Option<i64> {
    match want {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn verify_regexp(regexp: &str, body: &[u8]) -> Option<VerifyError> {
    let regex = match Regex::new(regexp) {
        Ok(regex) => regex,
        Err(err) => return Some(err.into()),
    };
    let text = String::from_utf8_lossy(body);
    (!regex.is_match(&text)).then(|| VerifyError::Unmatched { regex: regexp.to_string(), body: text.into_owned() })
}

fn verify_cost(cost: Cost) -> Option<VerifyError> {
    let Cost { elapsed, ceiling } = cost;
    match cost.classified() {
        Classified::Good(_) => {
            tracing::debug!(?elapsed, ?ceiling, "time cost");
            None
        }
        Classified::Warn(_) => {
            tracing::warn!(?elapsed, ?ceiling, "time cost is close to the ceiling");
            None
        }
        Classified::Bad(_) => {
            let slow = VerifyError::TooSlow { elapsed, ceiling };
            tracing::error!(error = %slow, "verification failed");
            Some(slow)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn expect_json(json: Value) -> Expectation {
        let Value::Object(json) = json else { unreachable!() };
        Expectation { json, ..Default::default() }
    }

    #[test]
    fn test_verify_json_match() {
        let expect = expect_json(json!({"message": "Hello tgrpc"}));
        assert!(expect.verify(br#"{"message":"Hello tgrpc"}"#, Duration::ZERO).is_empty());

        let messages = expect.verify(br#"{"message":"Goodbye"}"#, Duration::ZERO);
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages.as_slice()[0], VerifyError::Mismatch { path, .. } if path == "message"));
    }

    #[test]
    fn test_verify_json_every_path() {
        let expect = expect_json(json!({
            "name": "tgrpc",
            "langs,0,name": "go",
            "langs,1,name": "rust",
            "langs,$len": 2,
            "age": 3,
        }));
        let body = br#"{"name":"tgrpc","langs":[{"name":"go"},{"name":"python"},{"name":"c"}],"age":3}"#;
        let messages = expect.verify(body, Duration::ZERO);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| matches!(m, VerifyError::Mismatch { path, .. } if path == "langs,1,name")));
        assert!(messages.iter().any(|m| matches!(m, VerifyError::LengthMismatch { want: 2, got: 3, .. })));
    }

    #[test]
    fn test_verify_len_coercion() {
        let body = br#"{"vals":[1,2,3]}"#;
        assert!(expect_json(json!({"vals,$len": 3})).verify(body, Duration::ZERO).is_empty());
        assert!(expect_json(json!({"vals,$len": "3"})).verify(body, Duration::ZERO).is_empty());
        assert!(matches!(
            expect_json(json!({"vals,$len": [3]})).verify(body, Duration::ZERO).as_slice(),
            [VerifyError::NotLength { .. }]
        ));
        assert!(matches!(
            expect_json(json!({"none,$len": 0})).verify(body, Duration::ZERO).as_slice(),
            [VerifyError::Mismatch { got: Value::Null, .. }]
        ));
    }

    #[test]
    fn test_verify_number_shape() {
        let expect = expect_json(json!({"cost": 700}));
        assert!(expect.verify(br#"{"cost":700}"#, Duration::ZERO).is_empty());
        assert_eq!(expect.verify(br#"{"cost":700.5}"#, Duration::ZERO).len(), 1);
        assert_eq!(expect.verify(br#"{"cost":"700"}"#, Duration::ZERO).len(), 1);
    }

    #[test]
    fn test_verify_malformed_body() {
        let messages = expect_json(json!({"a": 1})).verify(b"not json", Duration::ZERO);
        assert!(matches!(messages.as_slice(), [VerifyError::MalformedBody(_)]));
    }

    #[test]
    fn test_verify_regexp() {
        let expect = Expectation { regexp: Some("Hello .+".to_string()), ..Default::default() };
        assert!(expect.verify(br#"{"message":"Hello tgrpc"}"#, Duration::ZERO).is_empty());
        assert!(matches!(
            expect.verify(br#"{"message":"Goodbye"}"#, Duration::ZERO).as_slice(),
            [VerifyError::Unmatched { .. }]
        ));

        let invalid = Expectation { regexp: Some("(unclosed".to_string()), ..Default::default() };
        assert!(matches!(invalid.verify(b"", Duration::ZERO).as_slice(), [VerifyError::InvalidRegex(_)]));
    }

    #[test]
    fn test_verify_cost() {
        let expect = Expectation { cost: Some(Duration::from_millis(100)), ..Default::default() };
        assert!(expect.verify(b"{}", Duration::from_millis(10)).is_empty());
        assert!(expect.verify(b"{}", Duration::from_millis(80)).is_empty());
        assert!(matches!(
            expect.verify(b"{}", Duration::from_millis(100)).as_slice(),
            [VerifyError::TooSlow { .. }]
        ));
    }

    #[test]
    fn test_body_is_inert() {
        let expect = Expectation { body: Some("anything".to_string()), ..Default::default() };
        assert!(expect.verify(b"something else", Duration::ZERO).is_empty());
    }
}
