use serde_json::{Number, Value};

use crate::error::DecodeError;

use super::path::{Path, Reference};

/// Resolve every `@path` reference of `template` against `context`.
///
/// Malformed template falls back to the template itself as the only output.
pub fn decode(template: &str, context: &[u8]) -> Vec<String> {
    match Decoded::new(template, context) {
        Ok(decoded) => decoded.collect(),
        Err(err) => {
            tracing::error!(template, %err, "cannot decode template");
            vec![template.to_string()]
        }
    }
}

/// [`decode`] against each context in order, concatenating the outputs.
pub fn decode_each<I, C>(template: &str, contexts: I) -> Vec<String>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    contexts.into_iter().flat_map(|context| decode(template, context.as_ref())).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

#[derive(Debug, Default)]
struct Walk {
    substituted: usize,
    range: Option<(Vec<Step>, Reference)>,
}

#[derive(Debug)]
struct Expansion {
    site: Vec<Step>,
    reference: Reference,
    tail: Path,
    elements: std::vec::IntoIter<Value>,
}

/// Lazily produced outputs of one template. More than one output only when a `$range` reference expands.
#[derive(Debug)]
pub struct Decoded {
    template: String,
    document: Value,
    substituted: usize,
    expansion: Option<Expansion>,
    done: bool,
}

impl Decoded {
    pub fn new(template: &str, context: &[u8]) -> Result<Self, DecodeError> {
        if template.is_empty() {
            return Ok(Self {
                template: String::new(),
                document: Value::Null,
                substituted: 0,
                expansion: None,
                done: true,
            });
        }
        let mut document: Value = serde_json::from_str(template).map_err(DecodeError::MalformedTemplate)?;
        let context: Value = serde_json::from_slice(context).unwrap_or_else(|err| {
            tracing::debug!(%err, "context is not json, no reference will be resolved");
            Value::Null
        });

        let mut walk = Walk::default();
        Self::walk(&mut document, &context, &mut Vec::new(), &mut walk);

        let expansion = walk.range.and_then(|(site, reference)| {
            let (head, tail) = reference.path().split_range()?;
            match head.get(&context) {
                Some(Value::Array(elements)) => Some(Expansion { site, reference, tail, elements: elements.clone().into_iter() }),
                _ => {
                    tracing::debug!(reference = reference.raw(), "range is not resolved to array");
                    None
                }
            }
        });

        Ok(Self { template: template.to_string(), document, substituted: walk.substituted, expansion, done: false })
    }

    fn walk(value: &mut Value, context: &Value, site: &mut Vec<Step>, walk: &mut Walk) {
        match value {
            Value::String(leaf) => {
                let Some(reference) = Reference::scan(leaf) else {
                    return;
                };
                if reference.path().is_range() {
                    if walk.range.is_none() {
                        walk.range = Some((site.clone(), reference));
                    } else {
                        tracing::debug!(reference = reference.raw(), "only the first range is expanded");
                    }
                } else if let Some(resolved) = render(&reference, reference.path().lookup(context)) {
                    *value = resolved;
                    walk.substituted += 1;
                } else {
                    tracing::debug!(reference = reference.raw(), "reference is not resolved");
                }
            }
            Value::Array(array) => {
                for (i, v) in array.iter_mut().enumerate() {
                    site.push(Step::Index(i));
                    Self::walk(v, context, site, walk);
                    site.pop();
                }
            }
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    site.push(Step::Key(k.clone()));
                    Self::walk(v, context, site, walk);
                    site.pop();
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    fn locate<'a>(document: &'a mut Value, site: &[Step]) -> Option<&'a mut Value> {
        site.iter().try_fold(document, |value, step| match step {
            Step::Key(key) => value.get_mut(key.as_str()),
            Step::Index(index) => value.get_mut(*index),
        })
    }
}

impl Iterator for Decoded {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(Expansion { site, reference, tail, elements }) = &mut self.expansion else {
            self.done = true;
            return Some(if self.substituted == 0 { self.template.clone() } else { self.document.to_string() });
        };
        let Some(element) = elements.next() else {
            self.done = true;
            return None;
        };
        let mut document = self.document.clone();
        match (Self::locate(&mut document, site), render(reference, tail.lookup(&element))) {
            (Some(leaf), Some(resolved)) => *leaf = resolved,
            _ => tracing::debug!(reference = reference.raw(), "range element is not resolved"),
        }
        Some(document.to_string())
    }
}

/// Whole-leaf references keep the json type of the resolved value, references followed by literal text
/// become strings. Floating point numbers are truncated toward zero in both cases.
/// A `null` value counts as unresolved.
fn render(reference: &Reference, resolved: Option<Value>) -> Option<Value> {
    let resolved = resolved.filter(|v| !v.is_null())?;
    if reference.suffix().is_empty() {
        return Some(match resolved {
            Value::Number(n) => Value::Number(truncate(n)),
            other => other,
        });
    }
    let text = match resolved {
        Value::Number(n) => truncate(n).to_string(),
        Value::String(s) => s,
        _ => return None,
    };
    Some(Value::String(text + reference.suffix()))
}

fn truncate(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() => Number::from(f.trunc() as i64),
        _ => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty() {
        assert!(decode("", b"").is_empty());
        assert!(decode("", br#"{"msg":"success!"}"#).is_empty());
    }

    #[test]
    fn test_decode_scalar() {
        let context = br#"{"msg":"success!"}"#;
        for (template, want) in [
            (r#"{"name":"@msg"}"#, r#"{"name":"success!"}"#),
            (r#"{"name":"@msg!@msg"}"#, r#"{"name":"success!!@msg"}"#),
            (r#"{"name":"@msg!"}"#, r#"{"name":"success!!"}"#),
            (r#"{"name":"!@msg!"}"#, r#"{"name":"!@msg!"}"#),
            (r#"{"name":"@nope"}"#, r#"{"name":"@nope"}"#),
        ] {
            assert_eq!(decode(template, context), vec![want.to_string()], "{}", template);
        }
    }

    #[test]
    fn test_decode_nested_path() {
        assert_eq!(
            decode(r#"{"names":["@langs,0,name"]}"#, br#"{"langs":[{"name":"Golang"}]}"#),
            vec![r#"{"names":["Golang"]}"#.to_string()],
        );
        assert_eq!(
            decode(r#"{"vals":["@vals,0,i1"]}"#, br#"{"vals":[{"i1":100}]}"#),
            vec![r#"{"vals":[100]}"#.to_string()],
        );
    }

    #[test]
    fn test_decode_float_truncated() {
        let context = br#"{"Golang":"go1.0","versions":[{"name":"v1.0"},{"desp":"desp v1.0"},{"version":1.0},{"version":2.7}]}"#;
        let template = r#"{"names":["@Golang!","@Golang!"],"version":[["@versions,0,name","@versions,1,desp","@versions,2,version","@versions,3,version"]]}"#;
        assert_eq!(
            decode(template, context),
            vec![r#"{"names":["go1.0!","go1.0!"],"version":[["v1.0","desp v1.0",1,2]]}"#.to_string()],
        );
        assert_eq!(decode(r#"{"v":"@f ms"}"#, br#"{"f":-3.9}"#), vec![r#"{"v":"-3 ms"}"#.to_string()]);
    }

    #[test]
    fn test_decode_null_and_bool() {
        assert_eq!(decode(r#"{"name":"@msg"}"#, br#"{"msg":null}"#), vec![r#"{"name":"@msg"}"#.to_string()]);
        assert_eq!(decode(r#"{"name":"@msg!"}"#, br#"{"msg":null}"#), vec![r#"{"name":"@msg!"}"#.to_string()]);
        assert_eq!(decode(r#"{"ok":"@ok"}"#, br#"{"ok":true}"#), vec![r#"{"ok":true}"#.to_string()]);
        assert_eq!(decode(r#"{"ok":"@ok!"}"#, br#"{"ok":true}"#), vec![r#"{"ok":"@ok!"}"#.to_string()]);
    }

    #[test]
    fn test_decode_len() {
        assert_eq!(decode(r#"{"n":"@vals,$len"}"#, br#"{"vals":[1,2,3]}"#), vec![r#"{"n":3}"#.to_string()]);
        assert_eq!(decode(r#"{"n":"@vals,$len"}"#, br#"{"vals":"abc"}"#), vec![r#"{"n":"@vals,$len"}"#.to_string()]);
    }

    #[test]
    fn test_decode_range() {
        assert_eq!(
            decode(r#"{"vals":["@vals,$range"]}"#, br#"{"vals":[{"i1":100},{"i2":101}]}"#),
            vec![r#"{"vals":[{"i1":100}]}"#.to_string(), r#"{"vals":[{"i2":101}]}"#.to_string()],
        );
        assert_eq!(
            decode(r#"{"name":"@$range"}"#, br#"["1","2","3"]"#),
            vec![r#"{"name":"1"}"#.to_string(), r#"{"name":"2"}"#.to_string(), r#"{"name":"3"}"#.to_string()],
        );
        assert_eq!(
            decode(r#"{"name":"@langs,$range,name","id":"@id"}"#, br#"{"id":7,"langs":[{"name":"Go"},{"name":"Rust"}]}"#),
            vec![r#"{"name":"Go","id":7}"#.to_string(), r#"{"name":"Rust","id":7}"#.to_string()],
        );
    }

    #[test]
    fn test_decode_only_first_range_expands() {
        assert_eq!(
            decode(r#"{"val":"@vals,$range","val2":"@vals,$range"}"#, br#"{"vals":[1,2,3]}"#),
            vec![
                r#"{"val":1,"val2":"@vals,$range"}"#.to_string(),
                r#"{"val":2,"val2":"@vals,$range"}"#.to_string(),
                r#"{"val":3,"val2":"@vals,$range"}"#.to_string(),
            ],
        );
    }

    #[test]
    fn test_decode_range_edge() {
        assert!(decode(r#"{"val":"@vals,$range"}"#, br#"{"vals":[]}"#).is_empty());
        assert_eq!(
            decode(r#"{"val":"@vals,$range"}"#, br#"{"vals":{"a":1}}"#),
            vec![r#"{"val":"@vals,$range"}"#.to_string()],
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(decode(r#"{"name":"@msg""#, br#"{"msg":"x"}"#), vec![r#"{"name":"@msg""#.to_string()]);
        assert_eq!(decode(r#"{"name":"@msg"}"#, b"not json"), vec![r#"{"name":"@msg"}"#.to_string()]);
    }

    #[test]
    fn test_decode_each() {
        let contexts = [br#"{"msg":"a"}"#.to_vec(), br#"{"msg":"b"}"#.to_vec()];
        assert_eq!(
            decode_each(r#"{"name":"@msg"}"#, &contexts),
            vec![r#"{"name":"a"}"#.to_string(), r#"{"name":"b"}"#.to_string()],
        );
    }

    #[test]
    fn test_decoded_is_not_restartable() {
        let mut decoded = Decoded::new(r#"{"val":"@vals,$range"}"#, br#"{"vals":[1]}"#).unwrap();
        assert_eq!(decoded.next().as_deref(), Some(r#"{"val":1}"#));
        assert_eq!(decoded.next(), None);
        assert_eq!(decoded.next(), None);
    }
}
