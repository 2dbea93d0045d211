use std::fmt::Display;

use serde_json::Value;

pub const AT: char = '@';
pub const SEPARATOR: char = ',';
pub const QUOTE: char = '"';
pub const RANGE: &str = "$range";
pub const LEN: &str = "$len";

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Object key, or array index when it parses as one.
    Segment(String),
    /// Double-quoted segment, object key only.
    Quoted(String),
    Range,
    Len,
}
impl Token {
    pub fn parse(raw: &str) -> Self {
        match raw {
            RANGE => Self::Range,
            LEN => Self::Len,
            quoted if quoted.len() >= 2 && quoted.starts_with(QUOTE) && quoted.ends_with(QUOTE) => {
                Self::Quoted(quoted[1..quoted.len() - 1].to_string())
            }
            segment => Self::Segment(segment.to_string()),
        }
    }

    pub fn step<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match (self, value) {
            (Self::Segment(key) | Self::Quoted(key), Value::Object(map)) => map.get(key),
            (Self::Segment(index), Value::Array(array)) => array.get(index.parse::<usize>().ok()?),
            _ => None,
        }
    }
}
impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segment(s) => write!(f, "{}", s),
            Self::Quoted(s) => write!(f, "{}{}{}", QUOTE, s, QUOTE),
            Self::Range => write!(f, "{}", RANGE),
            Self::Len => write!(f, "{}", LEN),
        }
    }
}

/// Comma separated location inside a json document, such as `langs,0,name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    tokens: Vec<Token>,
}
impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<_> = self.tokens.iter().map(ToString::to_string).collect();
        write!(f, "{}", joined.join(&SEPARATOR.to_string()))
    }
}
impl FromIterator<Token> for Path {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self { tokens: iter.into_iter().collect() }
    }
}

impl Path {
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        raw.split(SEPARATOR).map(Token::parse).collect()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Split around the first `$range` token.
    pub fn split_range(&self) -> Option<(Path, Path)> {
        let at = self.tokens.iter().position(|t| t == &Token::Range)?;
        Some((self.tokens[..at].iter().cloned().collect(), self.tokens[at + 1..].iter().cloned().collect()))
    }

    pub fn is_range(&self) -> bool {
        self.tokens.contains(&Token::Range)
    }

    /// Parent path when the last token is `$len`.
    pub fn len_parent(&self) -> Option<Path> {
        match self.tokens.split_last() {
            Some((Token::Len, parent)) => Some(parent.iter().cloned().collect()),
            _ => None,
        }
    }

    /// Descend through objects and arrays, sentinels never resolve here.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.tokens.iter().try_fold(root, |value, token| token.step(value))
    }

    pub fn array_len(&self, root: &Value) -> Option<usize> {
        self.get(root).and_then(Value::as_array).map(Vec::len)
    }

    /// Resolve the path, honoring a trailing `$len`.
    pub fn lookup(&self, root: &Value) -> Option<Value> {
        match self.len_parent() {
            Some(parent) => parent.array_len(root).map(Value::from),
            None => self.get(root).cloned(),
        }
    }
}

/// `@` prefixed reference found at the head of a template string leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    raw: String,
    path: Path,
    suffix: String,
}
impl Reference {
    /// Scan a string leaf. The path text runs while characters are letters, digits, commas or double quotes;
    /// a `$` is accepted only as the head of a token so that sentinels can be written.
    pub fn scan(leaf: &str) -> Option<Self> {
        let body = leaf.strip_prefix(AT)?;
        let mut end = 0;
        let mut head_of_token = true;
        for (i, c) in body.char_indices() {
            let accepted = c.is_alphabetic() || c.is_numeric() || c == SEPARATOR || c == QUOTE || (c == '$' && head_of_token);
            if !accepted {
                break;
            }
            head_of_token = c == SEPARATOR;
            end = i + c.len_utf8();
        }
        let raw = &body[..end];
        (!raw.is_empty()).then(|| Self { raw: raw.to_string(), path: Path::parse(raw), suffix: body[end..].to_string() })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_scan_reference() {
        for (leaf, raw) in [
            ("@msg!", Some("msg")),
            ("msg!", None),
            ("!msg!", None),
            ("@msg,0", Some("msg,0")),
            ("@msg,0,count", Some("msg,0,count")),
            (r#"@msg,0,"1",count"#, Some(r#"msg,0,"1",count"#)),
            ("@langs,0,name", Some("langs,0,name")),
            ("@@langs,0,name", None),
            ("@vals,$range", Some("vals,$range")),
            ("@vals$range", Some("vals")),
            ("@", None),
        ] {
            assert_eq!(Reference::scan(leaf).as_ref().map(Reference::raw), raw, "{}", leaf);
        }
    }

    #[test]
    fn test_scan_suffix() {
        let reference = Reference::scan("@msg!@msg").unwrap();
        assert_eq!(reference.raw(), "msg");
        assert_eq!(reference.suffix(), "!@msg");
    }

    #[test]
    fn test_path_get() {
        let value = json!({"langs": [{"name": "Golang"}, {"name": "Rust"}], "map": {"1": "one"}});
        assert_eq!(Path::parse("langs,1,name").get(&value), Some(&json!("Rust")));
        assert_eq!(Path::parse(r#"map,"1""#).get(&value), Some(&json!("one")));
        assert_eq!(Path::parse("map,1").get(&value), Some(&json!("one")));
        assert_eq!(Path::parse("langs,name").get(&value), None);
        assert_eq!(Path::parse("langs,2,name").get(&value), None);
        assert_eq!(Path::parse("").get(&value), Some(&value));
    }

    #[test]
    fn test_path_len() {
        let value = json!({"langs": [1, 2, 3], "name": "Rust"});
        assert_eq!(Path::parse("langs,$len").lookup(&value), Some(json!(3)));
        assert_eq!(Path::parse("name,$len").lookup(&value), None);
        assert_eq!(Path::parse("$len").lookup(&json!([0, 0])), Some(json!(2)));
    }

    #[test]
    fn test_split_range() {
        let (head, tail) = Path::parse("langs,$range,name").split_range().unwrap();
        assert_eq!(head, Path::parse("langs"));
        assert_eq!(tail, Path::parse("name"));
        assert!(Path::parse("langs,0").split_range().is_none());
        assert_eq!(Path::parse(r#"a,"b",$range"#).to_string(), r#"a,"b",$range"#);
    }
}
