use std::time::Duration;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize, value},
    multi::many1,
    sequence::pair,
    IResult, Parser,
};

use crate::error::ConfigError;

/// Parse duration text such as `"1h2m"`, `"1.5s"`, `"200ms"`, `"10us"` or `"3ns"`.
pub fn parse(text: &str) -> Result<Duration, ConfigError> {
    let text = text.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    let (_, components) = all_consuming(many1(component))
        .parse(text)
        .map_err(|_| ConfigError::InvalidDuration(text.to_string()))?;
    let nanos: f64 = components.into_iter().sum();
    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Text that [`parse`] reads back into the same duration.
pub fn format(duration: &Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{}ns", nanos)
    }
}

fn component(input: &str) -> IResult<&str, f64> {
    let (remain, (number, unit)) = pair(number, unit).parse(input)?;
    Ok((remain, number * unit))
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(recognize(pair(digit1, opt(pair(char('.'), digit1)))), str::parse::<f64>).parse(input)
}

/// Nanoseconds per unit.
fn unit(input: &str) -> IResult<&str, f64> {
    alt((
        value(1.0, tag("ns")),
        value(1e3, tag("us")),
        value(1e3, tag("µs")),
        value(1e6, tag("ms")),
        value(1e9, tag("s")),
        value(60e9, tag("m")),
        value(3600e9, tag("h")),
    ))
    .parse(input)
}

/// For `#[serde(with = "...")]` on `Option<Duration>` fields.
pub mod option {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_str(&super::format(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?.map(|text| super::parse(&text).map_err(D::Error::custom)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse("200ms").unwrap(), Duration::from_millis(200));
        assert_eq!(parse("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse("1h2m").unwrap(), Duration::from_secs(3720));
        assert_eq!(parse("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse("3ns").unwrap(), Duration::from_nanos(3));
        assert_eq!(parse("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_invalid_duration() {
        assert!(matches!(parse("").unwrap_err(), ConfigError::InvalidDuration(_)));
        assert!(matches!(parse("10").unwrap_err(), ConfigError::InvalidDuration(_)));
        assert!(matches!(parse("10 ms").unwrap_err(), ConfigError::InvalidDuration(_)));
        assert!(matches!(parse("3days").unwrap_err(), ConfigError::InvalidDuration(_)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format(&Duration::from_millis(300)), "300ms");
        assert_eq!(format(&Duration::from_secs(100)), "100000ms");
        assert_eq!(format(&Duration::from_micros(15)), "15us");
        assert_eq!(format(&Duration::from_nanos(7)), "7ns");
        assert_eq!(parse(&format(&Duration::from_nanos(1_500_007))).unwrap(), Duration::from_nanos(1_500_007));
    }
}
