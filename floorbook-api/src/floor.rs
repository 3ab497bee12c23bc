use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context};

const TOP_PREFIX: char = 'B';
const SEPARATOR: char = '-';

/// Human-readable position of a comment in its thread
///
/// Top-level comments are numbered `B1`, `B2`, ... per subject. Replies are
/// always numbered under the top-level comment they hang from, `B1-1`,
/// `B1-2`, ..., however deep the reply is displayed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FloorNumber {
    root: u32,
    reply: Option<u32>,
}

impl FloorNumber {
    pub fn top(seq: u32) -> FloorNumber {
        FloorNumber {
            root: seq,
            reply: None,
        }
    }

    pub fn reply(root: u32, seq: u32) -> FloorNumber {
        FloorNumber {
            root,
            reply: Some(seq),
        }
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn reply_seq(&self) -> Option<u32> {
        self.reply
    }

    pub fn is_top_level(&self) -> bool {
        self.reply.is_none()
    }

    /// Top-level floor this floor is numbered under (itself if top-level)
    pub fn root_floor(&self) -> FloorNumber {
        FloorNumber::top(self.root)
    }

    /// Top-level floor a display target belongs to
    ///
    /// Only the text before the first separator is looked at, so `B1-2`
    /// resolves to `B1`. Returns `None` if that prefix is not a well-formed
    /// top-level floor.
    pub fn root_of(display: &str) -> Option<FloorNumber> {
        let root = display.split(SEPARATOR).next()?;
        root.parse::<FloorNumber>()
            .ok()
            .filter(FloorNumber::is_top_level)
    }
}

// Only canonical numbers are accepted: no sign, no leading zero, no zero
fn parse_seq(s: &str) -> anyhow::Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) || s.starts_with('0') {
        return Err(anyhow!("{s:?} is not a floor sequence number"));
    }
    s.parse::<u32>()
        .with_context(|| format!("parsing floor sequence number {s:?}"))
}

impl FromStr for FloorNumber {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<FloorNumber> {
        let rest = s
            .strip_prefix(TOP_PREFIX)
            .ok_or_else(|| anyhow!("floor number {s:?} does not start with {TOP_PREFIX:?}"))?;
        Ok(match rest.split_once(SEPARATOR) {
            None => FloorNumber::top(parse_seq(rest)?),
            Some((root, reply)) => FloorNumber::reply(parse_seq(root)?, parse_seq(reply)?),
        })
    }
}

impl fmt::Display for FloorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reply {
            None => write!(f, "{TOP_PREFIX}{}", self.root),
            Some(reply) => write!(f, "{TOP_PREFIX}{}{SEPARATOR}{reply}", self.root),
        }
    }
}

impl serde::Serialize for FloorNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for FloorNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_top_level_and_replies() {
        assert_eq!(FloorNumber::top(3).to_string(), "B3");
        assert_eq!(FloorNumber::reply(2, 1).to_string(), "B2-1");
    }

    #[test]
    fn root_of_display_targets() {
        assert_eq!(FloorNumber::root_of("B1"), Some(FloorNumber::top(1)));
        assert_eq!(FloorNumber::root_of("B1-2"), Some(FloorNumber::top(1)));
        assert_eq!(FloorNumber::root_of("B12-3-4"), Some(FloorNumber::top(12)));
        assert_eq!(FloorNumber::root_of("B01-2"), None);
        assert_eq!(FloorNumber::root_of("C1"), None);
        assert_eq!(FloorNumber::root_of("B"), None);
        assert_eq!(FloorNumber::root_of(""), None);
        assert_eq!(FloorNumber::root_of("-B1"), None);
    }

    #[test]
    fn rejects_malformed() {
        for s in ["", "B", "B0", "B-1", "B1-", "B1-0", "B+1", "b1", "B1-2-3", "B99999999999"] {
            assert!(s.parse::<FloorNumber>().is_err(), "{s:?} parsed");
        }
    }

    #[test]
    fn parsing_is_canonical() {
        bolero::check!().with_type::<String>().for_each(|s| {
            if let Ok(f) = s.parse::<FloorNumber>() {
                assert_eq!(&f.to_string(), s);
            }
        })
    }
}
