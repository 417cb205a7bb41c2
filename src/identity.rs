use std::fmt::{self, Write};
use std::str::FromStr;

use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CycError;

static ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:[A-Za-z0-9+-]|%[A-Fa-f0-9]{2})+):((?:[A-Za-z0-9+-]|%[A-Fa-f0-9]{2})+)$")
        .expect("identifier pattern is valid")
});

/// How much nested data a `getxml` request returns for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Detail {
    None,
    Low,
    Full,
}

impl Detail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detail::None => "none",
            Detail::Low => "low",
            Detail::Full => "full",
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Detail {
    type Err = CycError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Detail::None),
            "low" => Ok(Detail::Low),
            "full" => Ok(Detail::Full),
            _ => Err(CycError::InvalidValue {
                scalar: "detail".to_string(),
                text: value.to_string(),
            }),
        }
    }
}

/// A BioCyc object identifier: organism database (`realm`) plus frame id.
///
/// Both components are held in canonical escaped form: every byte outside
/// `[A-Za-z0-9-]` is percent-encoded with upper-case hex, so a literal `+`
/// is written `%2B` and `%2b` normalizes to `%2B`. Equality, hashing and
/// `Display` all use that form, and `Display` always parses back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    realm: String,
    frame: String,
}

impl Identity {
    pub fn new(realm: impl AsRef<str>, frame: impl AsRef<str>) -> Result<Self, CycError> {
        let realm = escape(realm.as_ref().trim());
        let frame = escape(frame.as_ref().trim());
        if realm.is_empty() || frame.is_empty() {
            return Err(CycError::InvalidIdentifier(format!("{realm}:{frame}")));
        }
        Ok(Self { realm, frame })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Realm as it appears in `orgid` attributes of fetched documents.
    pub fn raw_realm(&self) -> String {
        unescape(&self.realm)
    }

    /// Frame as it appears in `frameid` attributes of fetched documents.
    pub fn raw_frame(&self) -> String {
        unescape(&self.frame)
    }

    /// True when a document element's `orgid`/`frameid` pair names this object.
    pub fn matches(&self, orgid: &str, frameid: &str) -> bool {
        unescape(orgid) == self.raw_realm() && unescape(frameid) == self.raw_frame()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.realm, self.frame)
    }
}

impl FromStr for Identity {
    type Err = CycError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let caps = ID_REGEX
            .captures(value)
            .ok_or_else(|| CycError::InvalidIdentifier(value.to_string()))?;
        Identity::new(&caps[1], &caps[2])
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Canonical escaped form. Existing `%XX` escapes are decoded first, then
/// every byte outside `[A-Za-z0-9-]` is encoded with upper-case hex.
pub fn escape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut escaped = String::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let byte = match percent_escape(bytes, index) {
            Some(code) => {
                index += 3;
                code
            }
            None => {
                index += 1;
                bytes[index - 1]
            }
        };
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "%{byte:02X}");
        }
    }
    escaped
}

/// Decodes every `%XX` escape, as the server does with request parameters.
pub fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if let Some(code) = percent_escape(bytes, index) {
            decoded.push(code);
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn percent_escape(bytes: &[u8], index: usize) -> Option<u8> {
    if bytes[index] != b'%' {
        return None;
    }
    let hex = bytes.get(index + 1..index + 3)?;
    let hex = std::str::from_utf8(hex).ok()?;
    u8::from_str_radix(hex, 16).ok()
}
