//! RFC 6901 JSON pointers

use crate::PatchError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Structural path into a record: object keys and array indices.
///
/// The empty pointer addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Child pointer one level below `self`
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Parent pointer and last token, or `None` for the root.
    pub fn split_last(&self) -> Option<(JsonPointer, &str)> {
        let (last, parent) = self.tokens.split_last()?;
        Some((JsonPointer::from_tokens(parent.iter().cloned()), last.as_str()))
    }

    /// True if `other` lies strictly below `self`.
    pub fn is_prefix_of(&self, other: &JsonPointer) -> bool {
        self.tokens.len() < other.tokens.len() && other.tokens.starts_with(&self.tokens)
    }
}

fn escape(token: &str) -> String {
    if !token.contains('/') && !token.contains('~') {
        return token.to_string();
    }
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(token: &str) -> String {
    if !token.contains('~') {
        return token.to_string();
    }
    token.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| PatchError::InvalidPointer(s.to_string()))?;
        Ok(Self {
            tokens: rest.split('/').map(unescape).collect(),
        })
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_parse() {
        let ptr = JsonPointer::root().child("charts").index(2).child("a/b~c");
        assert_eq!(ptr.to_string(), "/charts/2/a~1b~0c");

        let parsed: JsonPointer = "/charts/2/a~1b~0c".parse().unwrap();
        assert_eq!(parsed, ptr);
    }

    #[test]
    fn test_root_pointer() {
        let root: JsonPointer = "".parse().unwrap();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "");
        assert!(root.split_last().is_none());
    }

    #[test]
    fn test_missing_leading_slash_is_rejected() {
        let result = "description".parse::<JsonPointer>();
        assert!(matches!(result, Err(PatchError::InvalidPointer(_))));
    }

    #[test]
    fn test_prefix() {
        let tags: JsonPointer = "/tags".parse().unwrap();
        let first: JsonPointer = "/tags/0".parse().unwrap();
        assert!(tags.is_prefix_of(&first));
        assert!(!first.is_prefix_of(&tags));
        assert!(!tags.is_prefix_of(&tags));
    }
}
