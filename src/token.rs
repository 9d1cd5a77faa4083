//! The query mini-language used by the search command.
//!
//! Every whitespace separated argument is a [`Token`]: an identifier followed by an
//! optional bracketed mapping, e.g. `chunk{w:world,x:0,z:0,r:10,l:true}`. Simple
//! predicates can skip the brackets, in which case the identifier doubles as the key
//! of the sole mapping: `type:diamond_sword` is read as identifier `type` with the
//! mapping `type -> diamond_sword`.
//!
//! Brackets `{}`, `[]` and `()` are all accepted, tried in that order. Serialization
//! is always canonical and uses braces.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SearchError};

const OPEN: [char; 3] = ['{', '[', '('];
const CLOSE: [char; 3] = ['}', ']', ')'];

lazy_static! {
    static ref RESERVED: Regex = Regex::new(r"[{}\[\](),:]").expect("reserved character class");
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    identifier: String,
    // insertion ordered, keys are unique
    mappings: Vec<(String, String)>,
}

impl Token {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), mappings: Vec::new() }
    }

    pub fn with_mappings<K, V, I>(identifier: impl Into<String>, mappings: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut token = Self::new(identifier);
        for (key, value) in mappings {
            token.put(key, value)?;
        }
        Ok(token)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let open = OPEN.iter().find_map(|brace| raw.find(*brace));
        let identifier = match open {
            Some(open) => &raw[..open],
            None => match raw.find(':') {
                Some(colon) => &raw[..colon],
                None => raw,
            },
        };
        let close = CLOSE.iter().find_map(|brace| raw.rfind(*brace));

        let body = match (open, close) {
            (Some(open), Some(close)) if close > open => &raw[open + 1..close],
            // a missing or misplaced closing brace is ignored
            (Some(open), _) => &raw[open + 1..],
            (None, _) => raw,
        };

        let mut token = Self::new(identifier);
        for mapping in body.split(',') {
            let mut parts: Vec<&str> = mapping.split(':').collect();
            while parts.last().is_some_and(|part| part.is_empty()) {
                parts.pop();
            }
            if parts.len() >= 2 {
                token.put(parts[0], parts[1])?;
            }
        }
        Ok(token)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Insert or overwrite a mapping, returning the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Option<String>> {
        let key = key.into();
        let value = value.into();
        validate(&key, &value)?;
        match self.mappings.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => Ok(Some(std::mem::replace(existing, value))),
            None => {
                self.mappings.push((key, value));
                Ok(None)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.mappings.iter().find(|(existing, _)| existing == key).map(|(_, value)| value.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.mappings.iter().position(|(existing, _)| existing == key)?;
        Some(self.mappings.remove(index).1)
    }

    /// The value of the first mapping, used by single valued options like `type:stone`.
    pub fn first_value(&self) -> Option<&str> {
        self.mappings.first().map(|(_, value)| value.as_str())
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    if RESERVED.is_match(key) || RESERVED.is_match(value) {
        return Err(SearchError::ReservedCharacter(format!("{key}:{value}")));
    }
    Ok(())
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.identifier)?;
        for (index, (key, value)) in self.mappings.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}:{value}")?;
        }
        f.write_str("}")
    }
}

impl FromStr for Token {
    type Err = SearchError;
    fn from_str(s: &str) -> Result<Self> {
        Token::parse(s)
    }
}
