//! Worker properties and typed coercion.
//!
//! A [`PropertyMap`] is the flat `key: value` list from one configuration
//! line. Composite workers carve it into per-index sub-maps using the
//! `worker<N>_<key>` convention (see [`PropertyMap::indexed_groups`]).

use std::fmt;
use std::str::FromStr;

use crate::error::ConstructionError;

/// Ordered string map with unique keys.
///
/// Re-inserting a key overwrites its value but keeps the position of the
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: Vec<(String, String)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a property, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Partition `<prefix><N>_<rest>` keys by `N` into sub-maps keyed by `<rest>`.
    ///
    /// Groups are returned in ascending index order. Keys that do not match
    /// the pattern are ignored.
    pub fn indexed_groups(&self, prefix: &str) -> Vec<(u32, PropertyMap)> {
        let mut groups: Vec<(u32, PropertyMap)> = Vec::new();

        for (key, value) in self.iter() {
            let Some((index, rest)) = split_indexed_key(key, prefix) else {
                continue;
            };
            match groups.iter_mut().find(|(n, _)| *n == index) {
                Some((_, group)) => {
                    group.insert(rest, value);
                }
                None => {
                    let mut group = PropertyMap::new();
                    group.insert(rest, value);
                    groups.push((index, group));
                }
            }
        }

        groups.sort_by_key(|(index, _)| *index);
        groups
    }
}

/// Split `worker12_class` into `(12, "class")`.
pub fn split_indexed_key<'a>(key: &'a str, prefix: &str) -> Option<(u32, &'a str)> {
    let tail = key.strip_prefix(prefix)?;
    let (digits, rest) = tail.split_once('_')?;
    if digits.is_empty() || rest.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (index, rest))
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        f.write_str("}")
    }
}

/// Parse an integer property.
pub fn int<T: FromStr>(key: &str, value: &str) -> Result<T, ConstructionError> {
    value.parse().map_err(|_| invalid(key, value, "an integer"))
}

/// Parse an integer property that must be at least 1.
pub fn positive_int<T>(key: &str, value: &str) -> Result<T, ConstructionError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    match value.parse::<T>() {
        Ok(v) if v >= T::from(1) => Ok(v),
        _ => Err(invalid(key, value, "a positive integer")),
    }
}

/// Parse a boolean property (`true`/`false`, case-insensitive).
pub fn boolean(key: &str, value: &str) -> Result<bool, ConstructionError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(key, value, "true or false"))
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ConstructionError {
    ConstructionError::InvalidProperty {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}
