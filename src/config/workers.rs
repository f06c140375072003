//! Worker file line grammar.
//!
//! ```text
//! # comment
//! <count>x<Identifier> = key1: value1, key2: value2, ...
//! ```
//!
//! `3x NormalWorker`, `3xNormalWorker` and `3 x NormalWorker` are the same
//! declaration.

use crate::error::ConfigLineError;
use crate::worker::PropertyMap;

/// One parsed worker declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Number of instances, at least 1.
    pub count: usize,
    /// Identifier as written, qualified later by the factory.
    pub identifier: String,
    pub properties: PropertyMap,
}

/// Parse one line. Blank and comment lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<WorkerSpec>, ConfigLineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (declaration, properties) = line.split_once('=').ok_or(ConfigLineError::MissingEquals)?;
    let (count, identifier) = split_declaration(declaration.trim());

    let count = parse_count(count)?;
    if identifier.is_empty() {
        return Err(ConfigLineError::MissingIdentifier);
    }

    Ok(Some(WorkerSpec {
        count,
        identifier: identifier.to_string(),
        properties: parse_properties(properties)?,
    }))
}

/// Split `3x Identifier` into its count and identifier parts.
fn split_declaration(declaration: &str) -> (&str, &str) {
    match declaration.split_once(char::is_whitespace) {
        Some((count, rest)) => {
            let rest = rest.trim();
            let identifier = rest
                .strip_prefix('x')
                .filter(|r| r.starts_with(char::is_whitespace))
                .map(str::trim)
                .unwrap_or(rest);
            (count, identifier)
        }
        None => {
            let end = declaration
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(declaration.len());
            let (count, rest) = declaration.split_at(end);
            (count, rest.strip_prefix('x').unwrap_or(rest))
        }
    }
}

fn parse_count(raw: &str) -> Result<usize, ConfigLineError> {
    let digits = raw.trim_matches(|c: char| c == 'x' || c.is_whitespace());
    match digits.parse::<usize>() {
        Ok(0) => Err(ConfigLineError::ZeroCount),
        Ok(count) => Ok(count),
        Err(_) => Err(ConfigLineError::InvalidCount(raw.to_string())),
    }
}

fn parse_properties(raw: &str) -> Result<PropertyMap, ConfigLineError> {
    let mut properties = PropertyMap::new();

    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment
            .split_once(':')
            .ok_or_else(|| ConfigLineError::MalformedProperty(segment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigLineError::MalformedProperty(segment.to_string()));
        }
        properties.insert(key, value.trim());
    }

    Ok(properties)
}
