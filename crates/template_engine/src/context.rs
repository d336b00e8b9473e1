//! Layered variable lookup.

use serde_json::Value;

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

static NULL: Value = Value::Null;

/// A JSON document together with the place it was loaded from.
///
/// The origin is used for provenance reporting: it identifies which file supplied
/// a value during resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub document: Value,
    pub origin: String,
}

impl SourceDocument {
    pub fn new(document: Value, origin: impl Into<String>) -> Self {
        Self {
            document,
            origin: origin.into(),
        }
    }
}

/// Ordered list of value sources consulted for every variable lookup.
///
/// Sources are held in priority order: the first source added wins over later ones.
/// For each path segment every source that defines the segment stays in play, so a
/// `null` in a higher priority source falls through to the next source holding a
/// value for the same path.
#[derive(Debug, Clone, Default)]
pub struct LayeredContext {
    sources: Vec<SourceDocument>,
}

/// Outcome of a path lookup.
#[derive(Debug, PartialEq)]
pub(crate) enum Lookup<'a> {
    Found {
        value: &'a Value,
        origin: Option<&'a str>,
    },
    Undefined {
        key: String,
    },
}

impl LayeredContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source with lower priority than the ones already present.
    pub fn with_source(mut self, source: SourceDocument) -> Self {
        self.sources.push(source);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub(crate) fn lookup(&self, path: &[String]) -> Lookup<'_> {
        let mut cursors: Vec<(&Value, &str)> = self
            .sources
            .iter()
            .map(|source| (&source.document, source.origin.as_str()))
            .collect();

        for key in path {
            let next: Vec<(&Value, &str)> = cursors
                .iter()
                .filter_map(|(value, origin)| child(value, key).map(|found| (found, *origin)))
                .collect();
            if next.is_empty() {
                return Lookup::Undefined { key: key.clone() };
            }
            cursors = next;
        }

        match cursors.iter().find(|(value, _)| !value.is_null()) {
            Some((value, origin)) => Lookup::Found {
                value,
                origin: Some(origin),
            },
            None => Lookup::Found {
                value: &NULL,
                origin: None,
            },
        }
    }
}

/// Steps into an object by key or into an array by numeric index.
pub(crate) fn child<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}
