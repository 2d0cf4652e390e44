use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ScopeKeyError, ScopeKeyResult};

/// Stands in for the digest when a scope matches no rows.
pub const EMPTY_SENTINEL: &str = "empty";

const NEW_RECORD_MARKER: &str = "new";

/// Per entity type key prefix, e.g. `items` or `admin/items`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(value: impl Into<String>) -> ScopeKeyResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(ScopeKeyError::QueryConstruction(
                "namespace must not be empty".to_string(),
            ));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ScopeKeyError::QueryConstruction(format!(
                "namespace {:?} contains whitespace",
                value
            )));
        }
        if value.starts_with('/') || value.ends_with('/') || value.contains("//") {
            return Err(ScopeKeyError::QueryConstruction(format!(
                "namespace {:?} has an empty segment",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    namespace: Namespace,
    suffix: String,
}

impl CacheKey {
    pub fn digest(namespace: Namespace, hex: impl Into<String>) -> Self {
        Self {
            namespace,
            suffix: hex.into(),
        }
    }

    pub fn empty(namespace: Namespace) -> Self {
        Self {
            namespace,
            suffix: EMPTY_SENTINEL.to_string(),
        }
    }

    /// Key for a single record: `<ns>/<id>-<timestamp>`, `<ns>/<id>` without a
    /// timestamp and `<ns>/new` for a record that has not been saved yet.
    pub fn for_record<I: fmt::Display>(
        namespace: Namespace,
        id: Option<I>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        let suffix = match (id, updated_at) {
            (None, _) => NEW_RECORD_MARKER.to_string(),
            (Some(id), None) => id.to_string(),
            (Some(id), Some(ts)) => format!("{}-{}", id, ts.format("%Y%m%d%H%M%S%9f")),
        };
        Self { namespace, suffix }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn is_empty(&self) -> bool {
        self.suffix == EMPTY_SENTINEL
    }

    /// The hex digest, or `None` for the empty sentinel and record keys.
    pub fn digest_hex(&self) -> Option<&str> {
        let is_hex = self.suffix.len() == 32 && self.suffix.bytes().all(|b| b.is_ascii_hexdigit());
        is_hex.then_some(self.suffix.as_str())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.suffix)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

/// Joins several keys into one fragment key, e.g.
/// `communities/1/categories/0b27dac757428d88c0f3a0298eb0278f`.
pub fn expand_cache_key<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a CacheKey>,
{
    keys.into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}
