use tracing::{debug, trace};

use crate::error::ScopeKeyResult;
use crate::models::{CacheKey, Scope, SqlValue};
use crate::repositories::ScalarStore;
use crate::utils::build_aggregate_query;

/// Computes `<namespace>/<md5>` keys for scopes, or `<namespace>/empty` when
/// the scope matches nothing.
///
/// The digest covers every `id-updated_at` token of the matched rows, sorted
/// before hashing, so it changes whenever a row enters or leaves the scope or
/// a matched row is touched. Tokens are joined with a bare `-` and rendered as
/// PostgreSQL `text[]`, the same rendering as an unsorted `array_agg(...)::text`,
/// but sorted. Keys produced from the unsorted aggregate are not preserved.
/// The bare separator is ambiguous when ids or timestamps contain `-`.
pub struct ScopeKeyComputer<'a, S: ScalarStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ScalarStore + ?Sized> ScopeKeyComputer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The statement and bound parameters `compute_key` sends to the store.
    pub fn aggregate_sql(&self, scope: &Scope) -> ScopeKeyResult<(String, Vec<SqlValue>)> {
        build_aggregate_query(self.store.dialect(), scope)
    }

    pub fn compute_key(&self, scope: &Scope) -> ScopeKeyResult<CacheKey> {
        let namespace = scope.resolve_namespace()?;
        let (sql, params) = self.aggregate_sql(scope)?;
        debug!(
            namespace = namespace.as_str(),
            dialect = self.store.dialect().as_str(),
            "computing scope cache key"
        );

        let key = match self.store.select_value(&sql, &params)? {
            Some(digest) if !digest.is_empty() => CacheKey::digest(namespace, digest),
            _ => CacheKey::empty(namespace),
        };
        trace!(key = %key, "scope cache key computed");
        Ok(key)
    }
}

pub fn compute_key<S: ScalarStore + ?Sized>(store: &S, scope: &Scope) -> ScopeKeyResult<String> {
    ScopeKeyComputer::new(store)
        .compute_key(scope)
        .map(|key| key.to_string())
}
