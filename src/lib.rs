//! Cache keys for database scopes.
//!
//! A scope's key is `<namespace>/<md5>` where the digest covers the
//! `id-updated_at` pair of every matched row, so the key moves whenever a row
//! is added, removed or touched. A scope that matches nothing gets
//! `<namespace>/empty`. The aggregate and the hash are computed by the
//! database in a single statement.
//!
//! ```no_run
//! use scope_cache_key::{compute_key, Scope, SqliteStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SqliteStore::open("app.sqlite3")?;
//! let key = compute_key(&store, &Scope::table("items").where_eq("status", "active"))?;
//! println!("{}", key);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{ScopeKeyError, ScopeKeyResult};
pub use models::{
    expand_cache_key, CacheKey, Comparison, Namespace, Scope, SqlValue, EMPTY_SENTINEL,
};
pub use repositories::{Dialect, ScalarStore, SqliteStore};
pub use services::{compute_key, ScopeKeyComputer};
