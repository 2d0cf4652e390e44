pub mod sqlite_repo;
pub mod store;

pub use sqlite_repo::*;
pub use store::*;
