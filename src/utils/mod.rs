pub mod hashing;
pub mod sql;

pub use hashing::*;
pub use sql::*;
