pub mod cache_key;
pub mod scope;

pub use cache_key::*;
pub use scope::*;
