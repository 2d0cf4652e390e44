pub mod scope_key_service;

pub use scope_key_service::*;
