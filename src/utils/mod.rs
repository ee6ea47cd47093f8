pub mod lookup_cache;
pub mod validation;
