pub mod fetch_context;
pub mod token;
pub mod token_cache;
