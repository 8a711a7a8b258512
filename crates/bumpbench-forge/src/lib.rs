pub mod client;
pub mod config;
pub mod filters;
pub mod patch_cache;
pub mod pr;
pub mod token_pool;
