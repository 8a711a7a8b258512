pub mod commands;
pub mod miner_cli;
pub mod reproduce_cli;

/// Base URL every `ForgeClient` in this workspace is pointed at.
pub const FORGE_BASE_URL: &str = "https://api.github.com";
