pub mod candidate;
pub mod miner;
