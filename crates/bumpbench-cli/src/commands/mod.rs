//! Command dispatch and handler modules for both binaries.

pub mod miner;
pub mod reproduce;
