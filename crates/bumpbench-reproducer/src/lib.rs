pub mod classify;
pub mod enrichment;
pub mod reproduce;
pub mod result_manager;
pub mod state_machine;
