//! Core stamping machinery: canonical serialization, digesting, block
//! placement, and the idempotent stamp algorithm.

pub mod canonical;
pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod fsio;
pub mod model;
pub mod placement;
pub mod report;
pub mod time;
