//! dataforge: synthesizes per-vertical time-series datasets and repackages
//! each vertical's master table into a priced catalog of time-partitioned
//! CSV products.
//!
//! The flow per run: row generation -> master store merge (idempotent per
//! day) -> full partition re-derivation (bundle / yearly / quarterly /
//! monthly) -> pricing -> catalog assembly, with a status ledger recording
//! what the run added.

pub mod config;
pub mod generate;
pub mod ledger;
pub mod pipeline;
pub mod products;
pub mod store;
