pub use fuels::types::{
    Identity,
    U256,
};

pub mod achievements;
pub mod batch;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod session;

pub type Result<T, E = error::BatchError> = std::result::Result<T, E>;
